//! Bulk re-parenting of selected nodes.

use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::application::services::batch::dedup;
use crate::application::services::TaxonomyStore;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DomainError, Node, NodeUpdate, Scope, TaxonomyTree};

/// One failed member of a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub id: String,
    pub error: String,
}

/// Outcome of a regroup batch. Updates that succeeded stay applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegroupReport {
    pub moved_count: usize,
    pub failures: Vec<BatchFailure>,
}

impl RegroupReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn a report with failures into [`ApplicationError::PartialBatchFailure`].
    pub fn ensure_complete(self) -> ApplicationResult<Self> {
        if self.is_complete() {
            return Ok(self);
        }
        Err(ApplicationError::PartialBatchFailure {
            operation: "regroup".to_string(),
            succeeded: self.moved_count,
            failed: self.failures.len(),
        })
    }
}

pub struct RegroupService {
    store: Arc<TaxonomyStore>,
}

impl RegroupService {
    pub fn new(store: Arc<TaxonomyStore>) -> Self {
        Self { store }
    }

    /// Move every selected node under `target`. Repeated ids move once.
    ///
    /// The target must be a group, must not be selected itself and must not
    /// lie below any selected node. These checks run before any update is
    /// sent. Updates are then issued in parallel and collected independently;
    /// a failure on one id does not undo the others.
    #[instrument(level = "debug", skip(self))]
    pub fn regroup(
        &self,
        scope: &Scope,
        selected: &[String],
        target: &str,
    ) -> ApplicationResult<RegroupReport> {
        let selected = dedup(selected);
        if selected.is_empty() {
            return Err(DomainError::Validation("nothing selected to regroup".into()).into());
        }
        let tree = self.store.tree(scope)?;
        Self::check_target(&tree, &selected, target)?;

        let update = NodeUpdate::reparent(Some(target.to_string()));
        let results: Vec<(&String, ApplicationResult<Node>)> = selected
            .par_iter()
            .map(|id| (id, self.store.update_in(&tree, scope, id, &update)))
            .collect();

        let mut report = RegroupReport::default();
        for (id, result) in results {
            match result {
                Ok(_) => report.moved_count += 1,
                Err(e) => {
                    warn!("regroup {} -> {} failed: {}", id, target, e);
                    report.failures.push(BatchFailure {
                        id: id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        info!(
            "regroup under {}: {} moved, {} failed",
            target,
            report.moved_count,
            report.failures.len()
        );
        Ok(report)
    }

    /// Groups that are valid regroup targets for `selected`.
    pub fn candidate_targets(&self, scope: &Scope, selected: &[String]) -> ApplicationResult<Vec<Node>> {
        let tree = self.store.tree(scope)?;
        Ok(tree
            .groups()
            .filter(|g| Self::check_target(&tree, selected, &g.id).is_ok())
            .cloned()
            .collect())
    }

    fn check_target(tree: &TaxonomyTree, selected: &[String], target: &str) -> Result<(), DomainError> {
        match tree.get(target) {
            Some(node) if node.is_group => {}
            Some(_) => {
                return Err(DomainError::InvalidParent(format!("{target} is not a group")))
            }
            None => return Err(DomainError::InvalidParent(format!("{target} does not exist"))),
        }
        if selected.iter().any(|id| id == target) {
            return Err(DomainError::CycleDetected(format!(
                "target {target} is part of the selection"
            )));
        }
        for id in selected {
            if tree.is_descendant(target, id)? {
                debug!("regroup target {} lies below selected {}", target, id);
                return Err(DomainError::CycleDetected(format!(
                    "target {target} lies below selected node {id}"
                )));
            }
        }
        Ok(())
    }
}
