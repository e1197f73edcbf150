//! Single and bulk deletion with per-id outcomes.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::application::services::batch::dedup;
use crate::application::services::TaxonomyStore;
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{DomainError, Scope, TaxonomyTree};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionOutcome {
    pub id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeletionOutcome {
    fn ok(id: &str) -> Self {
        Self {
            id: id.to_string(),
            success: true,
            error: None,
        }
    }

    fn failed(id: &str, error: impl ToString) -> Self {
        Self {
            id: id.to_string(),
            success: false,
            error: Some(error.to_string()),
        }
    }
}

/// Outcome of a deletion batch, one result per requested id in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub deleted_count: usize,
    pub results: Vec<DeletionOutcome>,
}

impl DeletionReport {
    fn from_results(results: Vec<DeletionOutcome>) -> Self {
        Self {
            deleted_count: results.iter().filter(|r| r.success).count(),
            results,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &DeletionOutcome> {
        self.results.iter().filter(|r| !r.success)
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Turn a report with failures into [`ApplicationError::PartialBatchFailure`].
    pub fn ensure_complete(self) -> ApplicationResult<Self> {
        if self.is_complete() {
            return Ok(self);
        }
        Err(ApplicationError::PartialBatchFailure {
            operation: "delete".to_string(),
            succeeded: self.deleted_count,
            failed: self.results.len() - self.deleted_count,
        })
    }
}

pub struct DeletionService {
    store: Arc<TaxonomyStore>,
    cascade: bool,
    bulk_endpoint: bool,
}

impl DeletionService {
    pub fn new(store: Arc<TaxonomyStore>) -> Self {
        Self {
            store,
            cascade: false,
            bulk_endpoint: false,
        }
    }

    pub fn with_cascade(mut self, cascade: bool) -> Self {
        self.cascade = cascade;
        self
    }

    /// Send batches as one `bulk-delete` request instead of one call per id.
    pub fn with_bulk_endpoint(mut self, bulk_endpoint: bool) -> Self {
        self.bulk_endpoint = bulk_endpoint;
        self
    }

    pub fn cascade(&self) -> bool {
        self.cascade
    }

    /// Delete a single node.
    pub fn delete_one(&self, scope: &Scope, id: &str) -> ApplicationResult<()> {
        debug!("delete_one: id={} cascade={}", id, self.cascade);
        self.store.remove(scope, id, self.cascade)
    }

    /// Delete every id, best effort.
    ///
    /// Failures are reported per id and never undo deletions that already
    /// happened. The batch only errors when the scope cannot be loaded.
    #[instrument(level = "debug", skip(self))]
    pub fn delete_many(&self, scope: &Scope, ids: &[String]) -> ApplicationResult<DeletionReport> {
        let ids = dedup(ids);
        if ids.is_empty() {
            return Ok(DeletionReport::default());
        }
        let tree = self.store.tree(scope)?;

        let report = if self.bulk_endpoint {
            self.delete_via_endpoint(&tree, scope, &ids)
        } else {
            self.delete_in_levels(&tree, scope, &ids)
        };

        info!(
            "delete: {} of {} deleted",
            report.deleted_count,
            report.results.len()
        );
        Ok(report)
    }

    /// One `remove` per id, deepest nodes first so that children in the
    /// batch are gone before their parents. Ids of one depth run in parallel.
    ///
    /// An id that failed leaves the batch: its ancestors are then refused
    /// locally with `HasChildren` instead of being sent.
    fn delete_in_levels(&self, tree: &TaxonomyTree, scope: &Scope, ids: &[String]) -> DeletionReport {
        let mut batch: HashSet<String> = ids.iter().cloned().collect();
        let mut failed: HashSet<String> = HashSet::new();
        let mut outcomes: BTreeMap<&str, DeletionOutcome> = BTreeMap::new();
        let mut levels: BTreeMap<usize, Vec<&String>> = BTreeMap::new();

        for id in ids {
            match tree.depth(id) {
                Ok(depth) => levels.entry(depth).or_default().push(id),
                Err(e) => {
                    outcomes.insert(id.as_str(), DeletionOutcome::failed(id, e));
                }
            }
        }

        for (depth, level) in levels.into_iter().rev() {
            debug!("delete: depth {} with {} id(s)", depth, level.len());
            let results: Vec<(&String, ApplicationResult<()>)> = level
                .par_iter()
                .map(|&id| {
                    let result = self
                        .surviving_below(tree, id, &failed)
                        .map_err(ApplicationError::from)
                        .and_then(|()| self.store.remove_in(tree, scope, id, self.cascade, &batch));
                    (id, result)
                })
                .collect();
            for (id, result) in results {
                let outcome = match result {
                    Ok(()) => DeletionOutcome::ok(id),
                    Err(e) => {
                        warn!("delete {} failed: {}", id, e);
                        batch.remove(id);
                        failed.insert(id.clone());
                        DeletionOutcome::failed(id, e)
                    }
                };
                outcomes.insert(id.as_str(), outcome);
            }
        }

        DeletionReport::from_results(
            ids.iter()
                .filter_map(|id| outcomes.remove(id.as_str()))
                .collect(),
        )
    }

    /// With cascade, refuse `id` while a batch member below it failed to go.
    /// Without cascade `remove_in` sees the survivor as a blocking child.
    fn surviving_below(
        &self,
        tree: &TaxonomyTree,
        id: &str,
        failed: &HashSet<String>,
    ) -> Result<(), DomainError> {
        if !self.cascade {
            return Ok(());
        }
        let mut survivors = 0;
        for other in failed {
            if tree.is_descendant(other, id)? {
                survivors += 1;
            }
        }
        if survivors > 0 {
            return Err(DomainError::HasChildren {
                id: id.to_string(),
                children: survivors,
            });
        }
        Ok(())
    }

    /// Validate locally, then send one request for everything that passed.
    fn delete_via_endpoint(
        &self,
        tree: &TaxonomyTree,
        scope: &Scope,
        ids: &[String],
    ) -> DeletionReport {
        let batch: HashSet<String> = ids.iter().cloned().collect();
        let mut rejected: BTreeMap<&str, DeletionOutcome> = BTreeMap::new();
        let mut send: Vec<(usize, String)> = Vec::new();
        let mut queued: HashSet<String> = HashSet::new();

        for id in ids {
            match self.plan(tree, id, &batch) {
                Ok(nodes) => {
                    for (depth, node_id) in nodes {
                        if queued.insert(node_id.clone()) {
                            send.push((depth, node_id));
                        }
                    }
                }
                Err(e) => {
                    warn!("delete {} rejected: {}", id, e);
                    rejected.insert(id.as_str(), DeletionOutcome::failed(id, e));
                }
            }
        }
        // deepest first; stable sort keeps post-order within a subtree
        send.sort_by(|a, b| b.0.cmp(&a.0));
        let send: Vec<String> = send.into_iter().map(|(_, id)| id).collect();

        let mut returned = BTreeMap::new();
        if !send.is_empty() {
            match self.store.bulk_delete(scope, &send) {
                Ok(response) => {
                    for entry in response.results {
                        returned.insert(entry.id.clone(), entry);
                    }
                }
                Err(e) => {
                    warn!("bulk delete request failed: {}", e);
                    let message = e.to_string();
                    let unsent: Vec<&String> = ids
                        .iter()
                        .filter(|id| !rejected.contains_key(id.as_str()))
                        .collect();
                    for id in unsent {
                        rejected.insert(id.as_str(), DeletionOutcome::failed(id, &message));
                    }
                }
            }
        }

        let results = ids
            .iter()
            .map(|id| {
                if let Some(outcome) = rejected.remove(id.as_str()) {
                    return outcome;
                }
                match returned.get(id) {
                    Some(entry) if entry.success => DeletionOutcome::ok(id),
                    Some(entry) => DeletionOutcome::failed(
                        id,
                        entry
                            .message
                            .clone()
                            .unwrap_or_else(|| "rejected by the remote store".to_string()),
                    ),
                    None => DeletionOutcome::failed(id, "missing from the bulk delete response"),
                }
            })
            .collect();
        DeletionReport::from_results(results)
    }

    /// Nodes to send for `id` with their depth: the node itself, plus its
    /// descendants when cascading.
    fn plan(
        &self,
        tree: &TaxonomyTree,
        id: &str,
        batch: &HashSet<String>,
    ) -> Result<Vec<(usize, String)>, DomainError> {
        if !tree.contains(id) {
            return Err(DomainError::NotFound(id.to_string()));
        }
        if self.cascade {
            return tree
                .subtree_post_order(id)?
                .into_iter()
                .map(|n| Ok((tree.depth(&n.id)?, n.id.clone())))
                .collect();
        }

        let blocking = tree
            .children(id)
            .iter()
            .filter(|c| !batch.contains(&c.id))
            .count();
        if blocking > 0 {
            return Err(DomainError::HasChildren {
                id: id.to_string(),
                children: blocking,
            });
        }
        Ok(vec![(tree.depth(id)?, id.to_string())])
    }
}
