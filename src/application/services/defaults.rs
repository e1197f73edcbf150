//! Default designation service
//!
//! Keeps at most one individual node per scope marked as default.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, instrument};

use crate::application::services::TaxonomyStore;
use crate::application::ApplicationResult;
use crate::domain::{current_default, DefaultDesignation, DomainError, ListKind, Node, NodeUpdate, Scope};

pub struct DefaultService {
    store: Arc<TaxonomyStore>,
    designations: Mutex<HashMap<Scope, DefaultDesignation>>,
}

impl DefaultService {
    pub fn new(store: Arc<TaxonomyStore>) -> Self {
        Self {
            store,
            designations: Mutex::new(HashMap::new()),
        }
    }

    /// Current default of `scope`, if any.
    pub fn current(&self, scope: &Scope) -> ApplicationResult<Option<Node>> {
        let nodes = self.store.list(scope, ListKind::LeafsOnly)?;
        Ok(current_default(&nodes).cloned())
    }

    /// Toggle `node_id` as the default of `scope` and return the new default.
    ///
    /// Toggling the current default unsets it; toggling any other node makes
    /// it the only default. Toggling the same node twice in a row restores
    /// the default that was in place before the first toggle.
    #[instrument(level = "debug", skip(self))]
    pub fn toggle_default(&self, scope: &Scope, node_id: &str) -> ApplicationResult<Option<String>> {
        // held for the whole toggle so that toggles of one process serialize
        let mut designations = self
            .designations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let tree = self.store.tree(scope)?;
        let node = tree
            .get(node_id)
            .ok_or_else(|| DomainError::NotFound(node_id.to_string()))?;
        if node.is_group {
            return Err(DomainError::Validation(format!(
                "group {node_id} cannot be the default"
            ))
            .into());
        }

        let current = current_default(tree.nodes().filter(|n| !n.is_group)).map(|n| n.id.clone());
        let designation = designations.entry(scope.clone()).or_default();
        let next = designation.toggle(current.as_deref(), node_id);
        debug!("toggle_default: {:?} -> {:?}", current, next);

        let stale: Vec<String> = tree
            .nodes()
            .filter(|n| n.is_default && Some(&n.id) != next.as_ref())
            .map(|n| n.id.clone())
            .collect();
        let applied = stale
            .iter()
            .try_for_each(|id| {
                self.store
                    .update_in(&tree, scope, id, &NodeUpdate::default_flag(false))
                    .map(|_| ())
            })
            .and_then(|()| match &next {
                Some(id) if tree.get(id).is_some_and(|n| !n.is_default) => self
                    .store
                    .update_in(&tree, scope, id, &NodeUpdate::default_flag(true))
                    .map(|_| ()),
                _ => Ok(()),
            });

        if let Err(e) = applied {
            designation.reset();
            return Err(e);
        }
        info!("default for {}: {:?}", scope, next);
        Ok(next)
    }
}
