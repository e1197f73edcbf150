//! In-process taxonomy store.
//!
//! Mirrors the remote store's server-side checks (unknown ids, duplicate
//! names, deleting a node that still has children) so services behave the
//! same against it as against the REST backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::trace;
use uuid::Uuid;

use crate::domain::{
    CreateRequest, LeafMember, ListKind, Node, NodeUpdate, Scope, TaxonomyKind,
};
use crate::infrastructure::error::BackendError;
use crate::infrastructure::traits::{BulkDeleteEntry, BulkDeleteResponse, TaxonomyBackend};

#[derive(Debug, Default)]
struct MemoryState {
    nodes: Vec<(TaxonomyKind, Node)>,
    members: Vec<(TaxonomyKind, LeafMember)>,
}

/// Taxonomy store held in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    mutations: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a node as-is, bypassing all checks. Useful for loading
    /// snapshots, including malformed ones.
    pub fn seed(&self, kind: TaxonomyKind, node: Node) {
        self.state().nodes.push((kind, node));
    }

    pub fn add_member(&self, kind: TaxonomyKind, member: LeafMember) {
        self.state().members.push((kind, member));
    }

    /// All nodes of `kind`, across scopes.
    pub fn snapshot(&self, kind: TaxonomyKind) -> Vec<Node> {
        self.state()
            .nodes
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, n)| n.clone())
            .collect()
    }

    /// Number of mutating calls received (create, update, delete, bulk delete).
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    fn record_mutation(&self) {
        self.mutations.fetch_add(1, Ordering::SeqCst);
    }
}

impl MemoryState {
    fn position(&self, kind: TaxonomyKind, id: &str) -> Option<usize> {
        self.nodes
            .iter()
            .position(|(k, n)| *k == kind && n.id == id)
    }

    fn name_taken(&self, kind: TaxonomyKind, scope: &str, name: &str, except: Option<&str>) -> bool {
        self.nodes.iter().any(|(k, n)| {
            *k == kind && n.scope == scope && n.display_name == name && Some(n.id.as_str()) != except
        })
    }

    fn child_count(&self, kind: TaxonomyKind, id: &str) -> usize {
        self.nodes
            .iter()
            .filter(|(k, n)| *k == kind && n.parent_id.as_deref() == Some(id))
            .count()
    }

    fn check_parent(&self, kind: TaxonomyKind, parent_id: &str) -> Result<(), BackendError> {
        match self.position(kind, parent_id) {
            Some(pos) if self.nodes[pos].1.is_group => Ok(()),
            Some(_) => Err(BackendError::Rejected {
                status: 422,
                message: Some(format!("{parent_id} is not a group")),
            }),
            None => Err(BackendError::NotFound(parent_id.to_string())),
        }
    }

    fn delete(&mut self, kind: TaxonomyKind, id: &str) -> Result<(), BackendError> {
        let pos = self
            .position(kind, id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        let children = self.child_count(kind, id);
        if children > 0 {
            return Err(BackendError::Rejected {
                status: 417,
                message: Some(format!("{id} still has {children} child node(s)")),
            });
        }
        self.nodes.remove(pos);
        Ok(())
    }
}

impl TaxonomyBackend for MemoryBackend {
    fn list_nodes(
        &self,
        kind: TaxonomyKind,
        scope: &Scope,
        list_kind: ListKind,
    ) -> Result<Vec<Node>, BackendError> {
        Ok(self
            .state()
            .nodes
            .iter()
            .filter(|(k, n)| *k == kind && n.in_scope(scope) && list_kind.accepts(n))
            .map(|(_, n)| n.clone())
            .collect())
    }

    fn create_node(&self, kind: TaxonomyKind, request: &CreateRequest) -> Result<Node, BackendError> {
        self.record_mutation();
        let mut state = self.state();
        if state.name_taken(kind, &request.scope, &request.display_name, None) {
            return Err(BackendError::Conflict(request.display_name.clone()));
        }
        if let Some(parent_id) = &request.parent_id {
            state.check_parent(kind, parent_id)?;
        }

        let node = Node {
            id: Uuid::new_v4().to_string(),
            display_name: request.display_name.clone(),
            is_group: request.is_group,
            parent_id: request.parent_id.clone(),
            scope: request.scope.clone(),
            is_default: false,
            modified: Some(Utc::now()),
        };
        trace!("memory create {} {}", kind, node.id);
        state.nodes.push((kind, node.clone()));
        Ok(node)
    }

    fn update_node(
        &self,
        kind: TaxonomyKind,
        id: &str,
        changes: &NodeUpdate,
    ) -> Result<Node, BackendError> {
        self.record_mutation();
        let mut state = self.state();
        let pos = state
            .position(kind, id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;

        if let Some(name) = &changes.display_name {
            let scope = state.nodes[pos].1.scope.clone();
            if state.name_taken(kind, &scope, name, Some(id)) {
                return Err(BackendError::Conflict(name.clone()));
            }
        }
        if let Some(Some(parent_id)) = &changes.parent_id {
            state.check_parent(kind, parent_id)?;
        }

        let node = &mut state.nodes[pos].1;
        if let Some(name) = &changes.display_name {
            node.display_name = name.clone();
        }
        if let Some(parent_id) = &changes.parent_id {
            node.parent_id = parent_id.clone();
        }
        if let Some(is_default) = changes.is_default {
            node.is_default = is_default;
        }
        node.modified = Some(Utc::now());
        trace!("memory update {} {}", kind, id);
        Ok(node.clone())
    }

    fn delete_node(&self, kind: TaxonomyKind, id: &str) -> Result<(), BackendError> {
        self.record_mutation();
        self.state().delete(kind, id)
    }

    fn bulk_delete(
        &self,
        kind: TaxonomyKind,
        ids: &[String],
    ) -> Result<BulkDeleteResponse, BackendError> {
        self.record_mutation();
        let mut state = self.state();
        let results: Vec<BulkDeleteEntry> = ids
            .iter()
            .map(|id| match state.delete(kind, id) {
                Ok(()) => BulkDeleteEntry {
                    id: id.clone(),
                    success: true,
                    message: None,
                },
                Err(e) => BulkDeleteEntry {
                    id: id.clone(),
                    success: false,
                    message: Some(e.to_string()),
                },
            })
            .collect();

        Ok(BulkDeleteResponse {
            deleted_count: results.iter().filter(|r| r.success).count(),
            results,
        })
    }

    fn list_leaf_members(
        &self,
        kind: TaxonomyKind,
        scope: &Scope,
    ) -> Result<Vec<LeafMember>, BackendError> {
        Ok(self
            .state()
            .members
            .iter()
            .filter(|(k, m)| *k == kind && m.scope == scope.name)
            .map(|(_, m)| m.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme() -> Scope {
        Scope::new("Acme", "AC")
    }

    fn create(backend: &MemoryBackend, name: &str, parent: Option<&str>, is_group: bool) -> Node {
        backend
            .create_node(
                TaxonomyKind::ItemGroup,
                &CreateRequest {
                    display_name: name.to_string(),
                    parent_id: parent.map(str::to_string),
                    is_group,
                    scope: "Acme".to_string(),
                },
            )
            .unwrap()
    }

    #[test]
    fn test_list_filters_by_kind_and_scope() {
        let backend = MemoryBackend::new();
        let root = create(&backend, "All", None, true);
        create(&backend, "Leaf", Some(&root.id), false);

        let parents = backend
            .list_nodes(TaxonomyKind::ItemGroup, &acme(), ListKind::ParentsOnly)
            .unwrap();
        let other = backend
            .list_nodes(TaxonomyKind::CostCenter, &acme(), ListKind::All)
            .unwrap();

        assert_eq!(parents.len(), 1);
        assert!(other.is_empty());
    }

    #[test]
    fn test_delete_with_children_is_rejected() {
        let backend = MemoryBackend::new();
        let root = create(&backend, "All", None, true);
        create(&backend, "Leaf", Some(&root.id), false);

        let result = backend.delete_node(TaxonomyKind::ItemGroup, &root.id);
        assert!(matches!(result, Err(BackendError::Rejected { status: 417, .. })));
    }

    #[test]
    fn test_duplicate_name_conflicts() {
        let backend = MemoryBackend::new();
        create(&backend, "All", None, true);

        let result = backend.create_node(
            TaxonomyKind::ItemGroup,
            &CreateRequest {
                display_name: "All".to_string(),
                parent_id: None,
                is_group: true,
                scope: "Acme".to_string(),
            },
        );
        assert!(matches!(result, Err(BackendError::Conflict(_))));
        assert_eq!(backend.mutation_count(), 2);
    }
}
