//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use taxonomy::domain::{
    CreateRequest, LeafMember, ListKind, Node, NodeUpdate, Scope, TaxonomyKind,
};
use taxonomy::infrastructure::{
    BackendError, BulkDeleteEntry, BulkDeleteResponse, MemoryBackend, SelectionItem, Selector,
    TaxonomyBackend,
};

pub const KIND: TaxonomyKind = TaxonomyKind::ItemGroup;

pub fn acme() -> Scope {
    Scope::new("Acme", "AC")
}

pub fn node(id: &str, name: &str, parent: Option<&str>, is_group: bool) -> Node {
    Node {
        id: id.to_string(),
        display_name: name.to_string(),
        is_group,
        parent_id: parent.map(str::to_string),
        scope: "Acme".to_string(),
        is_default: false,
        modified: None,
    }
}

/// A(group) <- B(group) <- C(leaf), A <- D(leaf), plus an unrelated root E(group).
/// Three members are tagged to C and two to D, with the company suffix.
pub fn seeded_backend() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    for n in [
        node("a", "All Products - AC", None, true),
        node("b", "Hardware - AC", Some("a"), true),
        node("c", "Screws - AC", Some("b"), false),
        node("d", "Paint - AC", Some("a"), false),
        node("e", "Services - AC", None, true),
    ] {
        backend.seed(KIND, n);
    }
    for _ in 0..3 {
        backend.add_member(KIND, LeafMember::new("Screws - AC", "Acme"));
    }
    backend.add_member(KIND, LeafMember::new("Paint - AC", "Acme"));
    backend.add_member(KIND, LeafMember::new("Paint", "Acme"));
    backend
}

pub fn ids(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Delegates to a memory backend but rejects updates and deletes of
/// selected ids, as a remote store would on a server-side failure.
pub struct FailingBackend {
    pub inner: Arc<MemoryBackend>,
    fail_ids: HashSet<String>,
    fail_lists: bool,
    lists: AtomicUsize,
}

impl FailingBackend {
    pub fn new(inner: Arc<MemoryBackend>, fail_ids: &[&str]) -> Self {
        Self {
            inner,
            fail_ids: fail_ids.iter().map(|s| s.to_string()).collect(),
            fail_lists: false,
            lists: AtomicUsize::new(0),
        }
    }

    /// Every call fails without a message, like a dropped connection.
    pub fn offline(inner: Arc<MemoryBackend>) -> Self {
        Self {
            fail_lists: true,
            ..Self::new(inner, &[])
        }
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    fn check(&self, id: &str) -> Result<(), BackendError> {
        if self.fail_lists {
            return Err(BackendError::Transport { message: None });
        }
        if self.fail_ids.contains(id) {
            return Err(BackendError::Rejected {
                status: 500,
                message: Some(format!("server refused {id}")),
            });
        }
        Ok(())
    }
}

impl TaxonomyBackend for FailingBackend {
    fn list_nodes(
        &self,
        kind: TaxonomyKind,
        scope: &Scope,
        list_kind: ListKind,
    ) -> Result<Vec<Node>, BackendError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        if self.fail_lists {
            return Err(BackendError::Transport { message: None });
        }
        self.inner.list_nodes(kind, scope, list_kind)
    }

    fn create_node(&self, kind: TaxonomyKind, request: &CreateRequest) -> Result<Node, BackendError> {
        self.check(&request.display_name)?;
        self.inner.create_node(kind, request)
    }

    fn update_node(
        &self,
        kind: TaxonomyKind,
        id: &str,
        changes: &NodeUpdate,
    ) -> Result<Node, BackendError> {
        self.check(id)?;
        self.inner.update_node(kind, id, changes)
    }

    fn delete_node(&self, kind: TaxonomyKind, id: &str) -> Result<(), BackendError> {
        self.check(id)?;
        self.inner.delete_node(kind, id)
    }

    fn bulk_delete(
        &self,
        kind: TaxonomyKind,
        ids: &[String],
    ) -> Result<BulkDeleteResponse, BackendError> {
        if self.fail_lists {
            return Err(BackendError::Transport { message: None });
        }
        let (refused, allowed): (Vec<String>, Vec<String>) =
            ids.iter().cloned().partition(|id| self.fail_ids.contains(id));
        let mut response = self.inner.bulk_delete(kind, &allowed)?;
        response.results.extend(refused.into_iter().map(|id| BulkDeleteEntry {
            message: Some(format!("server refused {id}")),
            id,
            success: false,
        }));
        Ok(response)
    }

    fn list_leaf_members(
        &self,
        kind: TaxonomyKind,
        scope: &Scope,
    ) -> Result<Vec<LeafMember>, BackendError> {
        if self.fail_lists {
            return Err(BackendError::Transport { message: None });
        }
        self.inner.list_leaf_members(kind, scope)
    }
}

/// Mock selector that returns a predetermined selection
pub struct MockSelector {
    selection_index: Option<usize>,
}

impl MockSelector {
    pub fn new(selection_index: Option<usize>) -> Self {
        Self { selection_index }
    }
}

impl Selector for MockSelector {
    fn select_one(
        &self,
        items: &[SelectionItem],
        _prompt: &str,
    ) -> Result<Option<SelectionItem>, String> {
        match self.selection_index {
            Some(idx) if idx < items.len() => Ok(Some(items[idx].clone())),
            Some(_) => Err("Index out of bounds".to_string()),
            None => Ok(None), // User cancelled
        }
    }
}
