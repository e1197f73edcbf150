//! Loaded view of one scope: nodes, counts and the bulk-action selection.
//!
//! Bulk actions always end with a cleared selection and a fresh load, no
//! matter how many of their member operations failed.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::services::{
    DeletionReport, DeletionService, RegroupReport, RegroupService, TaxonomyStore,
};
use crate::application::ApplicationResult;
use crate::domain::{Counts, DomainError, ListKind, Node, Scope, Selection, SelectionManager};

pub struct TaxonomySession {
    store: Arc<TaxonomyStore>,
    regroup: RegroupService,
    deletion: DeletionService,
    scope: Scope,
    list_kind: ListKind,
    nodes: Vec<Node>,
    counts: Option<Arc<Counts>>,
    selection: SelectionManager,
}

impl TaxonomySession {
    pub fn new(
        store: Arc<TaxonomyStore>,
        regroup: RegroupService,
        deletion: DeletionService,
        scope: Scope,
    ) -> Self {
        Self {
            store,
            regroup,
            deletion,
            scope,
            list_kind: ListKind::All,
            nodes: Vec::new(),
            counts: None,
            selection: SelectionManager::new(),
        }
    }

    pub fn with_list_kind(mut self, list_kind: ListKind) -> Self {
        self.list_kind = list_kind;
        self
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Counts from the last load; always computed over the full tree.
    pub fn counts(&self) -> Option<&Counts> {
        self.counts.as_deref()
    }

    pub fn selection(&self) -> &Selection {
        self.selection.state()
    }

    /// Fetch nodes and counts again.
    pub fn reload(&mut self) -> ApplicationResult<()> {
        debug!("reload: {} ({:?})", self.scope, self.list_kind);
        self.nodes = self.store.list(&self.scope, self.list_kind)?;
        self.counts = Some(self.store.counts(&self.scope)?);
        Ok(())
    }

    pub fn select_group(&mut self, id: &str, selected: bool) {
        self.selection.select_group(id, selected);
    }

    pub fn select_subgroup(&mut self, id: &str, selected: bool) {
        self.selection.select_subgroup(id, selected);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Move the selected nodes under `target`.
    pub fn regroup_selection(&mut self, target: &str) -> ApplicationResult<RegroupReport> {
        let ids = self.selected_ids()?;
        let result = self.regroup.regroup(&self.scope, &ids, target);
        self.finish(result)
    }

    /// Delete the selected nodes.
    pub fn delete_selection(&mut self) -> ApplicationResult<DeletionReport> {
        let ids = self.selected_ids()?;
        let result = self.deletion.delete_many(&self.scope, &ids);
        self.finish(result)
    }

    /// Delete one node, independent of the selection.
    pub fn delete_one(&mut self, id: &str) -> ApplicationResult<()> {
        let result = self.deletion.delete_one(&self.scope, id);
        self.finish(result)
    }

    fn selected_ids(&self) -> ApplicationResult<Vec<String>> {
        let ids = self.selection.state().ids();
        if ids.is_empty() {
            return Err(DomainError::Validation("nothing selected".into()).into());
        }
        Ok(ids)
    }

    /// Clear the selection and reload. The operation's own error wins over
    /// a failed reload.
    fn finish<T>(&mut self, result: ApplicationResult<T>) -> ApplicationResult<T> {
        self.selection.clear();
        let reloaded = self.reload();
        if let Err(e) = &reloaded {
            warn!("reload after bulk action failed: {}", e);
        }
        let value = result?;
        reloaded?;
        Ok(value)
    }
}
