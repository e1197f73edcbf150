//! I/O boundary traits for testability
//!
//! These traits abstract the remote store and interactive prompts, allowing
//! services to be tested with in-memory or mock implementations.

use serde::{Deserialize, Serialize};

use crate::domain::{
    CreateRequest, LeafMember, ListKind, Node, NodeUpdate, Scope, TaxonomyKind,
};
use crate::infrastructure::error::BackendError;

/// Per-id outcome of a bulk delete, as reported by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteEntry {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Response body of `POST /{resource}/bulk-delete`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    pub deleted_count: usize,
    pub results: Vec<BulkDeleteEntry>,
}

/// Remote taxonomy store.
///
/// Every call is one round-trip. Implementations must be shareable across
/// threads: bulk operations fan out their member calls in parallel.
pub trait TaxonomyBackend: Send + Sync {
    /// List the nodes of one scope, filtered by `list_kind`.
    fn list_nodes(
        &self,
        kind: TaxonomyKind,
        scope: &Scope,
        list_kind: ListKind,
    ) -> Result<Vec<Node>, BackendError>;

    fn create_node(&self, kind: TaxonomyKind, request: &CreateRequest)
        -> Result<Node, BackendError>;

    fn update_node(
        &self,
        kind: TaxonomyKind,
        id: &str,
        changes: &NodeUpdate,
    ) -> Result<Node, BackendError>;

    fn delete_node(&self, kind: TaxonomyKind, id: &str) -> Result<(), BackendError>;

    /// Delete several nodes in one request; per-id failures are reported in
    /// the response, not as an error.
    fn bulk_delete(
        &self,
        kind: TaxonomyKind,
        ids: &[String],
    ) -> Result<BulkDeleteResponse, BackendError>;

    /// Members carrying a raw group name for `kind`. Empty for taxonomies
    /// without members.
    fn list_leaf_members(
        &self,
        kind: TaxonomyKind,
        scope: &Scope,
    ) -> Result<Vec<LeafMember>, BackendError>;
}

/// Item for FZF-style selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionItem {
    /// Display text shown in selector
    pub display: String,
    /// Actual value (node id)
    pub value: String,
}

/// Interactive FZF-style selector abstraction.
pub trait Selector: Send + Sync {
    /// Present items to user and return selected one.
    /// Returns None if user cancels (Esc/Ctrl-C).
    fn select_one(
        &self,
        items: &[SelectionItem],
        prompt: &str,
    ) -> Result<Option<SelectionItem>, String>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real selector implementation using skim (FZF-like).
#[derive(Debug, Default)]
pub struct SkimSelector;

impl Selector for SkimSelector {
    fn select_one(
        &self,
        items: &[SelectionItem],
        prompt: &str,
    ) -> Result<Option<SelectionItem>, String> {
        use skim::prelude::*;
        use std::io::Cursor;

        if items.is_empty() {
            return Ok(None);
        }

        let input = items
            .iter()
            .map(|i| i.display.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let options = SkimOptionsBuilder::default()
            .prompt(Some(prompt))
            .height(Some("40%"))
            .multi(false)
            .build()
            .map_err(|e| format!("failed to build skim options: {e}"))?;

        let item_reader = SkimItemReader::default();
        let source = item_reader.of_bufread(Cursor::new(input));

        match Skim::run_with(&options, Some(source)) {
            Some(out) if out.is_abort => Ok(None),
            Some(out) => Ok(out.selected_items.first().and_then(|selected| {
                let display = selected.output().to_string();
                items.iter().find(|i| i.display == display).cloned()
            })),
            None => Ok(None),
        }
    }
}
