//! Multi-select state for bulk actions.
//!
//! Groups and subgroups can never be selected at the same time: the state is
//! a single tagged value, so exclusivity holds by construction.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Current bulk selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Selection {
    #[default]
    None,
    Groups { ids: BTreeSet<String> },
    Subgroups { ids: BTreeSet<String> },
}

/// Which category a selection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionCategory {
    Groups,
    Subgroups,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn category(&self) -> Option<SelectionCategory> {
        match self {
            Selection::None => None,
            Selection::Groups { .. } => Some(SelectionCategory::Groups),
            Selection::Subgroups { .. } => Some(SelectionCategory::Subgroups),
        }
    }

    /// Selected ids in sorted order.
    pub fn ids(&self) -> Vec<String> {
        match self {
            Selection::None => Vec::new(),
            Selection::Groups { ids } | Selection::Subgroups { ids } => {
                ids.iter().cloned().collect()
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        match self {
            Selection::None => false,
            Selection::Groups { ids } | Selection::Subgroups { ids } => ids.contains(id),
        }
    }

    fn set(&self, category: SelectionCategory) -> Option<&BTreeSet<String>> {
        match (self, category) {
            (Selection::Groups { ids }, SelectionCategory::Groups)
            | (Selection::Subgroups { ids }, SelectionCategory::Subgroups) => Some(ids),
            _ => None,
        }
    }
}

/// Tracks the selection and applies the exclusivity rule.
#[derive(Debug, Clone, Default)]
pub struct SelectionManager {
    state: Selection,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &Selection {
        &self.state
    }

    /// Add or remove a group. Any subgroup selection is dropped.
    pub fn select_group(&mut self, id: &str, selected: bool) {
        self.toggle(SelectionCategory::Groups, id, selected);
    }

    /// Add or remove a subgroup. Any group selection is dropped.
    pub fn select_subgroup(&mut self, id: &str, selected: bool) {
        self.toggle(SelectionCategory::Subgroups, id, selected);
    }

    pub fn clear(&mut self) {
        self.state = Selection::None;
    }

    fn toggle(&mut self, category: SelectionCategory, id: &str, selected: bool) {
        let mut ids = self.state.set(category).cloned().unwrap_or_default();
        if selected {
            ids.insert(id.to_string());
        } else {
            ids.remove(id);
        }

        self.state = match (ids.is_empty(), category) {
            (true, _) => Selection::None,
            (false, SelectionCategory::Groups) => Selection::Groups { ids },
            (false, SelectionCategory::Subgroups) => Selection::Subgroups { ids },
        };
        trace!("selection: {:?}", self.state);
    }
}
