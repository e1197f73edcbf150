//! Exclusive default marker over the leaf nodes of a scope.

use tracing::trace;

use crate::domain::Node;

/// Current default among `nodes`, if any.
///
/// Stores may briefly report more than one default after concurrent edits;
/// the first one in store order wins.
pub fn current_default<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Option<&'a Node> {
    nodes.into_iter().find(|n| n.is_default)
}

/// Stateless toggle rule: toggling the current default unsets it,
/// anything else replaces it.
pub fn toggled(current: Option<&str>, node_id: &str) -> Option<String> {
    match current {
        Some(id) if id == node_id => None,
        _ => Some(node_id.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LastToggle {
    node_id: String,
    replaced: Option<String>,
}

/// Toggle state for one scope.
///
/// Remembers what the previous toggle replaced so that toggling the same
/// node twice in immediate succession restores the prior default instead
/// of leaving the scope without one.
#[derive(Debug, Clone, Default)]
pub struct DefaultDesignation {
    last: Option<LastToggle>,
}

impl DefaultDesignation {
    pub fn new() -> Self {
        Self::default()
    }

    /// New default after toggling `node_id` given the store's `current` default.
    pub fn toggle(&mut self, current: Option<&str>, node_id: &str) -> Option<String> {
        let restore = match (&self.last, current) {
            (Some(last), Some(cur)) if cur == node_id && last.node_id == node_id => {
                last.replaced.clone()
            }
            _ => None,
        };

        let next = restore.or_else(|| toggled(current, node_id));
        self.last = Some(LastToggle {
            node_id: node_id.to_string(),
            replaced: current.filter(|c| *c != node_id).map(str::to_string),
        });
        trace!("toggle {}: {:?} -> {:?}", node_id, current, next);
        next
    }

    /// Forget the remembered toggle, e.g. after the scope was reloaded.
    pub fn reset(&mut self) {
        self.last = None;
    }
}
