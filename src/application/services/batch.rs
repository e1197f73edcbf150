//! Helpers shared by the bulk operations.

use std::collections::HashSet;

/// Drop repeated ids, keeping the first occurrence and request order.
pub(super) fn dedup(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
