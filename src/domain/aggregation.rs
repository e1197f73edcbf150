//! Recursive member counts over a taxonomy tree.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::domain::normalize::normalize;
use crate::domain::tree::TaxonomyTree;
use crate::domain::{DomainError, LeafMember, Node};

/// Per-node member counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    /// Members whose group name matches the node itself
    direct: HashMap<String, usize>,
    /// Direct count plus the totals of all children
    total: HashMap<String, usize>,
    /// Members whose group name matched no node
    unmatched: usize,
}

impl Counts {
    pub fn total(&self, id: &str) -> usize {
        self.total.get(id).copied().unwrap_or(0)
    }

    pub fn direct(&self, id: &str) -> usize {
        self.direct.get(id).copied().unwrap_or(0)
    }

    pub fn unmatched(&self) -> usize {
        self.unmatched
    }

    pub fn totals(&self) -> &HashMap<String, usize> {
        &self.total
    }

    pub fn len(&self) -> usize {
        self.total.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_empty()
    }
}

/// True if `nodes` holds only group nodes, i.e. came from a parents-only
/// listing. Child counts would be silently dropped; load the full tree first.
pub fn needs_full_tree(nodes: &[Node]) -> bool {
    !nodes.is_empty() && nodes.iter().all(|n| n.is_group)
}

/// Compute direct and recursive member counts for every node.
///
/// Members are matched to nodes by normalized name within the same scope.
/// Totals are summed bottom-up over a post-order traversal, so for every
/// node `total = direct + sum(total(child))`.
///
/// # Errors
/// [`DomainError::CycleDetected`] if the parent links form a cycle.
#[instrument(level = "debug", skip(nodes, members), fields(nodes = nodes.len(), members = members.len()))]
pub fn compute_counts(
    nodes: &[Node],
    members: &[LeafMember],
    abbreviation: &str,
) -> Result<Counts, DomainError> {
    let tree = TaxonomyTree::from_nodes(nodes);

    let mut by_name: HashMap<(&str, String), &str> = HashMap::with_capacity(tree.len());
    for node in tree.nodes() {
        let key = (node.scope.as_str(), normalize(&node.display_name, abbreviation));
        if let Some(existing) = by_name.insert(key, node.id.as_str()) {
            warn!(
                "nodes {} and {} normalize to the same name; members go to {}",
                existing, node.id, node.id
            );
        }
    }

    let mut direct: HashMap<String, usize> =
        tree.nodes().map(|n| (n.id.clone(), 0)).collect();
    let mut unmatched = 0;
    for member in members {
        let key = (
            member.scope.as_str(),
            normalize(&member.raw_group_name, abbreviation),
        );
        match by_name.get(&key) {
            Some(id) => *direct.entry((*id).to_string()).or_default() += 1,
            None => unmatched += 1,
        }
    }
    if unmatched > 0 {
        debug!("{} member(s) matched no node", unmatched);
    }

    let adjacency = tree.adjacency();
    let mut total: HashMap<String, usize> = HashMap::with_capacity(tree.len());
    for node in tree.post_order()? {
        let own = direct.get(&node.id).copied().unwrap_or(0);
        let below: usize = adjacency
            .get(node.id.as_str())
            .map(|children| children.iter().map(|c| total.get(*c).copied().unwrap_or(0)).sum())
            .unwrap_or(0);
        total.insert(node.id.clone(), own + below);
    }

    Ok(Counts {
        direct,
        total,
        unmatched,
    })
}
