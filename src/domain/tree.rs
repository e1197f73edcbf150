//! Arena-backed view of one scope's nodes.
//!
//! Built from a flat node list as returned by the remote store. The arena
//! tolerates malformed input (orphans, cycles); traversals that would loop
//! fail with [`DomainError::CycleDetected`] instead.

use std::collections::{HashMap, HashSet};

use generational_arena::{Arena, Index};
use termtree::Tree;
use tracing::{instrument, warn};

use crate::domain::{DomainError, Node};

/// Tree node in the arena.
#[derive(Debug)]
pub struct TreeNode {
    pub node: Node,
    /// Index of the parent in the arena, None for roots and orphans
    pub parent: Option<Index>,
    pub children: Vec<Index>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

/// Forest of taxonomy nodes with id lookup.
#[derive(Debug, Default)]
pub struct TaxonomyTree {
    arena: Arena<TreeNode>,
    /// Insertion order, as delivered by the store
    order: Vec<Index>,
    by_id: HashMap<String, Index>,
    /// Nodes whose `parent_id` does not resolve
    orphans: Vec<String>,
}

impl TaxonomyTree {
    #[instrument(level = "debug", skip(nodes), fields(count = nodes.len()))]
    pub fn from_nodes(nodes: &[Node]) -> Self {
        let mut tree = Self::default();

        for node in nodes {
            if tree.by_id.contains_key(&node.id) {
                warn!("duplicate node id ignored: {}", node.id);
                continue;
            }
            let idx = tree.arena.insert(TreeNode {
                node: node.clone(),
                parent: None,
                children: Vec::new(),
            });
            tree.by_id.insert(node.id.clone(), idx);
            tree.order.push(idx);
        }

        // Link in a second pass: parents may arrive after their children.
        for &idx in &tree.order {
            let parent_id = tree.arena[idx].node.parent_id.clone();
            let Some(parent_id) = parent_id else { continue };
            match tree.by_id.get(&parent_id).copied() {
                Some(parent_idx) => {
                    tree.arena[idx].parent = Some(parent_idx);
                    tree.arena[parent_idx].children.push(idx);
                }
                None => {
                    warn!(
                        "node {} references missing parent {}",
                        tree.arena[idx].node.id, parent_id
                    );
                    tree.orphans.push(tree.arena[idx].node.id.clone());
                }
            }
        }

        tree
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.by_id.get(id).map(|&idx| &self.arena[idx].node)
    }

    /// All nodes in store order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.order.iter().map(move |&idx| &self.arena[idx].node)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Node> {
        self.nodes().filter(|n| n.is_group)
    }

    /// Nodes without a resolvable parent.
    pub fn roots(&self) -> Vec<&Node> {
        self.order
            .iter()
            .filter(|&&idx| self.arena[idx].parent.is_none())
            .map(|&idx| &self.arena[idx].node)
            .collect()
    }

    pub fn orphans(&self) -> &[String] {
        &self.orphans
    }

    /// Direct children of `id`, empty for unknown ids.
    pub fn children(&self, id: &str) -> Vec<&Node> {
        self.by_id
            .get(id)
            .map(|&idx| {
                self.arena[idx]
                    .children
                    .iter()
                    .map(|&c| &self.arena[c].node)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Child ids per parent id (the adjacency map used for aggregation).
    pub fn adjacency(&self) -> HashMap<&str, Vec<&str>> {
        self.order
            .iter()
            .map(|&idx| {
                let entry = &self.arena[idx];
                let children = entry
                    .children
                    .iter()
                    .map(|&c| self.arena[c].node.id.as_str())
                    .collect();
                (entry.node.id.as_str(), children)
            })
            .collect()
    }

    /// Every node, children before parents.
    ///
    /// # Errors
    /// [`DomainError::CycleDetected`] if some node is its own ancestor.
    pub fn post_order(&self) -> Result<Vec<&Node>, DomainError> {
        let indices = self.walk_post_order(self.order.iter().copied())?;
        Ok(indices.into_iter().map(|idx| &self.arena[idx].node).collect())
    }

    /// Subtree of `id` (including `id`), deepest nodes first.
    pub fn subtree_post_order(&self, id: &str) -> Result<Vec<&Node>, DomainError> {
        let start = self
            .by_id
            .get(id)
            .copied()
            .ok_or_else(|| DomainError::NotFound(id.to_string()))?;
        let indices = self.walk_post_order(std::iter::once(start))?;
        Ok(indices.into_iter().map(|idx| &self.arena[idx].node).collect())
    }

    fn walk_post_order(
        &self,
        starts: impl Iterator<Item = Index>,
    ) -> Result<Vec<Index>, DomainError> {
        let mut state: HashMap<Index, VisitState> = HashMap::with_capacity(self.len());
        let mut output = Vec::with_capacity(self.len());

        for start in starts {
            if state.contains_key(&start) {
                continue;
            }
            let mut stack = vec![(start, false)];
            while let Some((idx, expanded)) = stack.pop() {
                if expanded {
                    state.insert(idx, VisitState::Done);
                    output.push(idx);
                    continue;
                }
                match state.get(&idx) {
                    Some(VisitState::Done) => continue,
                    Some(VisitState::InProgress) => {
                        return Err(DomainError::CycleDetected(self.arena[idx].node.id.clone()));
                    }
                    None => {}
                }
                state.insert(idx, VisitState::InProgress);
                stack.push((idx, true));
                for &child in self.arena[idx].children.iter().rev() {
                    stack.push((child, false));
                }
            }
        }

        Ok(output)
    }

    /// True if `candidate` lies strictly below `ancestor`.
    ///
    /// Walks the parent chain of `candidate`, so the cost is the depth of
    /// the tree, not its size.
    pub fn is_descendant(&self, candidate: &str, ancestor: &str) -> Result<bool, DomainError> {
        let Some(&start) = self.by_id.get(candidate) else {
            return Ok(false);
        };
        let mut seen = HashSet::new();
        let mut current = self.arena[start].parent;
        while let Some(idx) = current {
            let node = &self.arena[idx].node;
            if node.id == ancestor {
                return Ok(true);
            }
            if !seen.insert(idx) {
                return Err(DomainError::CycleDetected(node.id.clone()));
            }
            current = self.arena[idx].parent;
        }
        Ok(false)
    }

    /// Number of ancestors of `id`; roots and orphans have depth 0.
    pub fn depth(&self, id: &str) -> Result<usize, DomainError> {
        let start = self
            .by_id
            .get(id)
            .copied()
            .ok_or_else(|| DomainError::NotFound(id.to_string()))?;
        let mut seen = HashSet::new();
        let mut depth = 0;
        let mut current = self.arena[start].parent;
        while let Some(idx) = current {
            if !seen.insert(idx) {
                return Err(DomainError::CycleDetected(self.arena[idx].node.id.clone()));
            }
            depth += 1;
            current = self.arena[idx].parent;
        }
        Ok(depth)
    }

    /// Render the forest for terminal display.
    ///
    /// Nodes caught in a cycle are unreachable from any root and are not shown.
    pub fn render<F>(&self, label: F) -> Vec<Tree<String>>
    where
        F: Fn(&Node) -> String,
    {
        self.order
            .iter()
            .filter(|&&idx| self.arena[idx].parent.is_none())
            .map(|&idx| self.render_node(idx, &label))
            .collect()
    }

    fn render_node<F>(&self, idx: Index, label: &F) -> Tree<String>
    where
        F: Fn(&Node) -> String,
    {
        let entry = &self.arena[idx];
        let leaves: Vec<Tree<String>> = entry
            .children
            .iter()
            .map(|&child| self.render_node(child, label))
            .collect();
        Tree::new(label(&entry.node)).with_leaves(leaves)
    }
}
