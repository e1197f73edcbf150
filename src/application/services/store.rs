//! Taxonomy store service
//!
//! Validated CRUD for one taxonomy kind against the remote store, plus the
//! per-scope aggregation cache.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    compute_counts, needs_full_tree, Counts, CreateRequest, DomainError, LeafMember, ListKind,
    NewNode, Node, NodeUpdate, NormalizationService, Scope, TaxonomyKind, TaxonomyTree,
};
use crate::infrastructure::traits::{BulkDeleteResponse, TaxonomyBackend};

/// Store for the nodes of one taxonomy kind.
///
/// Every mutating call invalidates the cached counts of its scope, whether
/// or not the remote store accepted it.
pub struct TaxonomyStore {
    backend: Arc<dyn TaxonomyBackend>,
    kind: TaxonomyKind,
    counts: Mutex<HashMap<Scope, Arc<Counts>>>,
}

impl TaxonomyStore {
    pub fn new(backend: Arc<dyn TaxonomyBackend>, kind: TaxonomyKind) -> Self {
        Self {
            backend,
            kind,
            counts: Mutex::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> TaxonomyKind {
        self.kind
    }

    /// Nodes of `scope` in store order.
    pub fn list(&self, scope: &Scope, list_kind: ListKind) -> ApplicationResult<Vec<Node>> {
        debug!("list: kind={} scope={} filter={:?}", self.kind, scope, list_kind);
        Ok(self.backend.list_nodes(self.kind, scope, list_kind)?)
    }

    /// Full tree of `scope`.
    pub fn tree(&self, scope: &Scope) -> ApplicationResult<TaxonomyTree> {
        let nodes = self.list(scope, ListKind::All)?;
        Ok(TaxonomyTree::from_nodes(&nodes))
    }

    pub fn leaf_members(&self, scope: &Scope) -> ApplicationResult<Vec<LeafMember>> {
        Ok(self.backend.list_leaf_members(self.kind, scope)?)
    }

    /// Create a node.
    ///
    /// Without an explicit type the node becomes a group if the scope has no
    /// groups yet, and an individual node otherwise.
    ///
    /// # Errors
    /// - `Validation` for an empty name
    /// - `MissingParent` for an individual node without a parent
    /// - `DuplicateName` if the normalized name is already taken in the scope
    /// - `InvalidParent` if the parent is unknown or not a group
    #[instrument(level = "debug", skip(self))]
    pub fn create(&self, scope: &Scope, new: &NewNode) -> ApplicationResult<Node> {
        let display_name = new.display_name.trim();
        if display_name.is_empty() {
            return Err(DomainError::Validation("display name is required".into()).into());
        }
        if new.is_group == Some(false) && new.parent_id.is_none() {
            return Err(DomainError::MissingParent(display_name.to_string()).into());
        }

        let tree = self.tree(scope)?;
        let names = NormalizationService::new(scope.abbreviation.clone());
        if let Some(existing) = tree
            .nodes()
            .find(|n| names.same_name(&n.display_name, display_name))
        {
            debug!("create: {} collides with {}", display_name, existing.id);
            return Err(DomainError::DuplicateName(display_name.to_string()).into());
        }

        let is_group = new.is_group.unwrap_or_else(|| tree.groups().next().is_none());
        match &new.parent_id {
            Some(parent_id) => Self::check_parent(&tree, parent_id)?,
            None if !is_group => {
                return Err(DomainError::MissingParent(display_name.to_string()).into())
            }
            None => {}
        }

        let request = CreateRequest {
            display_name: display_name.to_string(),
            parent_id: new.parent_id.clone(),
            is_group,
            scope: scope.name.clone(),
        };
        let result = self.backend.create_node(self.kind, &request);
        self.invalidate(scope);
        let node = result?;
        info!("created {} {} ({})", self.kind, node.id, node.display_name);
        Ok(node)
    }

    /// Apply a partial update, loading the scope's tree for validation.
    pub fn update(&self, scope: &Scope, id: &str, changes: &NodeUpdate) -> ApplicationResult<Node> {
        let tree = self.tree(scope)?;
        self.update_in(&tree, scope, id, changes)
    }

    /// Apply a partial update validated against an already loaded `tree`.
    ///
    /// Renames keep names unique within the scope. Reparenting keeps the
    /// parent-validity and acyclicity invariants; individual nodes cannot be
    /// moved to the root. Only individual nodes can carry the default flag.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn update_in(
        &self,
        tree: &TaxonomyTree,
        scope: &Scope,
        id: &str,
        changes: &NodeUpdate,
    ) -> ApplicationResult<Node> {
        if changes.is_empty() {
            return Err(DomainError::Validation(format!("nothing to update for {id}")).into());
        }
        let node = tree
            .get(id)
            .ok_or_else(|| DomainError::NotFound(id.to_string()))?;

        let mut changes = changes.clone();
        if let Some(name) = &changes.display_name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::Validation("display name is required".into()).into());
            }
            let names = NormalizationService::new(scope.abbreviation.clone());
            if tree
                .nodes()
                .any(|n| n.id != id && names.same_name(&n.display_name, &name))
            {
                return Err(DomainError::DuplicateName(name).into());
            }
            changes.display_name = Some(name);
        }

        match &changes.parent_id {
            Some(Some(parent_id)) => {
                if parent_id == id || tree.is_descendant(parent_id, id)? {
                    return Err(DomainError::CycleDetected(format!(
                        "{id} cannot be moved below {parent_id}"
                    ))
                    .into());
                }
                Self::check_parent(tree, parent_id)?;
            }
            Some(None) if !node.is_group => {
                return Err(DomainError::MissingParent(node.display_name.clone()).into());
            }
            _ => {}
        }

        if changes.is_default == Some(true) && node.is_group {
            return Err(DomainError::Validation(format!(
                "group {id} cannot be the default"
            ))
            .into());
        }

        let result = self.backend.update_node(self.kind, id, &changes);
        self.invalidate(scope);
        Ok(result?)
    }

    /// Remove one node, loading the scope's tree for validation.
    pub fn remove(&self, scope: &Scope, id: &str, cascade: bool) -> ApplicationResult<()> {
        let tree = self.tree(scope)?;
        self.remove_in(&tree, scope, id, cascade, &HashSet::new())
    }

    /// Remove `id` validated against an already loaded `tree`.
    ///
    /// Children listed in `batch` are being removed by the same operation
    /// and do not block the removal. With `cascade` all descendants are
    /// removed first, deepest first, except the subtrees of other `batch`
    /// members.
    #[instrument(level = "debug", skip(self, tree, batch))]
    pub fn remove_in(
        &self,
        tree: &TaxonomyTree,
        scope: &Scope,
        id: &str,
        cascade: bool,
        batch: &HashSet<String>,
    ) -> ApplicationResult<()> {
        if !tree.contains(id) {
            return Err(DomainError::NotFound(id.to_string()).into());
        }

        let targets: Vec<String> = if cascade {
            // batch members below `id` are removed on their own, subtrees included
            let mut owned_elsewhere: HashSet<&str> = HashSet::new();
            for other in batch.iter().filter(|b| b.as_str() != id && tree.contains(b.as_str())) {
                if tree.is_descendant(other, id)? {
                    owned_elsewhere.extend(
                        tree.subtree_post_order(other)?
                            .into_iter()
                            .map(|n| n.id.as_str()),
                    );
                }
            }
            tree.subtree_post_order(id)?
                .into_iter()
                .filter(|n| !owned_elsewhere.contains(n.id.as_str()))
                .map(|n| n.id.clone())
                .collect()
        } else {
            let blocking = tree
                .children(id)
                .iter()
                .filter(|c| !batch.contains(&c.id))
                .count();
            if blocking > 0 {
                return Err(DomainError::HasChildren {
                    id: id.to_string(),
                    children: blocking,
                }
                .into());
            }
            vec![id.to_string()]
        };

        if targets.len() > 1 {
            debug!("remove: cascading over {} node(s) below {}", targets.len() - 1, id);
        }
        let result = targets
            .iter()
            .try_for_each(|target| self.backend.delete_node(self.kind, target));
        self.invalidate(scope);
        result.map_err(ApplicationError::from)
    }

    /// Send one bulk-delete request; per-id failures come back in the response.
    pub fn bulk_delete(&self, scope: &Scope, ids: &[String]) -> ApplicationResult<BulkDeleteResponse> {
        debug!("bulk_delete: kind={} ids={}", self.kind, ids.len());
        let result = self.backend.bulk_delete(self.kind, ids);
        self.invalidate(scope);
        Ok(result?)
    }

    /// Aggregated member counts for the full tree of `scope`, cached until
    /// the next mutation.
    pub fn counts(&self, scope: &Scope) -> ApplicationResult<Arc<Counts>> {
        if let Some(cached) = self.cache().get(scope) {
            debug!("counts: cache hit for {}", scope);
            return Ok(Arc::clone(cached));
        }

        let nodes = self.list(scope, ListKind::All)?;
        let counts = Arc::new(self.aggregate(scope, &nodes)?);
        self.cache().insert(scope.clone(), Arc::clone(&counts));
        Ok(counts)
    }

    /// Aggregated counts over already loaded nodes.
    ///
    /// A parents-only listing lacks the individual nodes the members hang
    /// off, so the full tree is fetched first in that case.
    pub fn counts_for(&self, scope: &Scope, loaded: &[Node]) -> ApplicationResult<Counts> {
        if needs_full_tree(loaded) {
            debug!("counts_for: only groups loaded, fetching full tree");
            let nodes = self.list(scope, ListKind::All)?;
            return self.aggregate(scope, &nodes);
        }
        self.aggregate(scope, loaded)
    }

    fn aggregate(&self, scope: &Scope, nodes: &[Node]) -> ApplicationResult<Counts> {
        let members = self.leaf_members(scope)?;
        let counts = compute_counts(nodes, &members, &scope.abbreviation)?;
        if counts.unmatched() > 0 {
            warn!(
                "{} {} member(s) in {} match no node",
                counts.unmatched(),
                self.kind,
                scope
            );
        }
        Ok(counts)
    }

    pub fn invalidate(&self, scope: &Scope) {
        if self.cache().remove(scope).is_some() {
            debug!("invalidated counts for {}", scope);
        }
    }

    pub fn is_cached(&self, scope: &Scope) -> bool {
        self.cache().contains_key(scope)
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<Scope, Arc<Counts>>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_parent(tree: &TaxonomyTree, parent_id: &str) -> Result<(), DomainError> {
        match tree.get(parent_id) {
            Some(parent) if parent.is_group => Ok(()),
            Some(_) => Err(DomainError::InvalidParent(format!(
                "{parent_id} is not a group"
            ))),
            None => Err(DomainError::InvalidParent(format!(
                "{parent_id} does not exist"
            ))),
        }
    }
}
