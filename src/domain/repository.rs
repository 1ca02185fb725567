//! Node repository: the single owner of the live chart tree.
//!
//! Every mutation validates first and then applies in one step, so a
//! returned error always leaves the tree exactly as it was. Successful
//! mutations bump `version()`, which the view layer uses as its change signal.

use std::collections::{HashMap, HashSet};

use generational_arena::Index;
use tracing::{debug, instrument};

use crate::domain::arena::{NodeData, TreeArena, TreeNode};
use crate::domain::entities::{NodeId, NodeUpdate, OrganizationNode, RoleType, DEFAULT_TITLE, ROOT_ID};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::templates::{self, validate_template, DEFAULT_TEMPLATE};

/// Result of a reparent request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// Source and target were the same node
    Unchanged,
}

/// Owner of the chart tree.
#[derive(Debug)]
pub struct NodeRepository {
    tree: TreeArena,
    index: HashMap<NodeId, Index>,
    /// Every id ever present in this repository; generated ids avoid all of them
    issued: HashSet<NodeId>,
    version: u64,
}

impl Default for NodeRepository {
    fn default() -> Self {
        Self::with_tree(templates::general())
    }
}

impl NodeRepository {
    /// Repository holding the canonical default structure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository holding a deep copy of `tree`, validated like a template.
    pub fn from_tree(tree: &OrganizationNode) -> DomainResult<Self> {
        validate_template("initial", tree)?;
        Ok(Self::with_tree(tree.clone()))
    }

    fn with_tree(tree: OrganizationNode) -> Self {
        let arena = TreeArena::from_tree(&tree);
        let index = Self::build_index(&arena);
        let issued = index.keys().cloned().collect();
        Self {
            tree: arena,
            index,
            issued,
            version: 0,
        }
    }

    fn build_index(arena: &TreeArena) -> HashMap<NodeId, Index> {
        arena
            .iter()
            .map(|(idx, node)| (node.data.id.clone(), idx))
            .collect()
    }

    /// Change counter; increases with every applied mutation.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// The root position. Construction, `delete` and `load_template` all
    /// keep it in place, so this is only None for a broken arena.
    pub fn root(&self) -> Option<NodeRef<'_>> {
        self.tree
            .root()
            .and_then(|idx| NodeRef::resolve(self, idx))
    }

    /// Look up a node; the handle is read-only.
    pub fn find(&self, id: &str) -> Option<NodeRef<'_>> {
        self.index
            .get(id)
            .and_then(|&idx| NodeRef::resolve(self, idx))
    }

    pub fn parent(&self, id: &str) -> Option<NodeRef<'_>> {
        self.find(id).and_then(|n| n.parent())
    }

    /// Distance from the root, None for unknown ids.
    pub fn depth(&self, id: &str) -> Option<usize> {
        self.index.get(id).map(|&idx| self.tree.depth_of(idx))
    }

    /// True if `node` is `ancestor` itself or one of its descendants.
    pub fn is_in_subtree(&self, ancestor: &str, node: &str) -> bool {
        match (self.index.get(ancestor), self.index.get(node)) {
            (Some(&a), Some(&n)) => self.tree.is_within(a, n),
            _ => false,
        }
    }

    /// Explicit role or the depth default.
    pub fn effective_role(&self, id: &str) -> Option<RoleType> {
        self.find(id).map(|n| n.effective_role())
    }

    /// Ids in pre-order.
    pub fn ids(&self) -> Vec<NodeId> {
        self.tree.iter().map(|(_, n)| n.data.id.clone()).collect()
    }

    /// Deep, alias-free copy of the whole chart.
    pub fn snapshot(&self) -> OrganizationNode {
        self.tree
            .root()
            .and_then(|idx| self.tree.to_tree(idx))
            .unwrap_or_else(|| OrganizationNode::new(ROOT_ID, ""))
    }

    fn index_of(&self, id: &str) -> DomainResult<Index> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| DomainError::NotFound(NodeId::from(id)))
    }

    fn touch(&mut self) {
        self.version += 1;
    }

    fn fresh_id(&mut self) -> NodeId {
        loop {
            let id = NodeId::generate();
            if !self.issued.contains(&id) {
                self.issued.insert(id.clone());
                return id;
            }
        }
    }

    /// Set one field of a node. Structure is untouched.
    #[instrument(level = "debug", skip(self))]
    pub fn update(&mut self, id: &str, update: NodeUpdate) -> DomainResult<()> {
        let idx = self.index_of(id)?;
        let node = self
            .tree
            .get_node_mut(idx)
            .ok_or_else(|| DomainError::NotFound(NodeId::from(id)))?;
        match update {
            NodeUpdate::Title(title) => node.data.title = title,
            NodeUpdate::Assignee(name) => node.data.assignee_name = name,
            NodeUpdate::Role(role) => node.data.role_type = Some(role),
        }
        self.touch();
        Ok(())
    }

    /// Append a new default position under `parent_id`; returns its id.
    #[instrument(level = "debug", skip(self))]
    pub fn add_child(&mut self, parent_id: &str) -> DomainResult<NodeId> {
        let parent = self.index_of(parent_id)?;
        let id = self.fresh_id();
        let data = NodeData {
            id: id.clone(),
            title: DEFAULT_TITLE.to_string(),
            assignee_name: String::new(),
            role_type: None,
        };
        let idx = self.tree.insert_node(data, Some(parent));
        self.index.insert(id.clone(), idx);
        self.touch();
        debug!("add_child: {} under {}", id, parent_id);
        Ok(id)
    }

    /// Add a peer of `id`: a new child appended to `id`'s parent.
    #[instrument(level = "debug", skip(self))]
    pub fn add_sibling(&mut self, id: &str) -> DomainResult<NodeId> {
        let parent_id = self
            .find(id)
            .ok_or_else(|| DomainError::NotFound(NodeId::from(id)))?
            .parent()
            .map(|p| p.id().clone())
            .ok_or_else(|| DomainError::NoParent(NodeId::from(id)))?;
        self.add_child(parent_id.as_str())
    }

    /// Remove the subtree rooted at `id`; returns the removed ids.
    ///
    /// Callers are expected to have confirmed the deletion already.
    #[instrument(level = "debug", skip(self))]
    pub fn delete(&mut self, id: &str) -> DomainResult<Vec<NodeId>> {
        if id == ROOT_ID {
            return Err(DomainError::RootImmutable { action: "deleted" });
        }
        let idx = self.index_of(id)?;
        let removed = self.tree.remove_subtree(idx);
        for removed_id in &removed {
            self.index.remove(removed_id);
        }
        self.touch();
        debug!("delete: removed {} positions under {}", removed.len(), id);
        Ok(removed)
    }

    /// Reparent the subtree at `source_id` as the last child of `target_id`.
    ///
    /// Checked in order: same node (no-op), root source, unknown ids,
    /// target inside the source subtree. All checks run against the
    /// unmodified tree; the detach and attach happen together.
    #[instrument(level = "debug", skip(self))]
    pub fn move_node(&mut self, source_id: &str, target_id: &str) -> DomainResult<MoveOutcome> {
        if source_id == target_id {
            return Ok(MoveOutcome::Unchanged);
        }
        if source_id == ROOT_ID {
            return Err(DomainError::RootImmutable { action: "moved" });
        }
        let source = self.index_of(source_id)?;
        let target = self.index_of(target_id)?;
        if self.tree.is_within(source, target) {
            return Err(DomainError::CycleRejected {
                node: NodeId::from(source_id),
                target: NodeId::from(target_id),
            });
        }
        if !self.tree.reparent(source, target) {
            return Err(DomainError::NotFound(NodeId::from(source_id)));
        }
        self.touch();
        debug!("move_node: {} -> {}", source_id, target_id);
        Ok(MoveOutcome::Moved)
    }

    /// Replace the whole chart with a deep copy of `template`.
    #[instrument(level = "debug", skip(self, template))]
    pub fn load_template(&mut self, name: &str, template: &OrganizationNode) -> DomainResult<()> {
        validate_template(name, template)?;
        let arena = TreeArena::from_tree(template);
        let index = Self::build_index(&arena);
        self.issued.extend(index.keys().cloned());
        self.tree = arena;
        self.index = index;
        self.touch();
        debug!("load_template: {} ({} positions)", name, self.len());
        Ok(())
    }

    /// Restore the canonical default structure.
    pub fn reset(&mut self) -> DomainResult<()> {
        self.load_template(DEFAULT_TEMPLATE, &templates::general())
    }

    /// Verify the structural invariants; used by tests and debug checks.
    pub fn check_invariants(&self) -> DomainResult<()> {
        let broken = |reason: String| DomainError::InvalidTemplate {
            name: "live chart".to_string(),
            reason,
        };
        let root = self
            .tree
            .root()
            .ok_or_else(|| broken("missing root".to_string()))?;
        let root_node = self
            .tree
            .get_node(root)
            .ok_or_else(|| broken("dangling root".to_string()))?;
        if root_node.data.id.as_str() != ROOT_ID || root_node.parent.is_some() {
            return Err(broken("root identity changed".to_string()));
        }

        let mut seen = HashSet::new();
        for (idx, node) in self.tree.iter() {
            if !seen.insert(node.data.id.clone()) {
                return Err(broken(format!("duplicate id '{}'", node.data.id)));
            }
            if self.index.get(&node.data.id) != Some(&idx) {
                return Err(broken(format!("index out of sync for '{}'", node.data.id)));
            }
            for &child in &node.children {
                let parent_ok = self
                    .tree
                    .get_node(child)
                    .is_some_and(|c| c.parent == Some(idx));
                if !parent_ok {
                    return Err(broken(format!("bad parent link under '{}'", node.data.id)));
                }
            }
        }
        // every stored node must be reachable from the root
        if seen.len() != self.tree.len() || seen.len() != self.index.len() {
            return Err(broken("unreachable nodes".to_string()));
        }
        Ok(())
    }
}

/// Read-only handle to a node inside the repository.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    repo: &'a NodeRepository,
    idx: Index,
    node: &'a TreeNode,
}

impl<'a> NodeRef<'a> {
    fn resolve(repo: &'a NodeRepository, idx: Index) -> Option<Self> {
        let node = repo.tree.get_node(idx)?;
        Some(Self { repo, idx, node })
    }

    pub fn id(&self) -> &'a NodeId {
        &self.node.data.id
    }

    pub fn title(&self) -> &'a str {
        &self.node.data.title
    }

    pub fn assignee_name(&self) -> &'a str {
        &self.node.data.assignee_name
    }

    pub fn role_type(&self) -> Option<RoleType> {
        self.node.data.role_type
    }

    pub fn depth(&self) -> usize {
        self.repo.tree.depth_of(self.idx)
    }

    pub fn effective_role(&self) -> RoleType {
        self.node
            .data
            .role_type
            .unwrap_or_else(|| RoleType::default_for_depth(self.depth()))
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.node.parent.and_then(|p| NodeRef::resolve(self.repo, p))
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let repo = self.repo;
        self.node
            .children
            .iter()
            .filter_map(move |&c| NodeRef::resolve(repo, c))
    }

    pub fn child_count(&self) -> usize {
        self.node.children.len()
    }

    /// Owned deep copy of this subtree.
    pub fn to_tree(&self) -> OrganizationNode {
        self.repo
            .tree
            .to_tree(self.idx)
            .unwrap_or_else(|| OrganizationNode::new(self.id().clone(), self.title()))
    }
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", self.id())
            .field("title", &self.title())
            .finish()
    }
}
