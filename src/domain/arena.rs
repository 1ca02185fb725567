use generational_arena::{Arena, Index};
use std::fmt;
use tracing::instrument;

use crate::domain::entities::{NodeId, OrganizationNode, RoleType};

/// Data payload for tree nodes representing chart positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub id: NodeId,
    pub title: String,
    pub assignee_name: String,
    pub role_type: Option<RoleType>,
}

impl NodeData {
    fn from_node(node: &OrganizationNode) -> Self {
        Self {
            id: node.id.clone(),
            title: node.title.clone(),
            assignee_name: node.assignee_name.clone(),
            role_type: node.role_type,
        }
    }
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.id)
    }
}

/// Tree node in the arena-based chart structure.
#[derive(Debug)]
pub struct TreeNode {
    /// Position data for this node
    pub data: NodeData,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in display order
    pub children: Vec<Index>,
}

/// Arena-based tree structure holding the live chart.
///
/// Uses generational arena for memory-safe node references and O(1) lookups.
/// Parent links live here, not on the value-form `OrganizationNode`.
#[derive(Debug)]
pub struct TreeArena {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode>,
    /// Index of the root node, None for empty trees
    root: Option<Index>,
}

impl Default for TreeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeArena {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    /// Build an arena from a value tree; the tree is deep-copied.
    #[instrument(level = "trace", skip(tree))]
    pub fn from_tree(tree: &OrganizationNode) -> Self {
        let mut arena = Self::new();
        let mut stack = vec![(tree, None)];
        while let Some((node, parent)) = stack.pop() {
            let idx = arena.insert_node(NodeData::from_node(node), parent);
            // reversed so children are inserted left-to-right
            for child in node.children.iter().rev() {
                stack.push((child, Some(idx)));
            }
        }
        arena
    }

    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: NodeData, parent: Option<Index>) -> Index {
        let node = TreeNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn get_node_mut(&mut self, idx: Index) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    /// Distance from the root (root = 0).
    pub fn depth_of(&self, idx: Index) -> usize {
        let mut depth = 0;
        let mut current = self.get_node(idx).and_then(|n| n.parent);
        while let Some(p) = current {
            depth += 1;
            current = self.get_node(p).and_then(|n| n.parent);
        }
        depth
    }

    /// True if `node` is `ancestor` or lies below it.
    ///
    /// Walks parent links upward from `node`, so the cost is the depth of `node`.
    pub fn is_within(&self, ancestor: Index, node: Index) -> bool {
        let mut current = Some(node);
        while let Some(idx) = current {
            if idx == ancestor {
                return true;
            }
            current = self.get_node(idx).and_then(|n| n.parent);
        }
        false
    }

    /// Move `idx` (with its subtree) to the end of `new_parent`'s children.
    ///
    /// Both indices must be live and `new_parent` must not lie inside the
    /// subtree of `idx`; returns false without touching anything otherwise.
    #[instrument(level = "trace", skip(self))]
    pub fn reparent(&mut self, idx: Index, new_parent: Index) -> bool {
        let Some(old_parent) = self.get_node(idx).and_then(|n| n.parent) else {
            return false;
        };
        if !self.arena.contains(new_parent) || self.is_within(idx, new_parent) {
            return false;
        }

        if let Some(parent) = self.arena.get_mut(old_parent) {
            parent.children.retain(|&c| c != idx);
        }
        if let Some(parent) = self.arena.get_mut(new_parent) {
            parent.children.push(idx);
        }
        if let Some(node) = self.arena.get_mut(idx) {
            node.parent = Some(new_parent);
        }
        true
    }

    /// Remove the subtree rooted at `idx`; returns the removed ids in pre-order.
    #[instrument(level = "trace", skip(self))]
    pub fn remove_subtree(&mut self, idx: Index) -> Vec<NodeId> {
        let Some(node) = self.get_node(idx) else {
            return Vec::new();
        };
        if let Some(parent_idx) = node.parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.retain(|&c| c != idx);
            }
        } else {
            self.root = None;
        }

        let mut removed = Vec::new();
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.arena.remove(current) {
                removed.push(node.data.id);
                stack.extend(node.children.into_iter().rev());
            }
        }
        removed
    }

    /// Deep-copy the subtree at `idx` into its value form.
    pub fn to_tree(&self, idx: Index) -> Option<OrganizationNode> {
        let node = self.get_node(idx)?;
        let children = node
            .children
            .iter()
            .filter_map(|&child| self.to_tree(child))
            .collect();
        Some(OrganizationNode {
            id: node.data.id.clone(),
            title: node.data.title.clone(),
            assignee_name: node.data.assignee_name.clone(),
            role_type: node.data.role_type,
            children,
        })
    }
}

pub struct TreeIterator<'a> {
    arena: &'a TreeArena,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(arena: &'a TreeArena) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = arena.root() {
            stack.push(root);
        }
        Self { arena, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.arena.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> OrganizationNode {
        OrganizationNode::new("root", "Director").with_children(vec![
            OrganizationNode::new("a", "A").with_children(vec![
                OrganizationNode::new("a1", "A1"),
                OrganizationNode::new("a2", "A2"),
            ]),
            OrganizationNode::new("b", "B"),
        ])
    }

    fn find(arena: &TreeArena, id: &str) -> Index {
        arena
            .iter()
            .find(|(_, n)| n.data.id.as_str() == id)
            .map(|(idx, _)| idx)
            .unwrap()
    }

    #[test]
    fn given_value_tree_when_round_tripped_then_identical() {
        let tree = sample();
        let arena = TreeArena::from_tree(&tree);
        assert_eq!(arena.len(), 5);
        assert_eq!(arena.to_tree(arena.root().unwrap()).unwrap(), tree);
    }

    #[test]
    fn given_arena_when_iterating_then_preorder() {
        let arena = TreeArena::from_tree(&sample());
        let pre: Vec<_> = arena.iter().map(|(_, n)| n.data.id.to_string()).collect();
        assert_eq!(pre, vec!["root", "a", "a1", "a2", "b"]);
    }

    #[test]
    fn given_descendant_target_when_reparenting_then_refused() {
        let mut arena = TreeArena::from_tree(&sample());
        let a = find(&arena, "a");
        let a1 = find(&arena, "a1");
        assert!(!arena.reparent(a, a1));
        assert!(!arena.reparent(a, a));
        assert_eq!(arena.to_tree(arena.root().unwrap()).unwrap(), sample());
    }

    #[test]
    fn given_subtree_when_reparenting_then_appended_to_new_parent() {
        let mut arena = TreeArena::from_tree(&sample());
        let a = find(&arena, "a");
        let b = find(&arena, "b");
        assert!(arena.reparent(a, b));
        assert_eq!(arena.depth_of(find(&arena, "a2")), 3);
        assert!(arena.get_node(b).unwrap().children.contains(&a));
    }

    #[test]
    fn given_subtree_when_removed_then_all_descendants_gone() {
        let mut arena = TreeArena::from_tree(&sample());
        let a = find(&arena, "a");
        let removed = arena.remove_subtree(a);
        let removed: Vec<_> = removed.iter().map(|i| i.to_string()).collect();
        assert_eq!(removed, vec!["a", "a1", "a2"]);
        assert_eq!(arena.len(), 2);
    }
}
