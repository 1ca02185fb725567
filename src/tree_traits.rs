//! Text outline of a chart, rendered with `termtree`.

use termtree::Tree;
use tracing::instrument;

use crate::domain::{CollapseState, OrganizationNode};

pub trait ChartOutline {
    /// Indented tree of positions; collapsed nodes hide their subordinates.
    fn to_outline(&self, collapse: &CollapseState) -> Tree<String>;
}

fn label(node: &OrganizationNode, depth: usize) -> String {
    let assignee = if node.is_unassigned() {
        "unassigned"
    } else {
        node.assignee_name.as_str()
    };
    format!(
        "{} [{}] - {} ({})",
        node.title,
        node.effective_role(depth),
        assignee,
        node.id
    )
}

fn build(node: &OrganizationNode, depth: usize, collapse: &CollapseState) -> Tree<String> {
    if collapse.is_collapsed(node.id.as_str()) && !node.children.is_empty() {
        let hidden = node.count() - 1;
        return Tree::new(format!("{} (+{} hidden)", label(node, depth), hidden));
    }
    let leaves: Vec<_> = node
        .children
        .iter()
        .map(|c| build(c, depth + 1, collapse))
        .collect();
    Tree::new(label(node, depth)).with_leaves(leaves)
}

impl ChartOutline for OrganizationNode {
    #[instrument(level = "debug", skip_all)]
    fn to_outline(&self, collapse: &CollapseState) -> Tree<String> {
        build(self, 0, collapse)
    }
}
