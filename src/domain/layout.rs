//! Layout engine: centered recursive tree layout with orthogonal connectors.
//!
//! `LayoutEngine::compute` is a pure function of (tree, collapse state):
//! the same input always produces the same geometry. Collapsed nodes are
//! laid out as leaves and their descendants are left out entirely.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::entities::{NodeId, OrganizationNode, RoleType};

/// Fixed geometry of the chart, in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width of every node box; also the width of a leaf subtree
    pub node_width: f32,
    pub node_height: f32,
    /// Horizontal space between neighbouring sibling subtrees
    pub sibling_gap: f32,
    /// Vertical space between a parent box and its children's boxes
    pub level_gap: f32,
    /// Length of the parent's stem above the horizontal bus
    pub stem_length: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 256.0,
            node_height: 96.0,
            sibling_gap: 24.0,
            level_gap: 56.0,
            stem_length: 32.0,
        }
    }
}

/// Visual tier, determined by depth alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleTier {
    Command,
    Chief,
    Branch,
    Unit,
}

/// Colours of one tier as RGB triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierStyle {
    pub fill: [u8; 3],
    pub border: [u8; 3],
    pub accent: [u8; 3],
    pub text: [u8; 3],
    pub muted_text: [u8; 3],
}

impl StyleTier {
    pub fn from_depth(depth: usize) -> Self {
        match depth {
            0 => StyleTier::Command,
            1 => StyleTier::Chief,
            2 => StyleTier::Branch,
            _ => StyleTier::Unit,
        }
    }

    pub fn style(&self) -> TierStyle {
        const WHITE: [u8; 3] = [255, 255, 255];
        const NAVY: [u8; 3] = [27, 37, 89];
        const GREY: [u8; 3] = [112, 126, 174];
        match self {
            StyleTier::Command => TierStyle {
                fill: [17, 28, 68],
                border: NAVY,
                accent: NAVY,
                text: WHITE,
                muted_text: [203, 213, 225],
            },
            StyleTier::Chief => TierStyle {
                fill: WHITE,
                border: [226, 232, 240],
                accent: [67, 24, 255],
                text: NAVY,
                muted_text: GREY,
            },
            StyleTier::Branch => TierStyle {
                fill: WHITE,
                border: [226, 232, 240],
                accent: [251, 146, 60],
                text: NAVY,
                muted_text: GREY,
            },
            StyleTier::Unit => TierStyle {
                fill: WHITE,
                border: [229, 231, 235],
                accent: [229, 231, 235],
                text: NAVY,
                muted_text: GREY,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// A visible node with its box.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedNode {
    pub id: NodeId,
    pub depth: usize,
    pub tier: StyleTier,
    pub rect: Rect,
    pub role: RoleType,
    pub title: String,
    pub assignee_name: String,
    /// Children in the tree, visible or not
    pub child_count: usize,
    pub collapsed: bool,
}

/// An axis-aligned connector piece.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

impl Segment {
    pub fn is_vertical(&self) -> bool {
        self.from.x == self.to.x
    }

    pub fn is_horizontal(&self) -> bool {
        self.from.y == self.to.y
    }
}

/// Complete renderable geometry of a chart.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChartLayout {
    /// Visible nodes in pre-order
    pub nodes: Vec<PlacedNode>,
    pub connectors: Vec<Segment>,
    /// Smallest rectangle containing every node, anchored at the origin
    pub bounds: Rect,
}

impl ChartLayout {
    pub fn node(&self, id: &str) -> Option<&PlacedNode> {
        self.nodes.iter().find(|n| n.id.as_str() == id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() || self.bounds.is_empty()
    }
}

/// Per-node collapse flags; view state only, never part of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseState {
    collapsed: BTreeSet<NodeId>,
}

impl CollapseState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.contains(id)
    }

    /// Flip a node's flag; returns the new collapsed state.
    pub fn toggle(&mut self, id: &NodeId) -> bool {
        if !self.collapsed.remove(id.as_str()) {
            self.collapsed.insert(id.clone());
            true
        } else {
            false
        }
    }

    pub fn collapse(&mut self, id: &NodeId) -> bool {
        self.collapsed.insert(id.clone())
    }

    pub fn expand(&mut self, id: &str) -> bool {
        self.collapsed.remove(id)
    }

    /// Drop flags for ids that no longer exist.
    pub fn retain(&mut self, mut keep: impl FnMut(&NodeId) -> bool) {
        self.collapsed.retain(|id| keep(id));
    }

    pub fn clear(&mut self) {
        self.collapsed.clear();
    }

    pub fn len(&self) -> usize {
        self.collapsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collapsed.is_empty()
    }
}

/// Subtree widths computed bottom-up, mirroring the visible tree shape.
struct Measured {
    width: f32,
    children: Vec<Measured>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutEngine {
    config: LayoutConfig,
}

impl LayoutEngine {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    fn shows_children(node: &OrganizationNode, collapse: &CollapseState) -> bool {
        !node.children.is_empty() && !collapse.is_collapsed(node.id.as_str())
    }

    /// Width occupied by `node`'s visible subtree.
    pub fn subtree_width(&self, node: &OrganizationNode, collapse: &CollapseState) -> f32 {
        self.measure(node, collapse).width
    }

    fn measure(&self, node: &OrganizationNode, collapse: &CollapseState) -> Measured {
        if !Self::shows_children(node, collapse) {
            return Measured {
                width: self.config.node_width,
                children: Vec::new(),
            };
        }
        let children: Vec<Measured> = node
            .children
            .iter()
            .map(|c| self.measure(c, collapse))
            .collect();
        let gaps = self.config.sibling_gap * (children.len() - 1) as f32;
        let width = children.iter().map(|m| m.width).sum::<f32>() + gaps;
        Measured { width, children }
    }

    fn level_y(&self, depth: usize) -> f32 {
        depth as f32 * (self.config.node_height + self.config.level_gap)
    }

    pub fn compute(&self, root: &OrganizationNode, collapse: &CollapseState) -> ChartLayout {
        let measured = self.measure(root, collapse);
        let mut layout = ChartLayout::default();
        let mut max_depth = 0;
        self.place(
            root,
            &measured,
            collapse,
            0,
            0.0,
            &mut layout,
            &mut max_depth,
        );
        layout.bounds = Rect::new(
            0.0,
            0.0,
            measured.width,
            self.level_y(max_depth) + self.config.node_height,
        );
        layout
    }

    #[allow(clippy::too_many_arguments)]
    fn place(
        &self,
        node: &OrganizationNode,
        measured: &Measured,
        collapse: &CollapseState,
        depth: usize,
        left: f32,
        out: &mut ChartLayout,
        max_depth: &mut usize,
    ) {
        *max_depth = (*max_depth).max(depth);
        let center = left + measured.width / 2.0;
        let rect = Rect::new(
            center - self.config.node_width / 2.0,
            self.level_y(depth),
            self.config.node_width,
            self.config.node_height,
        );
        out.nodes.push(PlacedNode {
            id: node.id.clone(),
            depth,
            tier: StyleTier::from_depth(depth),
            rect,
            role: node.effective_role(depth),
            title: node.title.clone(),
            assignee_name: node.assignee_name.clone(),
            child_count: node.children.len(),
            collapsed: collapse.is_collapsed(node.id.as_str()),
        });

        if !Self::shows_children(node, collapse) {
            return;
        }

        let mut child_left = left;
        let mut anchors = Vec::with_capacity(node.children.len());
        for (child, child_measured) in node.children.iter().zip(&measured.children) {
            self.place(
                child,
                child_measured,
                collapse,
                depth + 1,
                child_left,
                out,
                max_depth,
            );
            anchors.push(child_left + child_measured.width / 2.0);
            child_left += child_measured.width + self.config.sibling_gap;
        }

        let parent_bottom = rect.bottom();
        let child_top = self.level_y(depth + 1);
        match anchors.as_slice() {
            [only] => out.connectors.push(Segment {
                from: Point::new(center, parent_bottom),
                to: Point::new(*only, child_top),
            }),
            [first, .., last] => {
                let bus_y = parent_bottom + self.config.stem_length.min(self.config.level_gap);
                out.connectors.push(Segment {
                    from: Point::new(center, parent_bottom),
                    to: Point::new(center, bus_y),
                });
                out.connectors.push(Segment {
                    from: Point::new(*first, bus_y),
                    to: Point::new(*last, bus_y),
                });
                for &x in &anchors {
                    out.connectors.push(Segment {
                        from: Point::new(x, bus_y),
                        to: Point::new(x, child_top),
                    });
                }
            }
            [] => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(node_width: f32, sibling_gap: f32) -> LayoutEngine {
        LayoutEngine::new(LayoutConfig {
            node_width,
            sibling_gap,
            ..LayoutConfig::default()
        })
    }

    fn pair() -> OrganizationNode {
        OrganizationNode::new("root", "R").with_children(vec![
            OrganizationNode::new("a", "A"),
            OrganizationNode::new("b", "B"),
        ])
    }

    #[test]
    fn given_two_leaf_children_when_measured_then_width_is_sum_plus_gap() {
        let engine = engine(10.0, 4.0);
        let collapse = CollapseState::new();
        assert_eq!(engine.subtree_width(&pair(), &collapse), 24.0);
    }

    #[test]
    fn given_collapsed_parent_when_measured_then_leaf_width() {
        let engine = engine(10.0, 4.0);
        let mut collapse = CollapseState::new();
        collapse.collapse(&NodeId::root());
        assert_eq!(engine.subtree_width(&pair(), &collapse), 10.0);
        let layout = engine.compute(&pair(), &collapse);
        assert_eq!(layout.nodes.len(), 1);
        assert!(layout.connectors.is_empty());
        assert!(layout.nodes[0].collapsed);
    }

    #[test]
    fn given_single_child_when_laid_out_then_one_vertical_connector() {
        let tree = OrganizationNode::new("root", "R")
            .with_children(vec![OrganizationNode::new("a", "A")]);
        let layout = LayoutEngine::default().compute(&tree, &CollapseState::new());
        assert_eq!(layout.connectors.len(), 1);
        assert!(layout.connectors[0].is_vertical());
        assert_eq!(layout.nodes[0].rect.x, layout.nodes[1].rect.x);
    }

    #[test]
    fn given_two_children_when_laid_out_then_stem_bus_and_drops() {
        let layout = engine(10.0, 4.0).compute(&pair(), &CollapseState::new());
        assert_eq!(layout.connectors.len(), 4);
        let bus = layout.connectors[1];
        assert!(bus.is_horizontal());
        assert_eq!(bus.from.x, 5.0);
        assert_eq!(bus.to.x, 19.0);
        // parent centered over the children's span
        assert_eq!(layout.nodes[0].rect.center_x(), 12.0);
    }

    #[test]
    fn given_depths_when_laid_out_then_tiers_follow_depth() {
        let layout = LayoutEngine::default().compute(
            &crate::domain::templates::general(),
            &CollapseState::new(),
        );
        assert_eq!(layout.node("root").unwrap().tier, StyleTier::Command);
        assert_eq!(layout.node("ops").unwrap().tier, StyleTier::Chief);
        assert_eq!(layout.node("ops-b1").unwrap().tier, StyleTier::Branch);
        assert_eq!(layout.node("info").unwrap().role, RoleType::Section);
    }

    #[test]
    fn given_collapse_toggle_when_flipped_twice_then_expanded() {
        let mut collapse = CollapseState::new();
        let id = NodeId::from("ops");
        assert!(collapse.toggle(&id));
        assert!(collapse.is_collapsed("ops"));
        assert!(!collapse.toggle(&id));
        assert!(collapse.is_empty());
    }
}
