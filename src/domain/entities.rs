//! Domain entities: chart nodes, identifiers and role types

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::DomainError;

/// Fixed identifier of the chart root.
pub const ROOT_ID: &str = "root";

/// Title given to freshly added positions.
pub const DEFAULT_TITLE: &str = "New Position";

/// Length of generated node identifiers.
const GENERATED_ID_LEN: usize = 9;

/// Opaque, stable node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn root() -> Self {
        Self(ROOT_ID.to_string())
    }

    /// Draw a fresh random identifier (9 lowercase alphanumerics).
    ///
    /// Uniqueness against the live tree is enforced by the repository.
    pub fn generate() -> Self {
        let raw = Uuid::new_v4().simple().to_string();
        Self(raw[..GENERATED_ID_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// ICS role classification of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleType {
    Director,
    Section,
    Branch,
    Unit,
    Division,
    Group,
    #[serde(rename = "Strike Team")]
    StrikeTeam,
    #[serde(rename = "Task Force")]
    TaskForce,
}

impl RoleType {
    pub const ALL: [RoleType; 8] = [
        RoleType::Director,
        RoleType::Section,
        RoleType::Branch,
        RoleType::Unit,
        RoleType::Division,
        RoleType::Group,
        RoleType::StrikeTeam,
        RoleType::TaskForce,
    ];

    /// Role assumed for a node without an explicit type.
    pub fn default_for_depth(depth: usize) -> Self {
        match depth {
            0 => RoleType::Director,
            1 => RoleType::Section,
            2 => RoleType::Branch,
            _ => RoleType::Unit,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RoleType::Director => "Director",
            RoleType::Section => "Section",
            RoleType::Branch => "Branch",
            RoleType::Unit => "Unit",
            RoleType::Division => "Division",
            RoleType::Group => "Group",
            RoleType::StrikeTeam => "Strike Team",
            RoleType::TaskForce => "Task Force",
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RoleType {
    type Err = DomainError;

    /// Case-insensitive; spaces, dashes and underscores are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        RoleType::ALL
            .iter()
            .copied()
            .find(|role| role.label().replace(' ', "").to_lowercase() == wanted)
            .ok_or_else(|| DomainError::UnknownRoleType(s.to_string()))
    }
}

/// A position in the command structure, owning its subordinates.
///
/// This is the value form of the tree: templates, snapshots and
/// serialized charts use it. The live chart is held by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationNode {
    pub id: NodeId,
    pub title: String,
    /// Person filling the role; empty means unassigned
    #[serde(default, rename = "assignee")]
    pub assignee_name: String,
    #[serde(default, rename = "role", skip_serializing_if = "Option::is_none")]
    pub role_type: Option<RoleType>,
    #[serde(default)]
    pub children: Vec<OrganizationNode>,
}

impl OrganizationNode {
    pub fn new(id: impl Into<NodeId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            assignee_name: String::new(),
            role_type: None,
            children: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: RoleType) -> Self {
        self.role_type = Some(role);
        self
    }

    pub fn with_assignee(mut self, name: impl Into<String>) -> Self {
        self.assignee_name = name.into();
        self
    }

    pub fn with_children(mut self, children: Vec<OrganizationNode>) -> Self {
        self.children = children;
        self
    }

    /// Explicit role, or the depth default when unset.
    pub fn effective_role(&self, depth: usize) -> RoleType {
        self.role_type
            .unwrap_or_else(|| RoleType::default_for_depth(depth))
    }

    /// Depth-first search for `id` within this subtree.
    pub fn find(&self, id: &str) -> Option<&OrganizationNode> {
        if self.id.as_str() == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    /// Number of nodes in this subtree, including self.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(|c| c.count()).sum::<usize>()
    }

    /// All ids of this subtree in pre-order.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.count());
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node.id.clone());
            for child in node.children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn is_unassigned(&self) -> bool {
        self.assignee_name.trim().is_empty()
    }
}

/// Editable node attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeField {
    Title,
    Assignee,
    Role,
}

impl FromStr for NodeField {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title" => Ok(NodeField::Title),
            "name" | "assignee" => Ok(NodeField::Assignee),
            "role" | "type" | "icstype" => Ok(NodeField::Role),
            _ => Err(DomainError::UnknownField(s.to_string())),
        }
    }
}

/// A non-structural change to one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeUpdate {
    Title(String),
    Assignee(String),
    Role(RoleType),
}

impl NodeUpdate {
    /// Build an update from a field and its textual value.
    pub fn parse(field: NodeField, value: &str) -> Result<Self, DomainError> {
        Ok(match field {
            NodeField::Title => NodeUpdate::Title(value.to_string()),
            NodeField::Assignee => NodeUpdate::Assignee(value.to_string()),
            NodeField::Role => NodeUpdate::Role(value.parse()?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_generated_ids_when_drawn_then_short_and_alphanumeric() {
        let id = NodeId::generate();
        assert_eq!(id.as_str().len(), 9);
        assert!(id.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!id.is_root());
    }

    #[test]
    fn given_role_spellings_when_parsing_then_accepts_variants() {
        assert_eq!("strike team".parse::<RoleType>().unwrap(), RoleType::StrikeTeam);
        assert_eq!("Task-Force".parse::<RoleType>().unwrap(), RoleType::TaskForce);
        assert_eq!("SECTION".parse::<RoleType>().unwrap(), RoleType::Section);
        assert!("captain".parse::<RoleType>().is_err());
    }

    #[test]
    fn given_depths_when_defaulting_role_then_follows_tiers() {
        assert_eq!(RoleType::default_for_depth(0), RoleType::Director);
        assert_eq!(RoleType::default_for_depth(1), RoleType::Section);
        assert_eq!(RoleType::default_for_depth(2), RoleType::Branch);
        assert_eq!(RoleType::default_for_depth(7), RoleType::Unit);
    }

    #[test]
    fn given_nested_node_when_listing_ids_then_preorder() {
        let tree = OrganizationNode::new("a", "A").with_children(vec![
            OrganizationNode::new("b", "B")
                .with_children(vec![OrganizationNode::new("c", "C")]),
            OrganizationNode::new("d", "D"),
        ]);
        let ids: Vec<String> = tree.ids().iter().map(|i| i.to_string()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
        assert_eq!(tree.count(), 4);
        assert_eq!(tree.find("c").map(|n| n.title.as_str()), Some("C"));
    }

    #[test]
    fn given_field_and_value_when_parsing_update_then_typed() {
        let update = NodeUpdate::parse(NodeField::Role, "group").unwrap();
        assert_eq!(update, NodeUpdate::Role(RoleType::Group));
        assert!("colour".parse::<NodeField>().is_err());
    }
}
