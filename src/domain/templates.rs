//! Preset command structures
//!
//! Built-in templates mirror the standard EOC layouts. A catalog keeps
//! insertion order so listings show the presets as they were registered.

use std::collections::HashSet;

use crate::domain::entities::{OrganizationNode, RoleType, ROOT_ID};
use crate::domain::error::{DomainError, DomainResult};

/// Name of the canonical default structure.
pub const DEFAULT_TEMPLATE: &str = "General";

fn position(id: &str, title: &str) -> OrganizationNode {
    OrganizationNode::new(id, title)
}

fn section(id: &str, title: &str) -> OrganizationNode {
    OrganizationNode::new(id, title).with_role(RoleType::Section)
}

fn director() -> OrganizationNode {
    OrganizationNode::new(ROOT_ID, "EOC Director").with_role(RoleType::Director)
}

/// The default chart: command staff plus the four general staff sections.
pub fn general() -> OrganizationNode {
    director().with_children(vec![
        position("info", "Information Officer"),
        position("liaison", "Liaison Officer"),
        position("safety", "Safety Officer"),
        section("ops", "Operations Chief").with_children(vec![OrganizationNode::new(
            "ops-b1",
            "Branch I Director",
        )
        .with_role(RoleType::Branch)]),
        section("plan", "Planning Chief"),
        section("log", "Logistics Chief"),
        section("fin", "Finance Chief"),
    ])
}

pub fn wildfire() -> OrganizationNode {
    director().with_children(vec![
        position("info", "Information Officer"),
        position("liaison", "Liaison Officer"),
        section("ops", "Operations Chief").with_children(vec![
            OrganizationNode::new("fire-branch", "Fire Branch").with_role(RoleType::Branch),
            OrganizationNode::new("air-ops", "Air Ops Branch").with_role(RoleType::Branch),
            OrganizationNode::new("staging", "Staging Area").with_role(RoleType::Group),
        ]),
        section("plan", "Planning Chief").with_children(vec![
            OrganizationNode::new("res-unit", "Resource Unit").with_role(RoleType::Unit),
            OrganizationNode::new("sit-unit", "Situation Unit").with_role(RoleType::Unit),
        ]),
        section("log", "Logistics Chief"),
        section("fin", "Finance Chief"),
    ])
}

pub fn flood() -> OrganizationNode {
    director().with_children(vec![
        position("info", "Information Officer"),
        section("ops", "Operations Chief").with_children(vec![
            OrganizationNode::new("sandbag", "Sandbag Group").with_role(RoleType::Group),
            OrganizationNode::new("dike", "Dike Patrol").with_role(RoleType::Group),
            OrganizationNode::new("evac", "Evacuation Branch").with_role(RoleType::Branch),
        ]),
        section("log", "Logistics Chief").with_children(vec![
            OrganizationNode::new("supply", "Supply Unit").with_role(RoleType::Unit),
            OrganizationNode::new("transport", "Ground Support").with_role(RoleType::Unit),
        ]),
        section("fin", "Finance Chief"),
    ])
}

/// Check that a tree can replace the live chart.
///
/// The root must carry the fixed root id, and every id must be non-empty
/// and unique across the tree.
pub fn validate_template(name: &str, tree: &OrganizationNode) -> DomainResult<()> {
    let invalid = |reason: String| DomainError::InvalidTemplate {
        name: name.to_string(),
        reason,
    };
    if tree.id.as_str() != ROOT_ID {
        return Err(invalid(format!(
            "root id must be '{}', found '{}'",
            ROOT_ID, tree.id
        )));
    }
    let mut seen = HashSet::new();
    for id in tree.ids() {
        if id.as_str().trim().is_empty() {
            return Err(invalid("empty node id".to_string()));
        }
        if !seen.insert(id.clone()) {
            return Err(invalid(format!("duplicate node id '{}'", id)));
        }
    }
    Ok(())
}

/// Named mapping from preset name to a full tree.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    entries: Vec<(String, OrganizationNode)>,
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TemplateCatalog {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        catalog.insert(DEFAULT_TEMPLATE, general());
        catalog.insert("Wildfire", wildfire());
        catalog.insert("Flood", flood());
        catalog
    }

    /// Add or replace a template (names compare case-insensitively).
    pub fn insert(&mut self, name: impl Into<String>, tree: OrganizationNode) {
        let name = name.into();
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            *slot = (name, tree);
        } else {
            self.entries.push((name, tree));
        }
    }

    pub fn get(&self, name: &str) -> DomainResult<&OrganizationNode> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, tree)| tree)
            .ok_or_else(|| DomainError::UnknownTemplate(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
