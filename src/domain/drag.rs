//! Drag-and-drop reparenting gesture.
//!
//! The controller only tracks which node is being dragged and where it
//! hovers. The move itself is delegated to the repository on drop.

use tracing::debug;

use crate::domain::entities::NodeId;
use crate::domain::error::DomainResult;
use crate::domain::repository::{MoveOutcome, NodeRepository};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        source: NodeId,
    },
    OverTarget {
        source: NodeId,
        target: NodeId,
    },
}

/// Result of releasing a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Moved,
    /// Dropped onto itself
    Unchanged,
    /// No drag was in progress
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    state: DragState,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != DragState::Idle
    }

    pub fn dragged(&self) -> Option<&NodeId> {
        match &self.state {
            DragState::Idle => None,
            DragState::Dragging { source } | DragState::OverTarget { source, .. } => Some(source),
        }
    }

    /// The node currently hovered as a drop target.
    pub fn drop_target(&self) -> Option<&NodeId> {
        match &self.state {
            DragState::OverTarget { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Start dragging `source`; the root and unknown ids cannot be dragged.
    pub fn begin(&mut self, source: &str, repo: &NodeRepository) -> bool {
        let Some(node) = repo.find(source) else {
            return false;
        };
        if node.id().is_root() {
            return false;
        }
        self.state = DragState::Dragging {
            source: node.id().clone(),
        };
        true
    }

    pub fn enter(&mut self, target: &str) {
        if let Some(source) = self.dragged().cloned() {
            self.state = DragState::OverTarget {
                source,
                target: NodeId::from(target),
            };
        }
    }

    pub fn leave(&mut self, target: &str) {
        if let DragState::OverTarget {
            source,
            target: hovered,
        } = &self.state
        {
            if hovered.as_str() == target {
                self.state = DragState::Dragging {
                    source: source.clone(),
                };
            }
        }
    }

    /// Release over `target`. The gesture ends whatever the outcome.
    pub fn drop(&mut self, target: &str, repo: &mut NodeRepository) -> DomainResult<DropOutcome> {
        let state = std::mem::take(&mut self.state);
        let source = match state {
            DragState::Idle => return Ok(DropOutcome::Ignored),
            DragState::Dragging { source } | DragState::OverTarget { source, .. } => source,
        };
        debug!("drop: {} onto {}", source, target);
        Ok(match repo.move_node(source.as_str(), target)? {
            MoveOutcome::Moved => DropOutcome::Moved,
            MoveOutcome::Unchanged => DropOutcome::Unchanged,
        })
    }

    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
    }
}
