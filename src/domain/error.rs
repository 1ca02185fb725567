//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::entities::NodeId;

/// Domain errors represent rejected chart edits.
/// A returned error always means the tree was left unchanged.
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("position not found: {0}")]
    NotFound(NodeId),

    #[error("the root position cannot be {action}")]
    RootImmutable { action: &'static str },

    #[error("cannot move a supervisor into their own subordinate structure ({node} -> {target})")]
    CycleRejected { node: NodeId, target: NodeId },

    #[error("position has no parent: {0}")]
    NoParent(NodeId),

    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    #[error("invalid template '{name}': {reason}")]
    InvalidTemplate { name: String, reason: String },

    #[error("unknown role type: {0}")]
    UnknownRoleType(String),

    #[error("unknown field: {0}")]
    UnknownField(String),
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
