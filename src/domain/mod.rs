//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod drag;
pub mod entities;
pub mod error;
pub mod layout;
pub mod repository;
pub mod templates;
pub mod viewport;

pub use arena::{NodeData, TreeArena, TreeNode};
pub use drag::{DragController, DragState, DropOutcome};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use layout::{
    ChartLayout, CollapseState, LayoutConfig, LayoutEngine, PlacedNode, Point, Rect, Segment,
    StyleTier, TierStyle,
};
pub use repository::{MoveOutcome, NodeRef, NodeRepository};
pub use templates::{validate_template, TemplateCatalog, DEFAULT_TEMPLATE};
pub use viewport::{ControlKind, PointerTarget, Vec2, ViewTransform, Viewport, ZoomLimits};
