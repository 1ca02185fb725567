//! Pan and zoom state of the chart view.
//!
//! The viewport is independent of the tree: edits never touch it and a
//! viewport change never touches the tree.

use serde::{Deserialize, Serialize};

use crate::domain::entities::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl std::ops::Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

/// Bounds and step of the zoom factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: 0.3,
            max: 2.0,
            step: 0.1,
        }
    }
}

/// Translation followed by uniform scale, applied to layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub pan: Vec2,
    pub zoom: f32,
}

impl ViewTransform {
    pub const IDENTITY: ViewTransform = ViewTransform {
        pan: Vec2::ZERO,
        zoom: 1.0,
    };

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (x * self.zoom + self.pan.x, y * self.zoom + self.pan.y)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Interactive element types that swallow a press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    TextField,
    Button,
    Selector,
}

/// What a pointer press landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    Canvas,
    Node(NodeId),
    Control(ControlKind),
}

impl PointerTarget {
    pub fn starts_pan(&self) -> bool {
        matches!(self, PointerTarget::Canvas)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PanGesture {
    /// Pointer position minus pan at gesture start
    origin: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewport {
    transform: ViewTransform,
    limits: ZoomLimits,
    gesture: Option<PanGesture>,
}

impl Viewport {
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            transform: ViewTransform::IDENTITY,
            limits,
            gesture: None,
        }
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn zoom(&self) -> f32 {
        self.transform.zoom
    }

    pub fn pan(&self) -> Vec2 {
        self.transform.pan
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    pub fn is_panning(&self) -> bool {
        self.gesture.is_some()
    }

    /// Start a pan gesture; presses on nodes and controls are ignored.
    pub fn begin_pan(&mut self, pointer: Vec2, target: &PointerTarget) -> bool {
        if !target.starts_pan() {
            return false;
        }
        self.gesture = Some(PanGesture {
            origin: pointer - self.transform.pan,
        });
        true
    }

    /// Follow the pointer while a gesture is active.
    pub fn update_pan(&mut self, pointer: Vec2) -> bool {
        match self.gesture {
            Some(gesture) => {
                self.transform.pan = pointer - gesture.origin;
                true
            }
            None => false,
        }
    }

    pub fn end_pan(&mut self) {
        self.gesture = None;
    }

    /// Set an absolute pan offset.
    pub fn pan_to(&mut self, pan: Vec2) {
        self.transform.pan = pan;
    }

    fn set_zoom(&mut self, zoom: f32) -> f32 {
        let clamped = zoom.clamp(self.limits.min, self.limits.max);
        // keep repeated steps from drifting
        self.transform.zoom = (clamped * 1000.0).round() / 1000.0;
        self.transform.zoom
    }

    pub fn zoom_in(&mut self) -> f32 {
        self.set_zoom(self.transform.zoom + self.limits.step)
    }

    pub fn zoom_out(&mut self) -> f32 {
        self.set_zoom(self.transform.zoom - self.limits.step)
    }

    pub fn reset_view(&mut self) {
        self.transform = ViewTransform::IDENTITY;
        self.gesture = None;
    }

    /// Switch to the identity transform for a capture; returns what to restore.
    pub fn freeze(&mut self) -> ViewTransform {
        std::mem::replace(&mut self.transform, ViewTransform::IDENTITY)
    }

    pub fn restore(&mut self, saved: ViewTransform) {
        self.transform = saved;
    }
}
