//! # Rendering system
//!
//! Acts as the instruction-set architecture for the host's GPU/2D backend:
//! the engine outputs a display list of `DrawCommand`s in view space instead
//! of drawing pixels itself.

use glam::{DVec2, Vec4};
use serde::{Deserialize, Serialize};

/// A single drawing primitive, in view-space (pixel) coordinates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DrawCommand {
    /// A filled rounded rectangle with an optional stroke.
    Rect {
        pos: DVec2,
        size: DVec2,
        color: Vec4,
        corner_radius: f64,
        stroke_width: f32,
        stroke_color: Option<Vec4>,
    },
    /// A straight line segment, used for the fabric grid and wire legs.
    Line {
        start: DVec2,
        end: DVec2,
        color: Vec4,
        width: f32,
    },
    /// A filled circle, used for port dots and fabric points.
    Circle {
        center: DVec2,
        radius: f64,
        color: Vec4,
    },
    /// An orthogonal polyline, used for routed wires.
    Polyline {
        points: Vec<DVec2>,
        color: Vec4,
        width: f32,
        arrow_at_start: bool,
        arrow_at_end: bool,
    },
    /// Text, left to the host to shape and size.
    Text {
        pos: DVec2,
        text: String,
        color: Vec4,
        size: f32,
    },
}

/// A list of draw commands representing the current frame.
pub type RenderList = Vec<DrawCommand>;
