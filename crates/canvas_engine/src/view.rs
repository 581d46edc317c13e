//! # Viewport system
//!
//! Transforms between scene space (the infinite fabric) and view space (the
//! window's pixels). Scene coordinates use `f64` so that lattice snapping
//! stays exact at deep zoom; view coordinates are the host's pixel space.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Camera state: pan offset and zoom factor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub pan: DVec2,
    pub zoom: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self { pan: DVec2::ZERO, zoom: 1.0 }
    }
}

impl Transform {
    /// Clamps `zoom` into `[min, max]`.
    pub fn clamp_zoom(&mut self, min: f64, max: f64) {
        self.zoom = self.zoom.clamp(min, max);
    }
}

/// Combines the camera transform with the viewport size in pixels.
pub struct View {
    pub transform: Transform,
    pub viewport_size: DVec2,
}

impl View {
    pub fn new(transform: Transform, viewport_size: DVec2) -> Self {
        Self { transform, viewport_size }
    }

    /// `view = scene * zoom + pan`.
    pub fn scene_to_view(&self, scene_pos: DVec2) -> DVec2 {
        scene_pos * self.transform.zoom + self.transform.pan
    }

    /// `scene = (view - pan) / zoom`.
    pub fn view_to_scene(&self, view_pos: DVec2) -> DVec2 {
        (view_pos - self.transform.pan) / self.transform.zoom
    }

    /// Zooms around a fixed view-space anchor point (e.g. the cursor),
    /// keeping the scene point under the cursor stationary.
    pub fn zoom_at(&mut self, anchor_view: DVec2, factor: f64, min: f64, max: f64) {
        let anchor_scene = self.view_to_scene(anchor_view);
        self.transform.zoom = (self.transform.zoom * factor).clamp(min, max);
        let new_anchor_view = self.scene_to_view(anchor_scene);
        self.transform.pan += anchor_view - new_anchor_view;
    }

    /// The visible scene-space rectangle for the current viewport.
    pub fn visible_scene_rect(&self) -> crate::geometry::Rect {
        let top_left = self.view_to_scene(DVec2::ZERO);
        let bottom_right = self.view_to_scene(self.viewport_size);
        crate::geometry::Rect::new(
            top_left.x.min(bottom_right.x),
            top_left.y.min(bottom_right.y),
            (bottom_right.x - top_left.x).abs(),
            (bottom_right.y - top_left.y).abs(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_is_identity() {
        let view = View::new(Transform { pan: DVec2::new(10.0, -5.0), zoom: 2.0 }, DVec2::new(800.0, 600.0));
        let p = DVec2::new(123.0, 45.0);
        let back = view.view_to_scene(view.scene_to_view(p));
        assert!((back - p).length() < 1e-9);
    }

    #[test]
    fn zoom_at_keeps_anchor_scene_point_fixed() {
        let mut view = View::new(Transform::default(), DVec2::new(800.0, 600.0));
        let anchor_view = DVec2::new(400.0, 300.0);
        let anchor_scene_before = view.view_to_scene(anchor_view);
        view.zoom_at(anchor_view, 1.1, 0.1, 8.0);
        let anchor_scene_after = view.view_to_scene(anchor_view);
        assert!((anchor_scene_before - anchor_scene_after).length() < 1e-9);
    }
}
