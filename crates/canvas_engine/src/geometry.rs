//! # Geometry helpers
//!
//! Pure, non-mutating snapping and hit-test functions, grounded on
//! `CanvasGeometry.hpp`. Nothing here touches a `Document`; everything takes
//! its inputs by value.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::ids::FabricCoord;
use crate::item::PortSide;

/// An axis-aligned rectangle in scene space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn top_left(&self) -> DVec2 {
        DVec2::new(self.x, self.y)
    }

    pub fn size(&self) -> DVec2 {
        DVec2::new(self.w, self.h)
    }

    pub fn left(&self) -> f64 {
        self.x
    }
    pub fn right(&self) -> f64 {
        self.x + self.w
    }
    pub fn top(&self) -> f64 {
        self.y
    }
    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.left() && p.x <= self.right() && p.y >= self.top() && p.y <= self.bottom()
    }

    /// Expands the rect outward by `margin` on every side.
    pub fn expanded(&self, margin: f64) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            w: self.w + 2.0 * margin,
            h: self.h + 2.0 * margin,
        }
    }
}

/// Rounds `v` to the nearest multiple of `step` (banker's-unbiased round-half-away-from-zero,
/// matching `std::llround`).
pub fn snap_coord(v: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return v;
    }
    (v / step).round() * step
}

pub fn snap_point_to_grid(p: DVec2, step: f64) -> DVec2 {
    DVec2::new(snap_coord(p.x, step), snap_coord(p.y, step))
}

/// Rounds `v` up to the nearest multiple of `step`.
pub fn snap_size_up(v: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return v;
    }
    (v / step).ceil() * step
}

pub fn snap_bounds_to_grid(r: Rect, step: f64) -> Rect {
    if step <= 0.0 {
        return r;
    }
    Rect {
        x: snap_coord(r.x, step),
        y: snap_coord(r.y, step),
        w: snap_size_up(r.w, step),
        h: snap_size_up(r.h, step),
    }
}

pub fn clamp_t(t: f64, lo: f64, hi: f64) -> f64 {
    t.clamp(lo, hi)
}

pub fn to_fabric_coord(s: DVec2, step: f64) -> FabricCoord {
    FabricCoord::new((s.x / step).round() as i32, (s.y / step).round() as i32)
}

pub fn to_scene_point(c: FabricCoord, step: f64) -> DVec2 {
    DVec2::new(c.x as f64 * step, c.y as f64 * step)
}

/// Result of hit-testing a scene point against a block's edges.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeHit {
    pub side: PortSide,
    pub t: f64,
    pub anchor_scene: DVec2,
}

/// Finds the nearest block edge to `scene_pos`, within `threshold`, snapping
/// the along-edge coordinate to `snap_step`.
pub fn edge_hit_for_rect(
    bounds: Rect,
    scene_pos: DVec2,
    threshold: f64,
    snap_step: f64,
) -> Option<EdgeHit> {
    if bounds.w <= 1e-6 || bounds.h <= 1e-6 {
        return None;
    }

    let expanded = bounds.expanded(threshold);
    if !expanded.contains(scene_pos) {
        return None;
    }

    let d_left = (scene_pos.x - bounds.left()).abs();
    let d_right = (scene_pos.x - bounds.right()).abs();
    let d_top = (scene_pos.y - bounds.top()).abs();
    let d_bottom = (scene_pos.y - bounds.bottom()).abs();

    let mut best = d_left;
    let mut side = PortSide::Left;
    if d_right < best {
        best = d_right;
        side = PortSide::Right;
    }
    if d_top < best {
        best = d_top;
        side = PortSide::Top;
    }
    if d_bottom < best {
        best = d_bottom;
        side = PortSide::Bottom;
    }

    if best > threshold {
        return None;
    }

    let (anchor, t) = match side {
        PortSide::Left | PortSide::Right => {
            let mut y = scene_pos.y.clamp(bounds.top(), bounds.bottom());
            y = snap_coord(y, snap_step);
            y = y.clamp(bounds.top(), bounds.bottom());
            let x = if side == PortSide::Left {
                bounds.left()
            } else {
                bounds.right()
            };
            let t = (y - bounds.top()) / bounds.h;
            (DVec2::new(x, y), t)
        }
        PortSide::Top | PortSide::Bottom => {
            let mut x = scene_pos.x.clamp(bounds.left(), bounds.right());
            x = snap_coord(x, snap_step);
            x = x.clamp(bounds.left(), bounds.right());
            let y = if side == PortSide::Top {
                bounds.top()
            } else {
                bounds.bottom()
            };
            let t = (x - bounds.left()) / bounds.w;
            (DVec2::new(x, y), t)
        }
    };

    Some(EdgeHit {
        side,
        t,
        anchor_scene: anchor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snap_coord_rounds_to_nearest_step() {
        assert_eq!(snap_coord(10.0, 8.0), 8.0);
        assert_eq!(snap_coord(20.0, 8.0), 16.0);
        assert_eq!(snap_coord(21.0, 8.0), 24.0);
    }

    #[test]
    fn snap_size_up_never_shrinks() {
        assert_eq!(snap_size_up(40.0, 8.0), 40.0);
        assert_eq!(snap_size_up(41.0, 8.0), 48.0);
    }

    #[test]
    fn fabric_round_trip_is_exact_on_grid_points() {
        let step = 8.0;
        let c = FabricCoord::new(3, -2);
        let s = to_scene_point(c, step);
        assert_eq!(to_fabric_coord(s, step), c);
    }

    #[test]
    fn edge_hit_picks_nearest_side_and_snaps_along_edge() {
        let bounds = Rect::new(0.0, 0.0, 40.0, 40.0);
        let hit = edge_hit_for_rect(bounds, DVec2::new(0.5, 21.0), 8.0, 8.0).unwrap();
        assert_eq!(hit.side, PortSide::Left);
        assert_eq!(hit.anchor_scene.x, 0.0);
        assert_eq!(hit.anchor_scene.y, 24.0);
    }
}
