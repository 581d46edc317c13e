//! # Fabric
//!
//! The integer lattice underlying the canvas. `Fabric` itself carries only
//! the step configuration; blocking queries and enumeration are driven by a
//! caller-supplied predicate so this module stays decoupled from `Document`.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::geometry::{self, Rect};
use crate::ids::FabricCoord;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fabric {
    pub step: f64,
}

impl Default for Fabric {
    fn default() -> Self {
        Self { step: 8.0 }
    }
}

impl Fabric {
    pub fn new(step: f64) -> Self {
        Self { step }
    }

    pub fn to_coord(&self, p: DVec2) -> FabricCoord {
        geometry::to_fabric_coord(p, self.step)
    }

    pub fn to_scene(&self, c: FabricCoord) -> DVec2 {
        geometry::to_scene_point(c, self.step)
    }

    /// Every lattice coord within `rect`, padded by one step, optionally
    /// filtered by `blocked`.
    pub fn enumerate(&self, rect: Rect, blocked: Option<&dyn Fn(FabricCoord) -> bool>) -> Vec<FabricCoord> {
        let padded = rect.expanded(self.step);
        let min_x = (padded.left() / self.step).floor() as i32;
        let max_x = (padded.right() / self.step).ceil() as i32;
        let min_y = (padded.top() / self.step).floor() as i32;
        let max_y = (padded.bottom() / self.step).ceil() as i32;

        let mut out = Vec::new();
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let c = FabricCoord::new(x, y);
                if blocked.map(|f| f(c)).unwrap_or(false) {
                    continue;
                }
                out.push(c);
            }
        }
        out
    }

    /// Recommended stride (in lattice steps) so on-screen point density
    /// stays readable at a given zoom. A renderer contract, not wired to any
    /// concrete painter.
    pub fn draw_stride(&self, zoom: f64) -> i32 {
        if zoom >= 1.0 {
            1
        } else if zoom >= 0.5 {
            2
        } else if zoom >= 0.25 {
            4
        } else {
            8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerate_covers_padded_rect() {
        let f = Fabric::new(8.0);
        let coords = f.enumerate(Rect::new(0.0, 0.0, 16.0, 16.0), None);
        assert!(coords.contains(&FabricCoord::new(0, 0)));
        assert!(coords.contains(&FabricCoord::new(2, 2)));
        assert!(coords.contains(&FabricCoord::new(-1, -1)));
    }

    #[test]
    fn enumerate_respects_blocking_predicate() {
        let f = Fabric::new(8.0);
        let blocked = |c: FabricCoord| c.x == 0 && c.y == 0;
        let coords = f.enumerate(Rect::new(0.0, 0.0, 8.0, 8.0), Some(&blocked));
        assert!(!coords.contains(&FabricCoord::new(0, 0)));
    }
}
