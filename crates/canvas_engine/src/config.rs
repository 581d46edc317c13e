//! # Configuration
//!
//! `CanvasConfig` collects every bit-exact default the host can tune. The
//! teacher's `CanvasConfig` carried only pan/zoom/snap speeds; this widens it
//! to the full constant table so a host never has to hardcode a magic number
//! that already has a documented default.

use serde::{Deserialize, Serialize};

/// Tunable parameters for the canvas engine. Defaults match the bit-exact
/// constants table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Lattice step in scene units. Default: 8.0.
    pub grid_step: f64,
    /// Default block corner radius. Default: 6.0.
    pub block_corner_radius: f64,
    /// Radius in pixels within which a pointer hits a port. Default: 8.0.
    pub port_hit_radius_px: f64,
    /// Half-extent, in *unscaled* pixels, by which a marquee rect is padded
    /// to pick up ports near its border. Default: 4.0.
    pub port_hit_box_half_px: f64,
    /// Radius in pixels within which a pointer hovers a block edge. Default: 14.0.
    pub edge_hover_radius_px: f64,
    /// Radius in pixels within which a pointer hits a wire endpoint. Default: 10.0.
    pub endpoint_hit_radius_px: f64,
    /// Minimum pointer travel before an endpoint drag begins. Default: 4.0.
    pub endpoint_drag_threshold_px: f64,
    /// Minimum pointer travel before a marquee selection begins. Default: 4.0.
    pub marquee_drag_threshold_px: f64,
    /// Band, in pixels, within which a free block edge accepts a new port. Default: 20.0.
    pub port_activation_band_px: f64,
    /// Side length of a freshly minted link hub, in lattice steps. Default: 2.0.
    pub link_hub_size_steps: f64,
    /// A* turn penalty added on a direction change. Default: 3.
    pub turn_penalty: i64,
    /// A* visited-state cap before the router falls back to Manhattan. Default: 40000.
    pub a_star_max_visited: usize,
    /// Maximum steps taken while escaping a blocked port terminal. Default: 8.
    pub escape_max_steps: u32,
    /// Maximum steps taken while projecting a border point onto free fabric. Default: 64.
    pub fabric_escape_max_steps: u32,
    /// Minimum allowed zoom. Default: 0.10.
    pub zoom_min: f64,
    /// Maximum allowed zoom. Default: 8.00.
    pub zoom_max: f64,
    /// Multiplicative zoom step per wheel click. Default: 1.10.
    pub zoom_step: f64,
    /// Maximum bytes for a persisted state document. Default: 4 MiB.
    pub max_state_document_bytes: u64,
    /// Visual styling configuration.
    #[serde(default)]
    pub style: CanvasStyle,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            grid_step: 8.0,
            block_corner_radius: 6.0,
            port_hit_radius_px: 8.0,
            port_hit_box_half_px: 4.0,
            edge_hover_radius_px: 14.0,
            endpoint_hit_radius_px: 10.0,
            endpoint_drag_threshold_px: 4.0,
            marquee_drag_threshold_px: 4.0,
            port_activation_band_px: 20.0,
            link_hub_size_steps: 2.0,
            turn_penalty: 3,
            a_star_max_visited: 40_000,
            escape_max_steps: 8,
            fabric_escape_max_steps: 64,
            zoom_min: 0.10,
            zoom_max: 8.00,
            zoom_step: 1.10,
            max_state_document_bytes: 4 * 1024 * 1024,
            style: CanvasStyle::default(),
        }
    }
}

/// Visual styling configuration for the canvas.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CanvasStyle {
    pub background_color: glam::Vec4,
    pub grid_color: glam::Vec4,
    #[serde(default)]
    pub block_default: BlockStyle,
    #[serde(default)]
    pub wire_default: WireStyleColors,
    pub port_color: glam::Vec4,
    pub selection_box_color: glam::Vec4,
    pub selection_box_border_color: glam::Vec4,
    /// Colors for link-hub kinds: Split, Join, Broadcast.
    #[serde(default)]
    pub link_hub_colors: LinkHubColors,
}

impl Default for CanvasStyle {
    fn default() -> Self {
        Self {
            background_color: glam::Vec4::new(0.1, 0.1, 0.1, 1.0),
            grid_color: glam::Vec4::new(0.2, 0.2, 0.2, 1.0),
            block_default: BlockStyle::default(),
            wire_default: WireStyleColors::default(),
            port_color: glam::Vec4::new(0.7, 0.7, 0.7, 1.0),
            selection_box_color: glam::Vec4::new(0.3, 0.3, 0.6, 0.2),
            selection_box_border_color: glam::Vec4::new(0.4, 0.4, 0.8, 0.5),
            link_hub_colors: LinkHubColors::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockStyle {
    pub fill: glam::Vec4,
    pub outline: glam::Vec4,
    pub label: glam::Vec4,
}

impl Default for BlockStyle {
    fn default() -> Self {
        Self {
            fill: glam::Vec4::new(0.15, 0.15, 0.15, 1.0),
            outline: glam::Vec4::new(0.5, 0.5, 0.5, 1.0),
            label: glam::Vec4::new(1.0, 1.0, 1.0, 1.0),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WireStyleColors {
    pub color: glam::Vec4,
    pub width: f32,
}

impl Default for WireStyleColors {
    fn default() -> Self {
        Self {
            color: glam::Vec4::new(0.8, 0.8, 0.8, 1.0),
            width: 2.0,
        }
    }
}

/// Per-kind colors for link hubs, used both for the hub's own fill/outline
/// and for the red/green link-wire coloring rule (producer side vs. consumer
/// side).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkHubColors {
    pub split: HubColorSet,
    pub join: HubColorSet,
    pub broadcast: HubColorSet,
    /// Wire color on the producer side of a link-hub wire. Default: red.
    pub producer_side_wire: glam::Vec4,
    /// Wire color on the consumer side of a link-hub wire. Default: green.
    pub consumer_side_wire: glam::Vec4,
}

impl Default for LinkHubColors {
    fn default() -> Self {
        Self {
            split: HubColorSet {
                outline: glam::Vec4::new(0.3, 0.5, 0.9, 1.0),
                fill: glam::Vec4::new(0.15, 0.2, 0.35, 1.0),
                text: glam::Vec4::new(1.0, 1.0, 1.0, 1.0),
            },
            join: HubColorSet {
                outline: glam::Vec4::new(0.9, 0.6, 0.2, 1.0),
                fill: glam::Vec4::new(0.35, 0.25, 0.1, 1.0),
                text: glam::Vec4::new(1.0, 1.0, 1.0, 1.0),
            },
            broadcast: HubColorSet {
                outline: glam::Vec4::new(0.6, 0.3, 0.8, 1.0),
                fill: glam::Vec4::new(0.25, 0.15, 0.3, 1.0),
                text: glam::Vec4::new(1.0, 1.0, 1.0, 1.0),
            },
            producer_side_wire: glam::Vec4::new(0.85, 0.15, 0.15, 1.0),
            consumer_side_wire: glam::Vec4::new(0.15, 0.75, 0.25, 1.0),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HubColorSet {
    pub outline: glam::Vec4,
    pub fill: glam::Vec4,
    pub text: glam::Vec4,
}
