//! # Canvas items: Block, Wire, Ports
//!
//! `CanvasItem` is a tagged variant over `{Block, Wire}` rather than a
//! trait-object vtable: the Document needs to serialize, clone, and pattern
//! match on the concrete kind constantly (JSON serializer, design
//! projection, commands), so an enum with inline methods is the better fit
//! in Rust than `Box<dyn Trait>` — matching the "enum with inline methods"
//! option spec.md §9 names explicitly.

use glam::{DVec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::geometry::{self, Rect};
use crate::ids::{BlockId, ObjectId, PortId};

pub const PAIR_PREFIX: &str = "__pair:";
pub const LEGACY_PAIR_PREFIX: &str = "__paired:";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortSide {
    Left,
    Right,
    Top,
    Bottom,
}

impl PortSide {
    pub fn opposite(self) -> PortSide {
        match self {
            PortSide::Left => PortSide::Right,
            PortSide::Right => PortSide::Left,
            PortSide::Top => PortSide::Bottom,
            PortSide::Bottom => PortSide::Top,
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, PortSide::Left | PortSide::Right)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PortSide::Left => "left",
            PortSide::Right => "right",
            PortSide::Top => "top",
            PortSide::Bottom => "bottom",
        }
    }

    pub fn parse(s: &str) -> Option<PortSide> {
        match s {
            "left" => Some(PortSide::Left),
            "right" => Some(PortSide::Right),
            "top" => Some(PortSide::Top),
            "bottom" => Some(PortSide::Bottom),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortRole {
    Producer,
    Consumer,
    Dynamic,
}

impl PortRole {
    pub fn as_str(self) -> &'static str {
        match self {
            PortRole::Producer => "producer",
            PortRole::Consumer => "consumer",
            PortRole::Dynamic => "dynamic",
        }
    }

    pub fn parse(s: &str) -> Option<PortRole> {
        match s {
            "producer" => Some(PortRole::Producer),
            "consumer" => Some(PortRole::Consumer),
            "dynamic" => Some(PortRole::Dynamic),
            _ => None,
        }
    }
}

/// A port on a block. The anchor is recomputed on demand from the owning
/// block's bounds; `t` is the raw, unclamped fractional position along the
/// chosen side as last set by the caller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasPort {
    pub id: PortId,
    pub role: PortRole,
    pub side: PortSide,
    pub t: f64,
    pub name: String,
}

impl CanvasPort {
    /// Extracts the pair key from a `__pair:<key>` or legacy `__paired:<key>`
    /// name, if present.
    pub fn paired_key(&self) -> Option<&str> {
        self.name
            .strip_prefix(PAIR_PREFIX)
            .or_else(|| self.name.strip_prefix(LEGACY_PAIR_PREFIX))
    }

    /// True iff this is a producer port carrying a pair key.
    pub fn is_paired_producer(&self) -> bool {
        self.role == PortRole::Producer && self.paired_key().is_some()
    }

    /// The port anchor in scene space, clamped away from corners and snapped
    /// to `snap_step` when positive.
    pub fn anchor_scene(&self, block_bounds: Rect, snap_step: f64) -> DVec2 {
        let (axis_len, lo_pt, hi_pt) = match self.side {
            PortSide::Left | PortSide::Right => (block_bounds.h, block_bounds.top(), block_bounds.bottom()),
            PortSide::Top | PortSide::Bottom => (block_bounds.w, block_bounds.left(), block_bounds.right()),
        };

        let t = if snap_step > 0.0 && axis_len > 2.0 * snap_step {
            let lo = snap_step / axis_len;
            let hi = 1.0 - lo;
            let clamped = geometry::clamp_t(self.t, lo, hi);
            let along = lo_pt + clamped * axis_len;
            let snapped = geometry::snap_coord(along, snap_step);
            ((snapped - lo_pt) / axis_len).clamp(lo, hi)
        } else {
            0.5
        };

        let along = lo_pt + t * axis_len;
        match self.side {
            PortSide::Left => DVec2::new(block_bounds.left(), along),
            PortSide::Right => DVec2::new(block_bounds.right(), along),
            PortSide::Top => DVec2::new(along, block_bounds.top()),
            PortSide::Bottom => DVec2::new(along, block_bounds.bottom()),
        }
    }
}

/// A polymorphic reference to content painted inside a block's padded
/// sub-rect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockContent {
    Leaf { text: String },
    Symbol {
        symbol: String,
        text_color: Vec4,
        point_size: f32,
        bold: bool,
    },
    Container {
        orientation: ContainerOrientation,
        padding: f64,
        gap: f64,
        columns: u32,
        children: Vec<BlockContent>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerOrientation {
    Vertical,
    Horizontal,
    Grid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct BlockStyleOverride {
    pub outline: Option<Vec4>,
    pub fill: Option<Vec4>,
    pub label: Option<Vec4>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub l: f64,
    pub t: f64,
    pub r: f64,
    pub b: f64,
}

impl Default for Padding {
    fn default() -> Self {
        Self { l: 4.0, t: 4.0, r: 4.0, b: 4.0 }
    }
}

/// A block: a resizable, movable (or fixed) rectangle carrying ports and
/// optional content.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: ObjectId,
    pub bounds: Rect,
    pub movable: bool,
    pub deletable: bool,
    pub label: String,
    pub spec_id: String,
    pub corner_radius: f64,
    pub ports: Vec<CanvasPort>,
    pub show_ports: bool,
    pub show_port_labels: bool,
    pub allow_multiple_ports: bool,
    pub auto_port_layout: bool,
    pub auto_port_role: Option<PortRole>,
    pub auto_opposite_producer_port: bool,
    pub port_snap_step: f64,
    pub is_link_hub: bool,
    pub link_hub_kind: Option<LinkHubKind>,
    pub style: Option<BlockStyleOverride>,
    pub keepout_margin: f64,
    pub content_padding: Padding,
    pub content: Option<BlockContent>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkHubKind {
    Split,
    Join,
    Broadcast,
}

impl LinkHubKind {
    pub fn symbol(self) -> &'static str {
        match self {
            LinkHubKind::Split => "S",
            LinkHubKind::Join => "J",
            LinkHubKind::Broadcast => "B",
        }
    }
}

impl Block {
    pub fn new(id: ObjectId, bounds: Rect, movable: bool) -> Self {
        Self {
            id,
            bounds,
            movable,
            deletable: true,
            label: String::new(),
            spec_id: String::new(),
            corner_radius: 6.0,
            ports: Vec::new(),
            show_ports: true,
            show_port_labels: false,
            allow_multiple_ports: false,
            auto_port_layout: false,
            auto_port_role: None,
            auto_opposite_producer_port: false,
            port_snap_step: 0.0,
            is_link_hub: false,
            link_hub_kind: None,
            style: None,
            keepout_margin: -1.0,
            content_padding: Padding::default(),
            content: None,
        }
    }

    /// The effective keepout rectangle: `bounds` expanded by
    /// `max(keepout_margin, step)`, rounded up to the lattice step.
    pub fn keepout_rect(&self, step: f64) -> Rect {
        let margin = if self.keepout_margin < 0.0 {
            step
        } else {
            self.keepout_margin
        };
        let margin = geometry::snap_size_up(margin, step);
        self.bounds.expanded(margin)
    }

    pub fn port(&self, id: PortId) -> Option<&CanvasPort> {
        self.ports.iter().find(|p| p.id == id)
    }

    pub fn port_mut(&mut self, id: PortId) -> Option<&mut CanvasPort> {
        self.ports.iter_mut().find(|p| p.id == id)
    }

    pub fn port_index(&self, id: PortId) -> Option<usize> {
        self.ports.iter().position(|p| p.id == id)
    }

    /// Adds a port toward a target scene point: side/`t` are derived from
    /// the unit direction vector from the block center to `target`, per
    /// `t=(component+1)/2` on the unit vector's relevant axis.
    pub fn add_port_toward(&mut self, target: DVec2, role: PortRole, name: String) -> PortId {
        let center = DVec2::new(
            self.bounds.left() + self.bounds.w / 2.0,
            self.bounds.top() + self.bounds.h / 2.0,
        );
        let d = target - center;
        let (dx, dy) = if d.length_squared() > 1e-6 {
            let unit = d / d.length();
            (unit.x, unit.y)
        } else {
            (0.0, 0.0)
        };

        let (side, t) = if dx.abs() >= dy.abs() {
            if dx >= 0.0 { (PortSide::Right, (dy + 1.0) * 0.5) } else { (PortSide::Left, (dy + 1.0) * 0.5) }
        } else if dy >= 0.0 {
            (PortSide::Bottom, (dx + 1.0) * 0.5)
        } else {
            (PortSide::Top, (dx + 1.0) * 0.5)
        };

        self.add_port(side, t, role, name)
    }

    pub fn add_port(&mut self, side: PortSide, t: f64, role: PortRole, name: String) -> PortId {
        let id = PortId::create();
        self.ports.push(CanvasPort { id, role, side, t, name });
        id
    }
}

/// A reference to a port on an item, used by wire endpoints. Pure by-id, not
/// owning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub item_id: ObjectId,
    pub port_id: PortId,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Endpoint {
    Attached(PortRef),
    Free(DVec2),
}

impl Endpoint {
    pub fn is_attached(&self) -> bool {
        matches!(self, Endpoint::Attached(_))
    }

    pub fn attached_ref(&self) -> Option<PortRef> {
        match self {
            Endpoint::Attached(r) => Some(*r),
            Endpoint::Free(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrowPolicy {
    None,
    Start,
    End,
}

impl ArrowPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            ArrowPolicy::None => "none",
            ArrowPolicy::Start => "start",
            ArrowPolicy::End => "end",
        }
    }

    pub fn parse(s: &str) -> Option<ArrowPolicy> {
        match s {
            "none" => Some(ArrowPolicy::None),
            "start" => Some(ArrowPolicy::Start),
            "end" => Some(ArrowPolicy::End),
            _ => None,
        }
    }
}

use crate::ids::FabricCoord;

/// A wire: two endpoints (attached or free), plus an optional user-pinned
/// orthogonal route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub id: ObjectId,
    pub a: Endpoint,
    pub b: Endpoint,
    pub arrow_policy: ArrowPolicy,
    pub color_override: Option<Vec4>,
    pub route_override: Vec<FabricCoord>,
    #[serde(skip)]
    pub route_stale: bool,
}

impl Wire {
    pub fn new(id: ObjectId, a: Endpoint, b: Endpoint) -> Self {
        Self {
            id,
            a,
            b,
            arrow_policy: ArrowPolicy::None,
            color_override: None,
            route_override: Vec::new(),
            route_stale: false,
        }
    }

    pub fn references_port(&self, item_id: ObjectId, port_id: PortId) -> bool {
        let matches = |ep: &Endpoint| {
            matches!(ep, Endpoint::Attached(r) if r.item_id == item_id && r.port_id == port_id)
        };
        matches(&self.a) || matches(&self.b)
    }

    pub fn references_item(&self, item_id: ObjectId) -> bool {
        let matches = |ep: &Endpoint| matches!(ep, Endpoint::Attached(r) if r.item_id == item_id);
        matches(&self.a) || matches(&self.b)
    }

    pub fn clear_route_override(&mut self) {
        self.route_override.clear();
    }
}

/// Tagged variant over the two canvas item kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CanvasItem {
    Block(Block),
    Wire(Wire),
}

impl CanvasItem {
    pub fn id(&self) -> ObjectId {
        match self {
            CanvasItem::Block(b) => b.id,
            CanvasItem::Wire(w) => w.id,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            CanvasItem::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_block_mut(&mut self) -> Option<&mut Block> {
        match self {
            CanvasItem::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_wire(&self) -> Option<&Wire> {
        match self {
            CanvasItem::Wire(w) => Some(w),
            _ => None,
        }
    }

    pub fn as_wire_mut(&mut self) -> Option<&mut Wire> {
        match self {
            CanvasItem::Wire(w) => Some(w),
            _ => None,
        }
    }

    /// Whether this item keeps wires out of its keepout rectangle.
    pub fn blocks_fabric(&self) -> bool {
        matches!(self, CanvasItem::Block(_))
    }

    pub fn keepout_scene_rect(&self, step: f64) -> Option<Rect> {
        match self {
            CanvasItem::Block(b) => Some(b.keepout_rect(step)),
            CanvasItem::Wire(_) => None,
        }
    }

    pub fn bounds_scene(&self) -> Option<Rect> {
        match self {
            CanvasItem::Block(b) => Some(b.bounds),
            CanvasItem::Wire(_) => None,
        }
    }

    pub fn hit_test(&self, p: DVec2) -> bool {
        match self {
            CanvasItem::Block(b) => b.bounds.contains(p),
            CanvasItem::Wire(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_recognizes_both_current_and_legacy_prefix() {
        let p = CanvasPort {
            id: PortId::create(),
            role: PortRole::Producer,
            side: PortSide::Left,
            t: 0.5,
            name: "__pair:abc".to_string(),
        };
        assert_eq!(p.paired_key(), Some("abc"));

        let legacy = CanvasPort {
            name: "__paired:abc".to_string(),
            ..p
        };
        assert_eq!(legacy.paired_key(), Some("abc"));
    }

    #[test]
    fn keepout_defaults_to_step_when_margin_negative() {
        let mut b = Block::new(ObjectId::create(), Rect::new(0.0, 0.0, 40.0, 40.0), true);
        b.keepout_margin = -1.0;
        let r = b.keepout_rect(8.0);
        assert_eq!(r.x, -8.0);
        assert_eq!(r.w, 56.0);
    }
}
