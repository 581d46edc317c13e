//! # JSON persistence (schema version 1)
//!
//! Mirrors the teacher's `SavedGraph`/`SavedNode`/`SavedConnection` pattern:
//! a dedicated set of serializable DTOs, independent of the live domain
//! types, mapped field-by-field on save/load. Grounded on
//! `CanvasDocumentIO.cpp`.

use std::collections::HashMap;

use glam::{DVec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::error::{CanvasError, CanvasResult};
use crate::ids::{FabricCoord, ObjectId, PortId};
use crate::item::{
    ArrowPolicy, Block, BlockContent, BlockStyleOverride, CanvasItem, CanvasPort, ContainerOrientation,
    Endpoint, LinkHubKind, Padding, PortRef, PortRole, PortSide, Wire,
};
use crate::view::Transform;

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedDocument {
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    pub view: SavedView,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub items: Vec<SavedItem>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SavedPoint {
    pub x: f64,
    pub y: f64,
}

impl From<DVec2> for SavedPoint {
    fn from(p: DVec2) -> Self {
        Self { x: p.x, y: p.y }
    }
}

impl From<SavedPoint> for DVec2 {
    fn from(p: SavedPoint) -> Self {
        DVec2::new(p.x, p.y)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SavedView {
    pub zoom: f64,
    pub pan: SavedPoint,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SavedRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SavedPadding {
    pub l: f64,
    pub t: f64,
    pub r: f64,
    pub b: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedBlockStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<Vec4>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Vec4>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<Vec4>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedSymbolStyle {
    pub text_color: Vec4,
    pub point_size: f32,
    pub bold: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SavedContent {
    Symbol { symbol: String, style: SavedSymbolStyle },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedPort {
    pub id: String,
    pub side: String,
    pub role: String,
    pub t: f64,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedBlock {
    pub id: String,
    pub bounds: SavedRect,
    pub movable: bool,
    pub deletable: bool,
    pub label: String,
    pub spec_id: String,
    pub show_ports: bool,
    pub allow_multiple_ports: bool,
    pub auto_opposite_producer_port: bool,
    pub show_port_labels: bool,
    pub auto_port_layout: bool,
    pub port_snap_step: f64,
    pub is_link_hub: bool,
    pub keepout_margin: f64,
    pub content_padding: SavedPadding,
    pub corner_radius: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_port_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_hub_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<SavedBlockStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<SavedContent>,
    pub ports: Vec<SavedPort>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedPortRef {
    #[serde(rename = "itemId")]
    pub item_id: String,
    #[serde(rename = "portId")]
    pub port_id: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SavedEndpoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free: Option<SavedPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached: Option<SavedPortRef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedWire {
    pub id: String,
    pub a: SavedEndpoint,
    pub b: SavedEndpoint,
    pub arrow_policy: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_override: Option<Vec4>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_override: Option<Vec<SavedPoint>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SavedItem {
    Block(SavedBlock),
    Wire(SavedWire),
}

fn save_endpoint(ep: &Endpoint) -> SavedEndpoint {
    match ep {
        Endpoint::Free(p) => SavedEndpoint { free: Some((*p).into()), attached: None },
        Endpoint::Attached(r) => SavedEndpoint {
            free: None,
            attached: Some(SavedPortRef { item_id: r.item_id.to_string(), port_id: r.port_id.to_string() }),
        },
    }
}

fn load_endpoint(ep: &SavedEndpoint) -> CanvasResult<Endpoint> {
    if let Some(r) = &ep.attached {
        let item_id: ObjectId = r
            .item_id
            .parse()
            .map_err(|_| CanvasError::Validation(vec![format!("malformed itemId {}", r.item_id)]))?;
        let port_id: PortId = r
            .port_id
            .parse()
            .map_err(|_| CanvasError::Validation(vec![format!("malformed portId {}", r.port_id)]))?;
        return Ok(Endpoint::Attached(PortRef { item_id, port_id }));
    }
    if let Some(p) = &ep.free {
        return Ok(Endpoint::Free((*p).into()));
    }
    Err(CanvasError::Validation(vec!["wire endpoint has neither free nor attached".to_string()]))
}

fn save_block(b: &Block) -> SavedBlock {
    SavedBlock {
        id: b.id.to_string(),
        bounds: SavedRect { x: b.bounds.x, y: b.bounds.y, w: b.bounds.w, h: b.bounds.h },
        movable: b.movable,
        deletable: b.deletable,
        label: b.label.clone(),
        spec_id: b.spec_id.clone(),
        show_ports: b.show_ports,
        allow_multiple_ports: b.allow_multiple_ports,
        auto_opposite_producer_port: b.auto_opposite_producer_port,
        show_port_labels: b.show_port_labels,
        auto_port_layout: b.auto_port_layout,
        port_snap_step: b.port_snap_step,
        is_link_hub: b.is_link_hub,
        keepout_margin: b.keepout_margin,
        content_padding: SavedPadding {
            l: b.content_padding.l,
            t: b.content_padding.t,
            r: b.content_padding.r,
            b: b.content_padding.b,
        },
        corner_radius: b.corner_radius,
        auto_port_role: b.auto_port_role.map(|r| r.as_str().to_string()),
        link_hub_kind: b.link_hub_kind.map(save_link_hub_kind),
        style: b.style.as_ref().map(|s| SavedBlockStyle { outline: s.outline, fill: s.fill, label: s.label }),
        content: b.content.as_ref().and_then(save_content),
        ports: b
            .ports
            .iter()
            .map(|p| SavedPort {
                id: p.id.to_string(),
                side: p.side.as_str().to_string(),
                role: p.role.as_str().to_string(),
                t: p.t,
                name: p.name.clone(),
            })
            .collect(),
    }
}

fn save_link_hub_kind(kind: LinkHubKind) -> String {
    match kind {
        LinkHubKind::Split => "split".to_string(),
        LinkHubKind::Join => "join".to_string(),
        LinkHubKind::Broadcast => "broadcast".to_string(),
    }
}

fn load_link_hub_kind(s: &str) -> Option<LinkHubKind> {
    match s {
        "split" => Some(LinkHubKind::Split),
        "join" => Some(LinkHubKind::Join),
        "broadcast" => Some(LinkHubKind::Broadcast),
        _ => None,
    }
}

fn save_content(content: &BlockContent) -> Option<SavedContent> {
    match content {
        BlockContent::Symbol { symbol, text_color, point_size, bold } => Some(SavedContent::Symbol {
            symbol: symbol.clone(),
            style: SavedSymbolStyle { text_color: *text_color, point_size: *point_size, bold: *bold },
        }),
        // Leaf/Container content is an internal render concern with no
        // schema mapping today; only Symbol content round-trips.
        _ => None,
    }
}

fn load_content(saved: &SavedContent) -> BlockContent {
    match saved {
        SavedContent::Symbol { symbol, style } => BlockContent::Symbol {
            symbol: symbol.clone(),
            text_color: style.text_color,
            point_size: style.point_size,
            bold: style.bold,
        },
    }
}

fn save_wire(w: &Wire) -> SavedWire {
    SavedWire {
        id: w.id.to_string(),
        a: save_endpoint(&w.a),
        b: save_endpoint(&w.b),
        arrow_policy: w.arrow_policy.as_str().to_string(),
        color_override: w.color_override,
        route_override: if w.route_override.is_empty() {
            None
        } else {
            Some(w.route_override.iter().map(|c| SavedPoint { x: c.x as f64, y: c.y as f64 }).collect())
        },
    }
}

/// Serializes the live Document into the JSON schema-1 shape.
pub fn save_document(doc: &Document, view: &Transform, metadata: Option<serde_json::Value>) -> SavedDocument {
    let items = doc
        .items()
        .iter()
        .map(|item| match item {
            CanvasItem::Block(b) => SavedItem::Block(save_block(b)),
            CanvasItem::Wire(w) => SavedItem::Wire(save_wire(w)),
        })
        .collect();

    SavedDocument {
        schema_version: SCHEMA_VERSION,
        view: SavedView { zoom: view.zoom, pan: view.pan.into() },
        metadata,
        items,
    }
}

/// Serializes and renders to a JSON string.
pub fn to_json(doc: &Document, view: &Transform, metadata: Option<serde_json::Value>) -> CanvasResult<String> {
    let saved = save_document(doc, view, metadata);
    serde_json::to_string_pretty(&saved).map_err(CanvasError::from)
}

/// Clears `doc` and loads `json`, restoring `view`. On any error, `doc` is
/// left untouched (parsing and validation both happen against a scratch
/// document first).
pub fn load_document(doc: &mut Document, view: &mut Transform, json: &str) -> CanvasResult<()> {
    let saved: SavedDocument = serde_json::from_str(json)?;

    let mut scratch = Document::new(doc.fabric);
    let mut errors = Vec::new();

    // Pass 1: blocks, establishing the (itemId, portId) universe.
    let mut port_ids_by_item: HashMap<ObjectId, Vec<PortId>> = HashMap::new();
    for saved_item in &saved.items {
        let SavedItem::Block(sb) = saved_item else { continue };
        match build_block(sb) {
            Ok(block) => {
                port_ids_by_item.insert(block.id, block.ports.iter().map(|p| p.id).collect());
                scratch.insert_item_raw(CanvasItem::Block(block));
            }
            Err(e) => errors.push(e),
        }
    }

    // Pass 2: wires, validating attached refs against pass 1's universe.
    for saved_item in &saved.items {
        let SavedItem::Wire(sw) = saved_item else { continue };
        match build_wire(sw, &port_ids_by_item) {
            Ok(wire) => scratch.insert_item_raw(CanvasItem::Wire(wire)),
            Err(e) => errors.push(e),
        }
    }

    if !errors.is_empty() {
        return Err(CanvasError::Validation(errors));
    }

    normalize_paired_ports(&mut scratch);

    doc.clear();
    for item in scratch.items() {
        doc.insert_item_raw(item.clone());
    }
    view.zoom = saved.view.zoom;
    view.pan = saved.view.pan.into();
    Ok(())
}

fn build_block(sb: &SavedBlock) -> Result<Block, String> {
    let id: ObjectId = sb.id.parse().map_err(|_| format!("malformed block id {}", sb.id))?;
    let mut ports = Vec::with_capacity(sb.ports.len());
    for sp in &sb.ports {
        let pid: PortId = sp.id.parse().map_err(|_| format!("malformed port id {}", sp.id))?;
        let side = PortSide::parse(&sp.side).ok_or_else(|| format!("unknown port side {}", sp.side))?;
        let role = PortRole::parse(&sp.role).ok_or_else(|| format!("unknown port role {}", sp.role))?;
        ports.push(CanvasPort { id: pid, role, side, t: sp.t, name: sp.name.clone() });
    }

    Ok(Block {
        id,
        bounds: crate::geometry::Rect::new(sb.bounds.x, sb.bounds.y, sb.bounds.w, sb.bounds.h),
        movable: sb.movable,
        deletable: sb.deletable,
        label: sb.label.clone(),
        spec_id: sb.spec_id.clone(),
        corner_radius: sb.corner_radius,
        ports,
        show_ports: sb.show_ports,
        show_port_labels: sb.show_port_labels,
        allow_multiple_ports: sb.allow_multiple_ports,
        auto_port_layout: sb.auto_port_layout,
        auto_port_role: sb.auto_port_role.as_deref().and_then(PortRole::parse),
        auto_opposite_producer_port: sb.auto_opposite_producer_port,
        port_snap_step: sb.port_snap_step,
        is_link_hub: sb.is_link_hub,
        link_hub_kind: sb.link_hub_kind.as_deref().and_then(load_link_hub_kind),
        style: sb.style.as_ref().map(|s| BlockStyleOverride { outline: s.outline, fill: s.fill, label: s.label }),
        keepout_margin: sb.keepout_margin,
        content_padding: Padding { l: sb.content_padding.l, t: sb.content_padding.t, r: sb.content_padding.r, b: sb.content_padding.b },
        content: sb.content.as_ref().map(load_content),
    })
}

fn build_wire(sw: &SavedWire, port_ids_by_item: &HashMap<ObjectId, Vec<PortId>>) -> Result<Wire, String> {
    let id: ObjectId = sw.id.parse().map_err(|_| format!("malformed wire id {}", sw.id))?;
    let a = load_endpoint(&sw.a).map_err(|e| e.to_string())?;
    let b = load_endpoint(&sw.b).map_err(|e| e.to_string())?;

    for ep in [&a, &b] {
        if let Endpoint::Attached(r) = ep {
            let known = port_ids_by_item.get(&r.item_id).map(|ps| ps.contains(&r.port_id)).unwrap_or(false);
            if !known {
                return Err(format!("wire {} references unknown port {}/{}", sw.id, r.item_id, r.port_id));
            }
        }
    }

    let arrow_policy = ArrowPolicy::parse(&sw.arrow_policy).ok_or_else(|| format!("unknown arrow policy {}", sw.arrow_policy))?;
    let route_override: Vec<FabricCoord> = sw
        .route_override
        .as_ref()
        .map(|pts| pts.iter().map(|p| FabricCoord::new(p.x as i32, p.y as i32)).collect())
        .unwrap_or_default();

    Ok(Wire { id, a, b, arrow_policy, color_override: sw.color_override, route_override, route_stale: false })
}

/// Post-load pass: for blocks with `autoOppositeProducerPort`, unnamed
/// consumer/producer pairs on opposite sides at matching `t` are assigned a
/// canonical `__pair:<key>` name on both sides.
fn normalize_paired_ports(doc: &mut Document) {
    let block_ids: Vec<ObjectId> = doc.items().iter().filter_map(|i| i.as_block()).map(|b| b.id).collect();
    for block_id in block_ids {
        let Some(block) = doc.find_item_mut(block_id).and_then(|i| i.as_block_mut()) else { continue };
        if !block.auto_opposite_producer_port {
            continue;
        }

        let unnamed_consumers: Vec<(usize, PortSide, f64)> = block
            .ports
            .iter()
            .enumerate()
            .filter(|(_, p)| p.role == PortRole::Consumer && p.name.is_empty())
            .map(|(i, p)| (i, p.side, p.t))
            .collect();

        for (ci, side, t) in unnamed_consumers {
            let producer_idx = block.ports.iter().position(|p| {
                p.role == PortRole::Producer && p.name.is_empty() && p.side == side.opposite() && (p.t - t).abs() < 1e-6
            });
            if let Some(pi) = producer_idx {
                let key = crate::ports::fresh_pair_key();
                let name = crate::ports::paired_port_name(&key);
                block.ports[ci].name = name.clone();
                block.ports[pi].name = name;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric::Fabric;
    use crate::geometry::Rect;

    #[test]
    fn round_trip_preserves_block_and_wire() {
        let mut doc = Document::new(Fabric::new(8.0));
        let a = doc.create_block(Rect::new(0.0, 0.0, 40.0, 40.0), true);
        let b = doc.create_block(Rect::new(200.0, 0.0, 40.0, 40.0), true);
        let pa = doc.find_item_mut(a).unwrap().as_block_mut().unwrap().add_port(PortSide::Right, 0.5, PortRole::Producer, String::new());
        let pb = doc.find_item_mut(b).unwrap().as_block_mut().unwrap().add_port(PortSide::Left, 0.5, PortRole::Consumer, String::new());
        let wire = Wire::new(
            ObjectId::create(),
            Endpoint::Attached(PortRef { item_id: a, port_id: pa }),
            Endpoint::Attached(PortRef { item_id: b, port_id: pb }),
        );
        doc.insert_item_raw(CanvasItem::Wire(wire));

        let view = Transform { pan: DVec2::new(3.0, 4.0), zoom: 1.5 };
        let json = to_json(&doc, &view, None).unwrap();

        let mut loaded = Document::new(Fabric::new(8.0));
        let mut loaded_view = Transform::default();
        load_document(&mut loaded, &mut loaded_view, &json).unwrap();

        assert_eq!(loaded.items().len(), 3);
        assert_eq!(loaded_view.zoom, 1.5);
        assert_eq!(loaded_view.pan, DVec2::new(3.0, 4.0));
    }

    #[test]
    fn dangling_port_reference_is_rejected_wholesale() {
        let mut doc = Document::new(Fabric::new(8.0));
        doc.create_block(Rect::new(0.0, 0.0, 40.0, 40.0), true);
        let view = Transform::default();
        let good_json = to_json(&doc, &view, None).unwrap();
        let mut saved: SavedDocument = serde_json::from_str(&good_json).unwrap();
        saved.items.push(SavedItem::Wire(SavedWire {
            id: ObjectId::create().to_string(),
            a: SavedEndpoint { free: None, attached: Some(SavedPortRef { item_id: ObjectId::create().to_string(), port_id: PortId::create().to_string() }) },
            b: SavedEndpoint { free: Some(SavedPoint { x: 0.0, y: 0.0 }), attached: None },
            arrow_policy: "none".to_string(),
            color_override: None,
            route_override: None,
        }));
        let bad_json = serde_json::to_string(&saved).unwrap();

        let mut loaded = Document::new(Fabric::new(8.0));
        let mut loaded_view = Transform::default();
        assert!(load_document(&mut loaded, &mut loaded_view, &bad_json).is_err());
        assert!(loaded.items().is_empty());
    }
}
