//! # Design projection
//!
//! Bidirectional `Canvas ⇄ DesignState` builder, grounded on
//! `DesignStateCanvas.cpp`. `DesignState` is a node/link graph addressed by
//! stable string ids (`specId`, not `ObjectId`) so it survives outside the
//! lifetime of any one canvas document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commands::{CompositeCommand, Command, CreateItemCommand, DeleteItemCommand};
use crate::config::CanvasConfig;
use crate::document::Document;
use crate::error::{CanvasError, CanvasResult};
use crate::geometry::Rect;
use crate::ids::{FabricCoord, ObjectId};
use crate::item::{
    Block, BlockContent, CanvasItem, Endpoint, LinkHubKind, Padding, PortRef, PortRole, PortSide, Wire,
};
use crate::ports;
use crate::view::Transform;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DesignNodeKind {
    Tile,
    LinkHub,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DesignLinkHubKind {
    Split,
    Join,
    Broadcast,
}

impl DesignLinkHubKind {
    fn to_canvas(self) -> LinkHubKind {
        match self {
            DesignLinkHubKind::Split => LinkHubKind::Split,
            DesignLinkHubKind::Join => LinkHubKind::Join,
            DesignLinkHubKind::Broadcast => LinkHubKind::Broadcast,
        }
    }

    fn from_canvas(kind: LinkHubKind) -> Self {
        match kind {
            LinkHubKind::Split => DesignLinkHubKind::Split,
            LinkHubKind::Join => DesignLinkHubKind::Join,
            LinkHubKind::Broadcast => DesignLinkHubKind::Broadcast,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DesignNode {
    pub id: String,
    pub kind: DesignNodeKind,
    pub hub_kind: Option<DesignLinkHubKind>,
    pub bounds: Option<Rect>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DesignPort {
    pub side: PortSide_,
    pub role: PortRole_,
    pub t: f64,
    pub pair_id: Option<String>,
    pub name: Option<String>,
}

// Wrapper newtypes give `DesignPort` a `Default` without requiring one on
// the domain enums (PortSide/PortRole carry no natural default member).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSide_(pub PortSide);
impl Default for PortSide_ {
    fn default() -> Self {
        PortSide_(PortSide::Left)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRole_(pub PortRole);
impl Default for PortRole_ {
    fn default() -> Self {
        PortRole_(PortRole::Consumer)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DesignEndpoint {
    pub node_id: String,
    pub port: DesignPort,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DesignLink {
    pub id: String,
    pub from: DesignEndpoint,
    pub to: DesignEndpoint,
    pub route_override: Vec<FabricCoord>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DesignState {
    pub metadata: Option<serde_json::Value>,
    pub view: Option<Transform>,
    pub nodes: Vec<DesignNode>,
    pub links: Vec<DesignLink>,
}

fn hub_id_for_block(block: &mut Block) -> String {
    let trimmed = block.spec_id.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    let id = format!("hub-{}", Uuid::new_v4());
    block.spec_id = id.clone();
    id
}

fn detect_hub_kind(block: &Block) -> Option<LinkHubKind> {
    let BlockContent::Symbol { symbol, .. } = block.content.as_ref()? else { return None };
    match symbol.trim() {
        "S" => Some(LinkHubKind::Split),
        "J" => Some(LinkHubKind::Join),
        "B" => Some(LinkHubKind::Broadcast),
        _ => None,
    }
}

/// Builds a `DesignState` snapshot from the live canvas. `view` is optional
/// since a headless document may have no attached viewport.
pub fn build_design_state(doc: &mut Document, view: Option<&Transform>, metadata: Option<serde_json::Value>) -> CanvasResult<DesignState> {
    let mut out = DesignState { metadata, view: view.copied(), nodes: Vec::new(), links: Vec::new() };

    let mut node_ids: HashMap<ObjectId, String> = HashMap::new();
    let block_ids: Vec<ObjectId> = doc.items().iter().filter_map(|i| i.as_block()).map(|b| b.id).collect();

    for block_id in &block_ids {
        let Some(block) = doc.find_item_mut(*block_id).and_then(|i| i.as_block_mut()) else { continue };
        if block.is_link_hub {
            let Some(hub_kind) = detect_hub_kind(block) else {
                return Err(CanvasError::Projection("unknown link hub symbol".to_string()));
            };
            let id = hub_id_for_block(block);
            out.nodes.push(DesignNode {
                id: id.clone(),
                kind: DesignNodeKind::LinkHub,
                hub_kind: Some(DesignLinkHubKind::from_canvas(hub_kind)),
                bounds: Some(block.bounds),
            });
            node_ids.insert(*block_id, id);
        } else {
            let spec_id = block.spec_id.trim().to_string();
            if !spec_id.is_empty() {
                node_ids.insert(*block_id, spec_id);
            }
        }
    }

    // Legacy paired ports (no canonical key) are assigned stable pair ids so
    // the projected link schema never exposes the legacy name form.
    let mut legacy_pair_ids: HashMap<String, String> = HashMap::new();
    for block_id in &block_ids {
        let Some(block) = doc.find_item(*block_id).and_then(|i| i.as_block()) else { continue };
        for port in &block.ports {
            if port.name.starts_with(crate::item::LEGACY_PAIR_PREFIX) {
                if let Some(key) = port.paired_key() {
                    legacy_pair_ids.entry(key.to_string()).or_insert_with(|| Uuid::new_v4().to_string());
                }
            }
        }
    }

    let resolve_pair_id = |name: &str, legacy_pair_ids: &HashMap<String, String>| -> Option<String> {
        if let Some(key) = ports::paired_port_key(name) {
            if name.starts_with(crate::item::LEGACY_PAIR_PREFIX) {
                return legacy_pair_ids.get(key).cloned();
            }
            if !key.is_empty() {
                return Some(key.to_string());
            }
        }
        None
    };

    for item in doc.items() {
        let CanvasItem::Wire(wire) = item else { continue };
        let (Endpoint::Attached(a), Endpoint::Attached(b)) = (&wire.a, &wire.b) else { continue };

        let a_meta = doc.get_port(a.item_id, a.port_id);
        let b_meta = doc.get_port(b.item_id, b.port_id);
        let (Some(a_meta), Some(b_meta)) = (a_meta, b_meta) else {
            return Err(CanvasError::Projection("failed to resolve wire ports".to_string()));
        };

        let from_node = node_ids.get(&a.item_id).cloned();
        let to_node = node_ids.get(&b.item_id).cloned();
        let (Some(from_node), Some(to_node)) = (from_node, to_node) else {
            return Err(CanvasError::Projection("wire endpoint missing node id".to_string()));
        };

        let mut from_port = DesignPort { side: PortSide_(a_meta.side), role: PortRole_(a_meta.role), t: a_meta.t, pair_id: None, name: None };
        if let Some(pair_id) = resolve_pair_id(&a_meta.name, &legacy_pair_ids) {
            from_port.pair_id = Some(pair_id);
        } else if !a_meta.name.is_empty() {
            from_port.name = Some(a_meta.name.clone());
        }

        let mut to_port = DesignPort { side: PortSide_(b_meta.side), role: PortRole_(b_meta.role), t: b_meta.t, pair_id: None, name: None };
        if let Some(pair_id) = resolve_pair_id(&b_meta.name, &legacy_pair_ids) {
            to_port.pair_id = Some(pair_id);
        } else if !b_meta.name.is_empty() {
            to_port.name = Some(b_meta.name.clone());
        }

        out.links.push(DesignLink {
            id: wire.id.to_string(),
            from: DesignEndpoint { node_id: from_node, port: from_port },
            to: DesignEndpoint { node_id: to_node, port: to_port },
            route_override: wire.route_override.clone(),
        });
    }

    Ok(out)
}

/// Deletes every wire and link-hub block, and clears ports from every
/// remaining port-carrying block. Per the documented Open Question
/// resolution: a failure partway through `apply_design_state` leaves the
/// canvas in this cleared state; there is no rollback.
fn clear_design_state(doc: &mut Document) {
    let mut wire_and_hub_ids = Vec::new();
    let mut port_block_ids = Vec::new();
    for item in doc.items() {
        match item {
            CanvasItem::Wire(w) => wire_and_hub_ids.push(w.id),
            CanvasItem::Block(b) if b.is_link_hub => wire_and_hub_ids.push(b.id),
            CanvasItem::Block(b) if !b.ports.is_empty() => port_block_ids.push(b.id),
            _ => {}
        }
    }

    if !wire_and_hub_ids.is_empty() {
        let children: Vec<Box<dyn Command>> =
            wire_and_hub_ids.into_iter().map(|id| Box::new(DeleteItemCommand::new(id)) as Box<dyn Command>).collect();
        doc.execute(Box::new(CompositeCommand::new("clear design", children)));
    }

    for id in port_block_ids {
        if let Some(block) = doc.find_item_mut(id).and_then(|i| i.as_block_mut()) {
            block.ports.clear();
        }
    }
}

fn resolve_port_name(port: &DesignPort, legacy_pair_ids: &mut HashMap<String, String>) -> String {
    if let Some(pair_id) = &port.pair_id {
        if !pair_id.is_empty() {
            return ports::paired_port_name(pair_id);
        }
    }
    let Some(name) = &port.name else { return String::new() };
    if name.is_empty() {
        return String::new();
    }
    if name.starts_with(crate::item::LEGACY_PAIR_PREFIX) {
        let Some(key) = ports::paired_port_key(name) else { return String::new() };
        let pair_id = legacy_pair_ids.entry(key.to_string()).or_insert_with(|| Uuid::new_v4().to_string());
        return ports::paired_port_name(pair_id);
    }
    name.clone()
}

/// Applies a `DesignState` onto the canvas: clears the existing design
/// layer, recreates link hubs, and materializes every link (creating ports
/// on demand), then runs the auto-opposite-producer-port rebind pass.
pub fn apply_design_state(state: &DesignState, doc: &mut Document, view: &mut Transform, config: &CanvasConfig) -> CanvasResult<()> {
    clear_design_state(doc);

    if let Some(v) = state.view {
        *view = v;
    }

    let mut node_map: HashMap<String, ObjectId> = HashMap::new();
    let mut node_kinds: HashMap<String, DesignNodeKind> = HashMap::new();

    for item in doc.items() {
        let CanvasItem::Block(b) = item else { continue };
        if b.is_link_hub {
            continue;
        }
        let spec_id = b.spec_id.trim();
        if !spec_id.is_empty() {
            node_map.insert(spec_id.to_string(), b.id);
        }
    }

    for node in &state.nodes {
        node_kinds.insert(node.id.clone(), node.kind);
        if node.kind != DesignNodeKind::LinkHub {
            continue;
        }
        let (Some(bounds), Some(hub_kind)) = (node.bounds, node.hub_kind) else {
            return Err(CanvasError::Projection("link hub missing bounds or kind".to_string()));
        };

        let mut hub = Block::new(ObjectId::create(), bounds, true);
        hub.show_ports = false;
        hub.auto_port_layout = true;
        hub.port_snap_step = config.grid_step;
        hub.is_link_hub = true;
        hub.keepout_margin = 0.0;
        hub.content_padding = Padding { l: 0.0, t: 0.0, r: 0.0, b: 0.0 };
        hub.spec_id = node.id.clone();

        let canvas_kind = hub_kind.to_canvas();
        let colors = match canvas_kind {
            LinkHubKind::Split => &config.style.link_hub_colors.split,
            LinkHubKind::Join => &config.style.link_hub_colors.join,
            LinkHubKind::Broadcast => &config.style.link_hub_colors.broadcast,
        };
        hub.style = Some(crate::item::BlockStyleOverride { outline: Some(colors.outline), fill: Some(colors.fill), label: Some(colors.text) });
        hub.link_hub_kind = Some(canvas_kind);
        hub.content = Some(BlockContent::Symbol {
            symbol: canvas_kind.symbol().to_string(),
            text_color: colors.text,
            point_size: 14.0,
            bold: true,
        });

        let hub_id = hub.id;
        doc.execute(Box::new(CreateItemCommand::new(CanvasItem::Block(hub))));
        node_map.insert(node.id.clone(), hub_id);
    }

    let mut port_map: HashMap<String, HashMap<String, crate::ids::PortId>> = HashMap::new();
    let mut legacy_pair_ids: HashMap<String, String> = HashMap::new();

    let port_key = |port: &DesignPort| -> String {
        let name = port.pair_id.clone().or_else(|| port.name.clone()).unwrap_or_default();
        format!("{:?}|{:?}|{:.6}|{}", port.side.0, port.role.0, port.t, name)
    };

    for link in &state.links {
        let resolve_endpoint = |doc: &mut Document,
                                 endpoint: &DesignEndpoint,
                                 port_map: &mut HashMap<String, HashMap<String, crate::ids::PortId>>,
                                 legacy_pair_ids: &mut HashMap<String, String>|
         -> CanvasResult<PortRef> {
            let item_id = *node_map
                .get(&endpoint.node_id)
                .ok_or_else(|| CanvasError::Projection(format!("unknown node id: {}", endpoint.node_id)))?;

            let key = port_key(&endpoint.port);
            let node_ports = port_map.entry(endpoint.node_id.clone()).or_default();
            if let Some(&port_id) = node_ports.get(&key) {
                return Ok(PortRef { item_id, port_id });
            }

            let name = resolve_port_name(&endpoint.port, legacy_pair_ids);
            let block = doc
                .find_item_mut(item_id)
                .and_then(|i| i.as_block_mut())
                .ok_or_else(|| CanvasError::Projection(format!("node id not a block: {}", endpoint.node_id)))?;
            let port_id = block.add_port(endpoint.port.side.0, endpoint.port.t, endpoint.port.role.0, name);
            port_map.entry(endpoint.node_id.clone()).or_default().insert(key, port_id);
            Ok(PortRef { item_id, port_id })
        };

        let from = resolve_endpoint(doc, &link.from, &mut port_map, &mut legacy_pair_ids)?;
        let to = resolve_endpoint(doc, &link.to, &mut port_map, &mut legacy_pair_ids)?;

        let mut wire = Wire::new(ObjectId::create(), Endpoint::Attached(from), Endpoint::Attached(to));
        wire.route_override = link.route_override.clone();

        let hub_role = |endpoint: &DesignEndpoint| -> Option<PortRole> {
            if node_kinds.get(&endpoint.node_id).copied() != Some(DesignNodeKind::LinkHub) {
                return None;
            }
            Some(endpoint.port.role.0)
        };
        if let Some(role) = hub_role(&link.from).or_else(|| hub_role(&link.to)) {
            wire.color_override = Some(match role {
                PortRole::Producer => config.style.link_hub_colors.producer_side_wire,
                _ => config.style.link_hub_colors.consumer_side_wire,
            });
        }

        doc.execute(Box::new(CreateItemCommand::new(CanvasItem::Wire(wire))));
    }

    rebind_auto_opposite_ports(doc);
    Ok(())
}

/// Post-pass: for every `autoOppositeProducerPort` block, rebind orphan
/// paired producers to matching unkeyed consumers (and vice versa), minting
/// fresh pair keys where two unkeyed ports line up; fall back to
/// `ensureOppositeProducerPort` for anything left unmatched.
fn rebind_auto_opposite_ports(doc: &mut Document) {
    let block_ids: Vec<ObjectId> = doc.items().iter().filter_map(|i| i.as_block()).map(|b| b.id).collect();

    for block_id in block_ids {
        let unkeyed: Vec<(crate::ids::PortId, PortRole, PortSide, f64)> = {
            let Some(block) = doc.find_item(block_id).and_then(|i| i.as_block()) else { continue };
            if !block.auto_opposite_producer_port {
                continue;
            }
            block
                .ports
                .iter()
                .filter(|p| p.paired_key().is_none())
                .map(|p| (p.id, p.role, p.side, p.t))
                .collect()
        };

        let consumers: Vec<_> = unkeyed.iter().filter(|(_, role, ..)| *role == PortRole::Consumer).cloned().collect();
        let producers: Vec<_> = unkeyed.iter().filter(|(_, role, ..)| *role == PortRole::Producer).cloned().collect();

        let mut matched_consumers = std::collections::HashSet::new();
        let mut matched_producers = std::collections::HashSet::new();

        for (consumer_id, _, c_side, c_t) in &consumers {
            for (producer_id, _, p_side, p_t) in &producers {
                if matched_producers.contains(producer_id) {
                    continue;
                }
                if *c_side != p_side.opposite() || (c_t - p_t).abs() > 1e-4 {
                    continue;
                }
                let key = ports::fresh_pair_key();
                let name = ports::paired_port_name(&key);
                if let Some(block) = doc.find_item_mut(block_id).and_then(|i| i.as_block_mut()) {
                    if let Some(cp) = block.port_mut(*consumer_id) {
                        cp.name = name.clone();
                    }
                    if let Some(pp) = block.port_mut(*producer_id) {
                        pp.name = name;
                    }
                }
                matched_consumers.insert(*consumer_id);
                matched_producers.insert(*producer_id);
                break;
            }
        }

        for (consumer_id, ..) in &consumers {
            if !matched_consumers.contains(consumer_id) {
                ports::ensure_opposite_producer_port(doc, block_id, *consumer_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric::Fabric;

    #[test]
    fn round_trip_preserves_attached_link() {
        let mut doc = Document::new(Fabric::new(8.0));
        let a = doc.create_block(Rect::new(0.0, 0.0, 40.0, 40.0), true);
        let b = doc.create_block(Rect::new(200.0, 0.0, 40.0, 40.0), true);
        doc.find_item_mut(a).unwrap().as_block_mut().unwrap().spec_id = "tile-a".to_string();
        doc.find_item_mut(b).unwrap().as_block_mut().unwrap().spec_id = "tile-b".to_string();
        let pa = doc.find_item_mut(a).unwrap().as_block_mut().unwrap().add_port(PortSide::Right, 0.5, PortRole::Producer, String::new());
        let pb = doc.find_item_mut(b).unwrap().as_block_mut().unwrap().add_port(PortSide::Left, 0.5, PortRole::Consumer, String::new());
        doc.insert_item_raw(CanvasItem::Wire(Wire::new(
            ObjectId::create(),
            Endpoint::Attached(PortRef { item_id: a, port_id: pa }),
            Endpoint::Attached(PortRef { item_id: b, port_id: pb }),
        )));

        let state = build_design_state(&mut doc, None, None).unwrap();
        assert_eq!(state.links.len(), 1);
        assert_eq!(state.links[0].from.node_id, "tile-a");
        assert_eq!(state.links[0].to.node_id, "tile-b");
    }

    #[test]
    fn applying_state_creates_link_hub_with_colored_wire() {
        let mut doc = Document::new(Fabric::new(8.0));
        let tile = doc.create_block(Rect::new(0.0, 0.0, 40.0, 40.0), true);
        doc.find_item_mut(tile).unwrap().as_block_mut().unwrap().spec_id = "tile-a".to_string();

        let state = DesignState {
            metadata: None,
            view: None,
            nodes: vec![DesignNode {
                id: "hub-1".to_string(),
                kind: DesignNodeKind::LinkHub,
                hub_kind: Some(DesignLinkHubKind::Split),
                bounds: Some(Rect::new(100.0, 100.0, 16.0, 16.0)),
            }],
            links: vec![DesignLink {
                id: Uuid::new_v4().to_string(),
                from: DesignEndpoint {
                    node_id: "hub-1".to_string(),
                    port: DesignPort { side: PortSide_(PortSide::Right), role: PortRole_(PortRole::Producer), t: 0.5, pair_id: None, name: None },
                },
                to: DesignEndpoint {
                    node_id: "tile-a".to_string(),
                    port: DesignPort { side: PortSide_(PortSide::Left), role: PortRole_(PortRole::Consumer), t: 0.5, pair_id: None, name: None },
                },
                route_override: Vec::new(),
            }],
        };

        let config = CanvasConfig::default();
        let mut view = Transform::default();
        apply_design_state(&state, &mut doc, &mut view, &config).unwrap();

        let hub_count = doc.items().iter().filter_map(|i| i.as_block()).filter(|b| b.is_link_hub).count();
        assert_eq!(hub_count, 1);
        let wire = doc.items().iter().find_map(|i| i.as_wire()).unwrap();
        assert!(wire.color_override.is_some());
    }
}
