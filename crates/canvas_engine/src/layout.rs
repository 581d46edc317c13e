//! # Layout Engine
//!
//! Auto-arranges a block's ports based on its wires' other endpoints.
//! Grounded on `CanvasLayoutEngine.cpp`: `sideFromDelta`, `collectPortGroups`,
//! `resizeBlockForPorts`, `layoutPortsOnSide`.

use std::collections::HashMap;

use glam::DVec2;

use crate::document::Document;
use crate::geometry;
use crate::ids::ObjectId;
use crate::item::{CanvasItem, PortSide};

struct PortConn {
    port_id: crate::ids::PortId,
    sort_key: f64,
}

/// Classifies the direction from `center` to `target` into one of four
/// sides using `|dx| >= |dy|` for horizontal choice.
fn side_from_delta(center: DVec2, target: DVec2) -> PortSide {
    let dx = target.x - center.x;
    let dy = target.y - center.y;
    if dx.abs() >= dy.abs() {
        if dx >= 0.0 { PortSide::Right } else { PortSide::Left }
    } else if dy >= 0.0 {
        PortSide::Bottom
    } else {
        PortSide::Top
    }
}

/// Runs the auto-port layout pass across every block with
/// `auto_port_layout = true`. Returns whether any block moved/resized.
pub fn arrange_auto_ports(doc: &mut Document) -> bool {
    let block_ids: Vec<ObjectId> = doc
        .items()
        .iter()
        .filter_map(|i| i.as_block())
        .filter(|b| b.auto_port_layout)
        .map(|b| b.id)
        .collect();

    let mut moved = false;
    for block_id in block_ids {
        if arrange_block(doc, block_id) {
            moved = true;
        }
    }
    moved
}

fn other_endpoint_target(doc: &Document, block_id: ObjectId, wire: &crate::item::Wire) -> Option<DVec2> {
    use crate::item::Endpoint;
    let (mine, other) = if wire_endpoint_is_mine(&wire.a, block_id) {
        (&wire.a, &wire.b)
    } else if wire_endpoint_is_mine(&wire.b, block_id) {
        (&wire.b, &wire.a)
    } else {
        return None;
    };
    let _ = mine;

    match other {
        Endpoint::Attached(r) => {
            let item = doc.find_item(r.item_id)?;
            let block = item.as_block()?;
            let port = block.port(r.port_id)?;
            Some(port.anchor_scene(block.bounds, block.port_snap_step))
        }
        Endpoint::Free(p) => Some(*p),
    }
}

fn wire_endpoint_is_mine(ep: &crate::item::Endpoint, block_id: ObjectId) -> bool {
    matches!(ep, crate::item::Endpoint::Attached(r) if r.item_id == block_id)
}

fn arrange_block(doc: &mut Document, block_id: ObjectId) -> bool {
    let center = {
        let block = doc.find_item(block_id).and_then(|i| i.as_block());
        let Some(block) = block else { return false };
        DVec2::new(
            block.bounds.left() + block.bounds.w / 2.0,
            block.bounds.top() + block.bounds.h / 2.0,
        )
    };

    let mut groups: HashMap<PortSide, Vec<PortConn>> = HashMap::new();

    let wire_ids: Vec<ObjectId> = doc
        .items()
        .iter()
        .filter_map(CanvasItem::as_wire)
        .filter(|w| {
            let a_mine = wire_endpoint_is_mine(&w.a, block_id);
            let b_mine = wire_endpoint_is_mine(&w.b, block_id);
            (a_mine || b_mine) && !(a_mine && b_mine)
        })
        .map(|w| w.id)
        .collect();

    for wire_id in &wire_ids {
        let wire = doc.find_item(*wire_id).and_then(|i| i.as_wire()).cloned();
        let Some(wire) = wire else { continue };
        let Some(target) = other_endpoint_target(doc, block_id, &wire) else { continue };
        let side = side_from_delta(center, target);

        let sort_key = if side.is_horizontal() { target.y } else { target.x };

        let block = doc.find_item(block_id).and_then(|i| i.as_block());
        let Some(block) = block else { continue };
        let port_id = block
            .ports
            .iter()
            .find(|p| {
                let is_a = matches!(&wire.a, crate::item::Endpoint::Attached(r) if r.item_id == block_id && r.port_id == p.id);
                let is_b = matches!(&wire.b, crate::item::Endpoint::Attached(r) if r.item_id == block_id && r.port_id == p.id);
                is_a || is_b
            })
            .map(|p| p.id);
        let Some(port_id) = port_id else { continue };

        groups.entry(side).or_default().push(PortConn { port_id, sort_key });
    }

    if groups.is_empty() {
        return false;
    }

    let max_count = groups.values().map(Vec::len).max().unwrap_or(0);
    let step = doc.fabric.step;

    let (old_bounds, resized) = {
        let block = doc.find_item(block_id).and_then(|i| i.as_block()).unwrap();
        let old = block.bounds;
        let needed_side = step * (max_count as f64 + 1.0);
        let size = old.w.max(old.h).max(needed_side);
        let size = geometry::snap_size_up(size, step);
        let cx = old.left() + old.w / 2.0;
        let cy = old.top() + old.h / 2.0;
        let new_bounds = geometry::Rect::new(
            geometry::snap_coord(cx - size / 2.0, step),
            geometry::snap_coord(cy - size / 2.0, step),
            size,
            size,
        );
        (old, new_bounds != old)
    };

    if resized {
        let block = doc.find_item_mut(block_id).and_then(|i| i.as_block_mut()).unwrap();
        let needed_side = step * (max_count as f64 + 1.0);
        let size = old_bounds.w.max(old_bounds.h).max(needed_side);
        let size = geometry::snap_size_up(size, step);
        let cx = old_bounds.left() + old_bounds.w / 2.0;
        let cy = old_bounds.top() + old_bounds.h / 2.0;
        block.bounds = geometry::Rect::new(
            geometry::snap_coord(cx - size / 2.0, step),
            geometry::snap_coord(cy - size / 2.0, step),
            size,
            size,
        );

        for wire_id in &wire_ids {
            if let Some(w) = doc.find_item_mut(*wire_id).and_then(|i| i.as_wire_mut()) {
                w.clear_route_override();
            }
        }
    }

    for (side, mut conns) in groups {
        conns.sort_by(|a, b| a.sort_key.partial_cmp(&b.sort_key).unwrap());
        let bounds = doc.find_item(block_id).and_then(|i| i.as_block()).unwrap().bounds;
        let axis_len = if side.is_horizontal() { bounds.h } else { bounds.w };

        let block = doc.find_item_mut(block_id).and_then(|i| i.as_block_mut()).unwrap();
        for (i, conn) in conns.iter().enumerate() {
            let offset = step * (i as f64 + 1.0);
            let t = (offset / axis_len).clamp(0.0, 1.0);
            if let Some(p) = block.port_mut(conn.port_id) {
                p.side = side;
                p.t = t;
            }
        }
    }

    true
}
