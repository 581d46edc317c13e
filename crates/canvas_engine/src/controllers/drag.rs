//! Drag Controller — three sub-modes, at most one active: endpoint drag
//! (with a pending phase gated by a move threshold), block drag (single or
//! group), and wire-segment drag.

use std::collections::HashMap;

use glam::DVec2;

use crate::commands::{CompositeCommand, Command, MoveItemCommand};
use crate::config::CanvasConfig;
use crate::document::Document;
use crate::geometry;
use crate::ids::{FabricCoord, ObjectId, PortId};
use crate::item::{CanvasItem, Endpoint, PortRef, PortRole, PortSide};
use crate::ports;
use crate::router::{RenderContext, WireRouter};
use crate::selection::Selection;

use super::PointerSample;

pub enum DragMode {
    Idle,
    PendingEndpoint {
        wire_id: ObjectId,
        which_end: WireEnd,
        press: PointerSample,
    },
    EndpointDrag {
        wire_id: ObjectId,
        which_end: WireEnd,
        original: Endpoint,
        hovered_edge: Option<(ObjectId, PortSide)>,
    },
    BlockDrag {
        primary: ObjectId,
        group: Vec<ObjectId>,
        initial_positions: HashMap<ObjectId, DVec2>,
        start_scene: DVec2,
    },
    SegmentDrag {
        wire_id: ObjectId,
        horizontal: bool,
        seg_index: usize,
        start_perp: f64,
        /// The wire's resolved path (auto-routed or overridden) cached at
        /// press time, so dragging works regardless of prior override state.
        path: Vec<FabricCoord>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WireEnd {
    A,
    B,
}

#[derive(Default)]
pub struct DragController {
    pub mode_state: Option<DragMode>,
}

impl DragController {
    /// Begins a press: if near a wire endpoint, enters `PendingEndpoint`;
    /// else if a block is hit, enters `BlockDrag`; else if an internal
    /// wire segment is hit, enters `SegmentDrag`.
    pub fn on_press_endpoint(&mut self, wire_id: ObjectId, which_end: WireEnd, sample: PointerSample) {
        self.mode_state = Some(DragMode::PendingEndpoint { wire_id, which_end, press: sample });
    }

    pub fn on_press_block(
        &mut self,
        block_id: ObjectId,
        selection: &Selection,
        doc: &Document,
        start_scene: DVec2,
    ) {
        let group: Vec<ObjectId> = if selection.is_item_selected(block_id) {
            selection.items().iter().copied().collect()
        } else {
            vec![block_id]
        };

        let mut initial_positions = HashMap::new();
        for id in &group {
            if let Some(b) = doc.find_item(*id).and_then(|i| i.as_block()) {
                if b.movable {
                    initial_positions.insert(*id, b.bounds.top_left());
                }
            }
        }

        self.mode_state = Some(DragMode::BlockDrag {
            primary: block_id,
            group,
            initial_positions,
            start_scene,
        });
    }

    pub fn on_press_segment(&mut self, doc: &Document, wire_id: ObjectId, horizontal: bool, seg_index: usize, start_perp: f64) {
        let path = resolved_path_coords(doc, wire_id);
        self.mode_state = Some(DragMode::SegmentDrag { wire_id, horizontal, seg_index, start_perp, path });
    }

    /// Drives the active mode on pointer move. Returns true if state
    /// advanced (e.g. pending → active endpoint drag).
    pub fn on_move(&mut self, doc: &mut Document, sample: PointerSample, config: &CanvasConfig) {
        match self.mode_state.take() {
            Some(DragMode::PendingEndpoint { wire_id, which_end, press }) => {
                let dist = (sample.view_pos - press.view_pos).length();
                if dist >= config.endpoint_drag_threshold_px {
                    let original = read_endpoint(doc, wire_id, which_end);
                    if let Some(original) = original {
                        set_endpoint(doc, wire_id, which_end, Endpoint::Free(sample.scene_pos));
                        self.mode_state = Some(DragMode::EndpointDrag {
                            wire_id,
                            which_end,
                            original,
                            hovered_edge: None,
                        });
                    }
                } else {
                    self.mode_state = Some(DragMode::PendingEndpoint { wire_id, which_end, press });
                }
            }
            Some(DragMode::EndpointDrag { wire_id, which_end, original, mut hovered_edge }) => {
                let snapped = geometry::snap_point_to_grid(sample.scene_pos, doc.fabric.step);
                set_endpoint(doc, wire_id, which_end, Endpoint::Free(snapped));
                hovered_edge = hovered_edge_at(doc, sample.scene_pos, config.edge_hover_radius_px);
                self.mode_state = Some(DragMode::EndpointDrag { wire_id, which_end, original, hovered_edge });
            }
            Some(DragMode::BlockDrag { primary, group, initial_positions, start_scene }) => {
                let delta = geometry::snap_point_to_grid(sample.scene_pos, doc.fabric.step)
                    - geometry::snap_point_to_grid(start_scene, doc.fabric.step);
                for id in &group {
                    if let Some(&orig) = initial_positions.get(id) {
                        doc.preview_set_item_top_left(*id, orig + delta);
                    }
                }
                self.mode_state = Some(DragMode::BlockDrag { primary, group, initial_positions, start_scene });
            }
            Some(DragMode::SegmentDrag { wire_id, horizontal, seg_index, start_perp, mut path }) => {
                let step = doc.fabric.step;
                let new_perp = if horizontal { sample.scene_pos.y } else { sample.scene_pos.x };
                let snapped = geometry::snap_coord(new_perp, step);
                apply_segment_drag(doc, wire_id, horizontal, seg_index, snapped, &mut path);
                self.mode_state = Some(DragMode::SegmentDrag { wire_id, horizontal, seg_index, start_perp, path });
            }
            None => {}
        }
    }

    /// Finalizes the active mode on release, issuing commands as needed.
    pub fn on_release(&mut self, doc: &mut Document, release: PointerSample, config: &CanvasConfig) {
        match self.mode_state.take() {
            Some(DragMode::PendingEndpoint { .. }) => {
                // Treated as a port selection by the caller; nothing to commit here.
            }
            Some(DragMode::EndpointDrag { wire_id, which_end, original, hovered_edge }) => {
                finish_endpoint_drag(doc, wire_id, which_end, original, hovered_edge, release, config);
            }
            Some(DragMode::BlockDrag { group, initial_positions, .. }) => {
                let mut children: Vec<Box<dyn Command>> = Vec::new();
                for id in &group {
                    if let (Some(from), Some(block)) = (initial_positions.get(id), doc.find_item(*id).and_then(|i| i.as_block())) {
                        let to = block.bounds.top_left();
                        if *from != to {
                            children.push(Box::new(MoveItemCommand { id: *id, from: *from, to }));
                        }
                    }
                }
                if !children.is_empty() {
                    let composite = CompositeCommand::new("move selection", children);
                    doc.execute(Box::new(composite));
                }
            }
            Some(DragMode::SegmentDrag { .. }) => {
                // The route override was already written during on_move;
                // nothing further to commit (route overrides are not part
                // of the undo stack per spec.md §4.9/§4.4).
            }
            None => {}
        }
    }

    pub fn cancel(&mut self, doc: &mut Document) {
        if let Some(DragMode::EndpointDrag { wire_id, which_end, original, .. }) = self.mode_state.take() {
            set_endpoint(doc, wire_id, which_end, original);
        }
    }
}

fn read_endpoint(doc: &Document, wire_id: ObjectId, which: WireEnd) -> Option<Endpoint> {
    let w = doc.find_item(wire_id)?.as_wire()?;
    Some(match which {
        WireEnd::A => w.a,
        WireEnd::B => w.b,
    })
}

fn set_endpoint(doc: &mut Document, wire_id: ObjectId, which: WireEnd, ep: Endpoint) {
    if let Some(w) = doc.find_item_mut(wire_id).and_then(|i| i.as_wire_mut()) {
        match which {
            WireEnd::A => w.a = ep,
            WireEnd::B => w.b = ep,
        }
        w.clear_route_override();
    }
}

fn hovered_edge_at(doc: &Document, scene_pos: DVec2, radius: f64) -> Option<(ObjectId, PortSide)> {
    for item in doc.items() {
        let CanvasItem::Block(b) = item else { continue };
        if let Some(hit) = geometry::edge_hit_for_rect(b.bounds, scene_pos, radius, b.port_snap_step.max(1.0)) {
            return Some((b.id, hit.side));
        }
    }
    None
}

#[allow(clippy::too_many_arguments)]
fn finish_endpoint_drag(
    doc: &mut Document,
    wire_id: ObjectId,
    which_end: WireEnd,
    original: Endpoint,
    hovered_edge: Option<(ObjectId, PortSide)>,
    release: PointerSample,
    config: &CanvasConfig,
) {
    if let Some(port_ref) = doc.hit_test_port(release.scene_pos, config.port_hit_radius_px) {
        let allow_multiple = doc
            .find_item(port_ref.item_id)
            .and_then(|i| i.as_block())
            .map(|b| b.allow_multiple_ports)
            .unwrap_or(false);
        if ports::is_port_available(doc, port_ref.item_id, port_ref.port_id, allow_multiple) {
            set_endpoint(doc, wire_id, which_end, Endpoint::Attached(port_ref));
            ports::ensure_opposite_producer_port(doc, port_ref.item_id, port_ref.port_id);
            return;
        }
    }

    if let Some((block_id, side)) = hovered_edge {
        if let Some(existing_ref) = original.attached_ref() {
            let is_dynamic_unshared = doc
                .get_port(existing_ref.item_id, existing_ref.port_id)
                .map(|p| p.role == PortRole::Dynamic)
                .unwrap_or(false)
                && ports::count_port_attachments(doc, existing_ref.item_id, existing_ref.port_id) <= 1;
            let is_paired_producer = doc
                .get_port(existing_ref.item_id, existing_ref.port_id)
                .map(|p| p.is_paired_producer())
                .unwrap_or(false);

            if is_dynamic_unshared || is_paired_producer {
                if let Some(hit) = geometry::edge_hit_for_rect(
                    doc.find_item(block_id).and_then(|i| i.as_block()).map(|b| b.bounds).unwrap_or(geometry::Rect::new(0.0, 0.0, 0.0, 0.0)),
                    release.scene_pos,
                    config.edge_hover_radius_px,
                    8.0,
                ) {
                    if let Some(port) = doc.get_port_mut(existing_ref.item_id, existing_ref.port_id) {
                        port.side = side;
                        port.t = hit.t;
                    }
                    set_endpoint(doc, wire_id, which_end, Endpoint::Attached(existing_ref));
                    return;
                }
            }
        }

        let new_port_id = doc
            .find_item_mut(block_id)
            .and_then(|i| i.as_block_mut())
            .map(|b| b.add_port_toward(release.scene_pos, PortRole::Dynamic, String::new()));
        if let Some(new_port_id) = new_port_id {
            set_endpoint(doc, wire_id, which_end, Endpoint::Attached(PortRef { item_id: block_id, port_id: new_port_id }));
            return;
        }
    }

    set_endpoint(doc, wire_id, which_end, original);
    cleanup_orphan_dynamic_ports(doc);
}

fn cleanup_orphan_dynamic_ports(doc: &mut Document) {
    let mut to_remove: Vec<(ObjectId, PortId)> = Vec::new();
    let block_ports: Vec<(ObjectId, PortId, PortRole)> = doc
        .items()
        .iter()
        .filter_map(|i| i.as_block())
        .flat_map(|b| b.ports.iter().map(move |p| (b.id, p.id, p.role)))
        .collect();

    for (item_id, port_id, role) in block_ports {
        if role == PortRole::Dynamic && ports::count_port_attachments(doc, item_id, port_id) == 0 {
            to_remove.push((item_id, port_id));
        }
    }

    for (item_id, port_id) in to_remove {
        if let Some(block) = doc.find_item_mut(item_id).and_then(|i| i.as_block_mut()) {
            if let Some(idx) = block.port_index(port_id) {
                block.ports.remove(idx);
            }
        }
    }
}

/// A `RenderContext` backed only by the document (no viewport), used to
/// resolve a wire's current path without needing the render view.
struct DocOnlyContext<'a> {
    doc: &'a Document,
}

impl<'a> RenderContext for DocOnlyContext<'a> {
    fn fabric_step(&self) -> f64 {
        self.doc.fabric.step
    }

    fn fabric_blocked(&self, coord: FabricCoord) -> bool {
        self.doc.is_fabric_point_blocked(coord)
    }

    fn visible_scene_rect(&self) -> Option<crate::geometry::Rect> {
        None
    }
}

fn endpoint_scene(doc: &Document, ep: &Endpoint) -> Option<DVec2> {
    match ep {
        Endpoint::Free(p) => Some(*p),
        Endpoint::Attached(r) => doc
            .find_item(r.item_id)
            .and_then(|i| i.as_block())
            .and_then(|b| b.port(r.port_id).map(|p| p.anchor_scene(b.bounds, b.port_snap_step))),
    }
}

/// The wire's currently-resolved path (honoring any existing route
/// override, or the auto-routed path otherwise), converted to fabric
/// coords. This is what a segment drag pivots around, regardless of
/// whether the wire has ever had a manual override before.
fn resolved_path_coords(doc: &Document, wire_id: ObjectId) -> Vec<FabricCoord> {
    let step = doc.fabric.step;
    if step <= 0.0 {
        return Vec::new();
    }
    let Some(wire) = doc.find_item(wire_id).and_then(|i| i.as_wire()) else { return Vec::new() };
    let (Some(a), Some(b)) = (endpoint_scene(doc, &wire.a), endpoint_scene(doc, &wire.b)) else {
        return Vec::new();
    };

    let ctx = DocOnlyContext { doc };
    let router = WireRouter::new(&ctx);
    let scene_path = router.route_with_override(&wire.route_override, a, b);
    scene_path.iter().map(|p| geometry::to_fabric_coord(*p, step)).collect()
}

fn apply_segment_drag(doc: &mut Document, wire_id: ObjectId, horizontal: bool, seg_index: usize, new_perp: f64, path: &mut Vec<FabricCoord>) {
    let step = doc.fabric.step;
    if path.len() < 2 || seg_index + 1 >= path.len() {
        return;
    }

    let mut coord = if horizontal {
        (new_perp / step).round() as i32
    } else {
        (new_perp / step).round() as i32
    };

    let span_a = path[seg_index];
    let span_b = path[seg_index + 1];
    let lo = if horizontal { span_a.x.min(span_b.x) } else { span_a.y.min(span_b.y) };
    let hi = if horizontal { span_a.x.max(span_b.x) } else { span_a.y.max(span_b.y) };

    let blocked_over_span = |c: i32| -> bool {
        for v in lo..=hi {
            let coord = if horizontal { FabricCoord::new(v, c) } else { FabricCoord::new(c, v) };
            if doc.is_fabric_point_blocked(coord) {
                return true;
            }
        }
        false
    };

    if blocked_over_span(coord) {
        let mut shifted = None;
        for delta in 1..=64 {
            if !blocked_over_span(coord + delta) {
                shifted = Some(coord + delta);
                break;
            }
            if !blocked_over_span(coord - delta) {
                shifted = Some(coord - delta);
                break;
            }
        }
        if let Some(s) = shifted {
            coord = s;
        }
    }

    if horizontal {
        path[seg_index].y = coord;
        path[seg_index + 1].y = coord;
    } else {
        path[seg_index].x = coord;
        path[seg_index + 1].x = coord;
    }

    if let Some(w) = doc.find_item_mut(wire_id).and_then(|i| i.as_wire_mut()) {
        w.route_override = path.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric::Fabric;
    use crate::geometry::Rect;
    use crate::item::{CanvasItem, Wire};

    #[test]
    fn segment_drag_works_on_a_never_overridden_wire() {
        let mut doc = Document::new(Fabric::new(8.0));
        let a = doc.create_block(Rect::new(0.0, 0.0, 40.0, 40.0), true);
        let b = doc.create_block(Rect::new(200.0, 0.0, 40.0, 40.0), true);
        let pa = doc.find_item_mut(a).unwrap().as_block_mut().unwrap().add_port(PortSide::Right, 0.5, PortRole::Producer, String::new());
        let pb = doc.find_item_mut(b).unwrap().as_block_mut().unwrap().add_port(PortSide::Left, 0.5, PortRole::Consumer, String::new());
        let wire_id = ObjectId::create();
        doc.insert_item_raw(CanvasItem::Wire(Wire::new(
            wire_id,
            Endpoint::Attached(PortRef { item_id: a, port_id: pa }),
            Endpoint::Attached(PortRef { item_id: b, port_id: pb }),
        )));

        assert!(doc.find_item(wire_id).unwrap().as_wire().unwrap().route_override.is_empty());

        let path = resolved_path_coords(&doc, wire_id);
        assert!(path.len() >= 2, "a routed wire between unaligned ports must have a multi-point path");

        let mut ctrl = DragController::default();
        ctrl.on_press_segment(&doc, wire_id, true, 0, path[0].y as f64 * 8.0);

        let config = CanvasConfig::default();
        ctrl.on_move(&mut doc, PointerSample { view_pos: DVec2::ZERO, scene_pos: DVec2::new(50.0, 100.0) }, &config);

        let wire = doc.find_item(wire_id).unwrap().as_wire().unwrap();
        assert!(!wire.route_override.is_empty(), "segment drag must seed a route override even without a prior one");
    }
}
