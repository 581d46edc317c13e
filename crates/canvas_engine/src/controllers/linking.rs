//! Linking Controller — Normal, Split, Join, Broadcast modes, including hub
//! insertion.

use glam::DVec2;

use crate::commands::{Command, CreateItemCommand};
use crate::config::CanvasConfig;
use crate::document::Document;
use crate::geometry::{self, Rect};
use crate::ids::{ObjectId, PortId};
use crate::item::{
    ArrowPolicy, Block, CanvasItem, Endpoint, LinkHubKind, PortRef, PortRole, Wire,
};
use crate::ports;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkingMode {
    Normal,
    Split,
    Join,
    Broadcast,
}

pub struct LinkingController {
    pub mode: LinkingMode,
    pending: Option<PortRef>,
    /// The hub block anchoring the current chain, if any. Set once a hub is
    /// created and kept across subsequent clicks so they chain onto it
    /// instead of minting a new hub each time.
    active_hub: Option<ObjectId>,
}

impl Default for LinkingController {
    fn default() -> Self {
        Self { mode: LinkingMode::Normal, pending: None, active_hub: None }
    }
}

impl LinkingController {
    pub fn set_mode(&mut self, mode: LinkingMode) {
        self.mode = mode;
        self.pending = None;
        self.active_hub = None;
    }

    pub fn escape(&mut self) {
        self.pending = None;
        self.active_hub = None;
    }

    /// Handles a click on `target` (an existing port, or `None` meaning a
    /// free block-edge point where a port should be minted first).
    pub fn on_click_port(&mut self, doc: &mut Document, target: PortRef, style: &crate::config::LinkHubColors) {
        match self.pending.take() {
            None => {
                self.pending = Some(target);
            }
            Some(start) => {
                if start == target {
                    self.pending = Some(start);
                    return;
                }
                match self.mode {
                    LinkingMode::Normal => {
                        create_direct_wire(doc, start, target);
                        self.pending = None;
                    }
                    LinkingMode::Split | LinkingMode::Join | LinkingMode::Broadcast => {
                        if let Some(hub_id) = self.active_hub.filter(|&id| doc.find_item(id).is_some()) {
                            if target.item_id == hub_id {
                                // Clicking back on the hub itself just keeps the chain open.
                                self.pending = Some(start);
                                return;
                            }
                            if let Some(new_hub_port) = connect_to_existing_hub(doc, hub_id, target, self.mode, style) {
                                self.pending = Some(PortRef { item_id: hub_id, port_id: new_hub_port });
                            } else {
                                self.pending = None;
                                self.active_hub = None;
                            }
                        } else {
                            let kind = match self.mode {
                                LinkingMode::Split => LinkHubKind::Split,
                                LinkingMode::Join => LinkHubKind::Join,
                                LinkingMode::Broadcast => LinkHubKind::Broadcast,
                                LinkingMode::Normal => unreachable!(),
                            };
                            let (hub_id, hub_port_b) = create_hub_link(doc, start, target, kind, self.mode, style);
                            self.active_hub = Some(hub_id);
                            self.pending = Some(PortRef { item_id: hub_id, port_id: hub_port_b });
                        }
                    }
                }
            }
        }
    }
}

fn is_producer_side(doc: &Document, port_ref: PortRef) -> bool {
    doc.get_port(port_ref.item_id, port_ref.port_id)
        .map(|p| p.role == PortRole::Producer)
        .unwrap_or(false)
}

/// The role a chain's *first* wire plays, derived from the linking mode: a
/// Join hub gathers consumers in, every other hub kind fans a producer out.
fn start_wire_role(mode: LinkingMode) -> PortRole {
    if mode == LinkingMode::Join {
        PortRole::Consumer
    } else {
        PortRole::Producer
    }
}

/// The role a chain's *subsequent* wires play; the complement of `start_wire_role`.
fn finish_wire_role(mode: LinkingMode) -> PortRole {
    if mode == LinkingMode::Join {
        PortRole::Producer
    } else {
        PortRole::Consumer
    }
}

fn opposite_port_role(role: PortRole) -> PortRole {
    if role == PortRole::Producer {
        PortRole::Consumer
    } else {
        PortRole::Producer
    }
}

fn wire_color_for_role(role: PortRole, style: &crate::config::LinkHubColors) -> glam::Vec4 {
    if role == PortRole::Producer {
        style.producer_side_wire
    } else {
        style.consumer_side_wire
    }
}

fn create_direct_wire(doc: &mut Document, a: PortRef, b: PortRef) {
    let mut wire = Wire::new(ObjectId::create(), Endpoint::Attached(a), Endpoint::Attached(b));

    let a_is_hub = doc.find_item(a.item_id).and_then(|i| i.as_block()).map(|b| b.is_link_hub).unwrap_or(false);
    let b_is_hub = doc.find_item(b.item_id).and_then(|i| i.as_block()).map(|b| b.is_link_hub).unwrap_or(false);
    if a_is_hub || b_is_hub {
        wire.color_override = Some(if is_producer_side(doc, a) {
            glam::Vec4::new(0.85, 0.15, 0.15, 1.0)
        } else {
            glam::Vec4::new(0.15, 0.75, 0.25, 1.0)
        });
        wire.arrow_policy = ArrowPolicy::End;
    }

    doc.execute(Box::new(CreateItemCommand::new(CanvasItem::Wire(wire))));
}

/// Creates a link hub between `start` and `end`, wiring role and arrow
/// policy from the linking `mode` rather than from the clicked ports'
/// actual roles, matching how a Join hub's first wire always points
/// *into* the hub regardless of what the user happened to click.
/// Returns the new hub's id and its second (`end`-facing) port, which the
/// caller anchors the chain on for subsequent clicks.
fn create_hub_link(doc: &mut Document, start: PortRef, end: PortRef, kind: LinkHubKind, mode: LinkingMode, style: &crate::config::LinkHubColors) -> (ObjectId, PortId) {
    let step = doc.fabric.step;
    let start_anchor = doc
        .get_port(start.item_id, start.port_id)
        .and_then(|p| doc.find_item(start.item_id).and_then(|i| i.as_block()).map(|b| p.anchor_scene(b.bounds, b.port_snap_step)))
        .unwrap_or(DVec2::ZERO);
    let end_anchor = doc
        .get_port(end.item_id, end.port_id)
        .and_then(|p| doc.find_item(end.item_id).and_then(|i| i.as_block()).map(|b| p.anchor_scene(b.bounds, b.port_snap_step)))
        .unwrap_or(DVec2::ZERO);

    let mid = geometry::snap_point_to_grid((start_anchor + end_anchor) / 2.0, step);
    let hub_size = 2.0 * step;
    let hub_bounds = Rect::new(mid.x - hub_size / 2.0, mid.y - hub_size / 2.0, hub_size, hub_size);

    let mut hub = Block::new(ObjectId::create(), geometry::snap_bounds_to_grid(hub_bounds, step), true);
    hub.is_link_hub = true;
    hub.link_hub_kind = Some(kind);
    hub.label = kind.symbol().to_string();
    let colors = match kind {
        LinkHubKind::Split => &style.split,
        LinkHubKind::Join => &style.join,
        LinkHubKind::Broadcast => &style.broadcast,
    };
    hub.style = Some(crate::item::BlockStyleOverride {
        outline: Some(colors.outline),
        fill: Some(colors.fill),
        label: Some(colors.text),
    });

    let start_role = start_wire_role(mode);
    let finish_role = finish_wire_role(mode);
    let hub_port_a_role = opposite_port_role(start_role);
    let hub_port_b_role = opposite_port_role(finish_role);

    let hub_port_a = hub.add_port(crate::item::PortSide::Left, 0.5, hub_port_a_role, String::new());
    let hub_port_b = hub.add_port(crate::item::PortSide::Right, 0.5, hub_port_b_role, String::new());
    let hub_id = hub.id;

    doc.execute(Box::new(CreateItemCommand::new(CanvasItem::Block(hub))));

    let mut wire_a = Wire::new(
        ObjectId::create(),
        Endpoint::Attached(start),
        Endpoint::Attached(PortRef { item_id: hub_id, port_id: hub_port_a }),
    );
    wire_a.color_override = Some(wire_color_for_role(start_role, style));
    wire_a.arrow_policy = if start_role == PortRole::Consumer { ArrowPolicy::Start } else { ArrowPolicy::None };

    let mut wire_b = Wire::new(
        ObjectId::create(),
        Endpoint::Attached(PortRef { item_id: hub_id, port_id: hub_port_b }),
        Endpoint::Attached(end),
    );
    wire_b.color_override = Some(wire_color_for_role(finish_role, style));
    wire_b.arrow_policy = if finish_role == PortRole::Consumer { ArrowPolicy::End } else { ArrowPolicy::None };

    doc.execute(Box::new(CreateItemCommand::new(CanvasItem::Wire(wire_a))));
    doc.execute(Box::new(CreateItemCommand::new(CanvasItem::Wire(wire_b))));

    ports::ensure_opposite_producer_port(doc, end.item_id, end.port_id);

    (hub_id, hub_port_b)
}

/// Wires a new chain endpoint onto the hub already anchoring this session,
/// minting a fresh hub port toward `target` rather than creating another
/// hub block. Returns the new hub port so the caller can keep chaining.
fn connect_to_existing_hub(doc: &mut Document, hub_id: ObjectId, target: PortRef, mode: LinkingMode, style: &crate::config::LinkHubColors) -> Option<PortId> {
    let target_anchor = doc
        .get_port(target.item_id, target.port_id)
        .and_then(|p| doc.find_item(target.item_id).and_then(|i| i.as_block()).map(|b| p.anchor_scene(b.bounds, b.port_snap_step)))?;

    let finish_role = finish_wire_role(mode);
    let new_port_role = opposite_port_role(finish_role);
    let new_hub_port = doc
        .find_item_mut(hub_id)
        .and_then(|i| i.as_block_mut())
        .map(|hub| hub.add_port_toward(target_anchor, new_port_role, String::new()))?;

    let mut wire = Wire::new(
        ObjectId::create(),
        Endpoint::Attached(PortRef { item_id: hub_id, port_id: new_hub_port }),
        Endpoint::Attached(target),
    );
    wire.color_override = Some(wire_color_for_role(finish_role, style));
    wire.arrow_policy = if finish_role == PortRole::Consumer { ArrowPolicy::End } else { ArrowPolicy::None };
    doc.execute(Box::new(CreateItemCommand::new(CanvasItem::Wire(wire))));

    ports::ensure_opposite_producer_port(doc, target.item_id, target.port_id);

    Some(new_hub_port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanvasConfig;
    use crate::fabric::Fabric;

    fn make_block_with_port(doc: &mut Document, x: f64, role: PortRole) -> PortRef {
        let id = doc.create_block(Rect::new(x, 0.0, 40.0, 40.0), true);
        let port_id = doc
            .find_item_mut(id)
            .unwrap()
            .as_block_mut()
            .unwrap()
            .add_port(crate::item::PortSide::Right, 0.5, role, String::new());
        PortRef { item_id: id, port_id }
    }

    #[test]
    fn split_mode_creates_hub_with_two_wires() {
        let mut doc = Document::new(Fabric::new(8.0));
        let a = make_block_with_port(&mut doc, 0.0, PortRole::Producer);
        let b = make_block_with_port(&mut doc, 200.0, PortRole::Consumer);

        let mut ctrl = LinkingController::default();
        ctrl.set_mode(LinkingMode::Split);
        let style = CanvasConfig::default().style.link_hub_colors;

        ctrl.on_click_port(&mut doc, a, &style);
        ctrl.on_click_port(&mut doc, b, &style);

        let hubs: Vec<_> = doc.items().iter().filter_map(|i| i.as_block()).filter(|blk| blk.is_link_hub).collect();
        assert_eq!(hubs.len(), 1);
        let wires: Vec<_> = doc.items().iter().filter_map(|i| i.as_wire()).collect();
        assert_eq!(wires.len(), 2);
    }

    #[test]
    fn join_mode_first_wire_gets_start_arrow_policy() {
        let mut doc = Document::new(Fabric::new(8.0));
        let a = make_block_with_port(&mut doc, 0.0, PortRole::Producer);
        let b = make_block_with_port(&mut doc, 200.0, PortRole::Producer);

        let mut ctrl = LinkingController::default();
        ctrl.set_mode(LinkingMode::Join);
        let style = CanvasConfig::default().style.link_hub_colors;

        ctrl.on_click_port(&mut doc, a, &style);
        ctrl.on_click_port(&mut doc, b, &style);

        let wires: Vec<_> = doc.items().iter().filter_map(|i| i.as_wire()).collect();
        assert_eq!(wires.len(), 2);
        assert!(
            wires.iter().any(|w| w.arrow_policy == ArrowPolicy::Start),
            "a Join hub's first wire must point into the hub"
        );
    }

    #[test]
    fn subsequent_clicks_chain_onto_the_same_hub() {
        let mut doc = Document::new(Fabric::new(8.0));
        let a = make_block_with_port(&mut doc, 0.0, PortRole::Producer);
        let b = make_block_with_port(&mut doc, 200.0, PortRole::Consumer);
        let c = make_block_with_port(&mut doc, 400.0, PortRole::Consumer);

        let mut ctrl = LinkingController::default();
        ctrl.set_mode(LinkingMode::Split);
        let style = CanvasConfig::default().style.link_hub_colors;

        ctrl.on_click_port(&mut doc, a, &style);
        ctrl.on_click_port(&mut doc, b, &style);

        let hubs_after_first: Vec<_> = doc.items().iter().filter_map(|i| i.as_block()).filter(|blk| blk.is_link_hub).collect();
        assert_eq!(hubs_after_first.len(), 1);
        let hub_id = hubs_after_first[0].id;

        // Third click targets a new port; it should chain off the existing
        // hub instead of creating a second one.
        ctrl.on_click_port(&mut doc, c, &style);

        let hubs_after_second: Vec<_> = doc.items().iter().filter_map(|i| i.as_block()).filter(|blk| blk.is_link_hub).collect();
        assert_eq!(hubs_after_second.len(), 1, "a third click must not mint a second hub");
        assert_eq!(hubs_after_second[0].id, hub_id);

        let wires: Vec<_> = doc.items().iter().filter_map(|i| i.as_wire()).collect();
        assert_eq!(wires.len(), 3, "the chained wire must still be created");
    }
}
