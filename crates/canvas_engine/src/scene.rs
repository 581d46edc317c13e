//! # Scene (render projection)
//!
//! Stateless read-only helper: given the Document and view state, renders
//! background, fabric points, items, then overlays. The scene is the only
//! consumer of the router's resolved scene path for drawing, mirroring the
//! teacher's `Painter::draw_graph` pass structure (grid, then edges behind
//! nodes, then nodes, then interaction overlays).

use glam::{DVec2, Vec4};

use crate::config::CanvasConfig;
use crate::document::Document;
use crate::item::{CanvasItem, Endpoint, PortRef};
use crate::render::{DrawCommand, RenderList};
use crate::router::{RenderContext, WireRouter};
use crate::view::View;

/// Hover/selection/linking state fed into the scene by the host; cached by
/// the host and invalidated whenever `Document::take_changed` returns true.
#[derive(Clone, Debug, Default)]
pub struct SceneOverlayState {
    pub hovered_port: Option<PortRef>,
    pub hovered_edge: Option<(crate::ids::ObjectId, crate::item::PortSide)>,
    pub selected_items: std::collections::HashSet<crate::ids::ObjectId>,
    pub marquee_rect: Option<crate::geometry::Rect>,
    pub linking_preview: Option<(DVec2, DVec2)>,
}

/// Adapts a `Document` + `View` pair as a `RenderContext` for the router.
pub struct DocumentRenderContext<'a> {
    pub doc: &'a Document,
    pub view: &'a View,
}

impl<'a> RenderContext for DocumentRenderContext<'a> {
    fn fabric_step(&self) -> f64 {
        self.doc.fabric.step
    }

    fn fabric_blocked(&self, coord: crate::ids::FabricCoord) -> bool {
        self.doc.is_fabric_point_blocked(coord)
    }

    fn visible_scene_rect(&self) -> Option<crate::geometry::Rect> {
        Some(self.view.visible_scene_rect())
    }
}

/// Builds the full display list for one frame.
pub fn draw_scene(doc: &mut Document, view: &View, config: &CanvasConfig, overlay: &SceneOverlayState) -> RenderList {
    let mut list = Vec::new();

    draw_background(view, config, &mut list);
    draw_fabric_points(doc, view, config, &mut list);

    // Wires first (beneath blocks), then blocks, following painter's-algorithm
    // z-order by item insertion index.
    for item in doc.items() {
        if let CanvasItem::Wire(_) = item {
            draw_wire(doc, view, config, item, &mut list);
        }
    }
    for item in doc.items() {
        if let CanvasItem::Block(b) = item {
            draw_block(view, config, b, overlay, &mut list);
        }
    }

    draw_overlays(doc, view, config, overlay, &mut list);
    list
}

fn draw_background(view: &View, config: &CanvasConfig, list: &mut RenderList) {
    list.push(DrawCommand::Rect {
        pos: DVec2::ZERO,
        size: view.viewport_size,
        color: config.style.background_color,
        corner_radius: 0.0,
        stroke_width: 0.0,
        stroke_color: None,
    });
}

fn draw_fabric_points(doc: &Document, view: &View, config: &CanvasConfig, list: &mut RenderList) {
    let stride = doc.fabric.draw_stride(view.transform.zoom);
    let rect = view.visible_scene_rect();
    let step = doc.fabric.step * stride as f64;
    let start_x = (rect.left() / step).floor() * step;
    let start_y = (rect.top() / step).floor() * step;

    let mut y = start_y;
    while y <= rect.bottom() {
        let mut x = start_x;
        while x <= rect.right() {
            let scene = DVec2::new(x, y);
            if !doc.is_fabric_point_blocked(doc.fabric.to_coord(scene)) {
                list.push(DrawCommand::Circle {
                    center: view.scene_to_view(scene),
                    radius: 1.0,
                    color: config.style.grid_color,
                });
            }
            x += step;
        }
        y += step;
    }
}

fn draw_wire(doc: &Document, view: &View, config: &CanvasConfig, item: &CanvasItem, list: &mut RenderList) {
    let CanvasItem::Wire(wire) = item else { return };
    let endpoint_scene = |ep: &Endpoint| -> Option<DVec2> {
        match ep {
            Endpoint::Free(p) => Some(*p),
            Endpoint::Attached(r) => doc
                .find_item(r.item_id)
                .and_then(|i| i.as_block())
                .and_then(|b| b.port(r.port_id).map(|p| p.anchor_scene(b.bounds, b.port_snap_step))),
        }
    };
    let Some(a) = endpoint_scene(&wire.a) else { return };
    let Some(b) = endpoint_scene(&wire.b) else { return };

    let color = wire.color_override.unwrap_or(config.style.wire_default.color);
    let width = config.style.wire_default.width;

    let ctx = DocumentRenderContext { doc, view };
    let router = WireRouter::new(&ctx);
    let scene_points = router.route_with_override(&wire.route_override, a, b);

    let view_points: Vec<DVec2> = scene_points.iter().map(|p| view.scene_to_view(*p)).collect();
    list.push(DrawCommand::Polyline {
        points: view_points,
        color,
        width,
        arrow_at_start: wire.arrow_policy == crate::item::ArrowPolicy::Start,
        arrow_at_end: wire.arrow_policy == crate::item::ArrowPolicy::End,
    });
}

fn draw_block(
    view: &View,
    config: &CanvasConfig,
    block: &crate::item::Block,
    overlay: &SceneOverlayState,
    list: &mut RenderList,
) {
    let style = block.style.as_ref();
    let base = &config.style.block_default;
    let fill = style.and_then(|s| s.fill).unwrap_or(base.fill);
    let outline = style.and_then(|s| s.outline).unwrap_or(base.outline);
    let label_color = style.and_then(|s| s.label).unwrap_or(base.label);

    let selected = overlay.selected_items.contains(&block.id);
    let (fill, outline, stroke_width) = if selected {
        (fill * 1.15, outline * 1.4, 2.0)
    } else {
        (fill, outline, 1.0)
    };

    let pos = view.scene_to_view(block.bounds.top_left());
    let size = block.bounds.size() * view.transform.zoom;

    list.push(DrawCommand::Rect {
        pos,
        size,
        color: fill,
        corner_radius: block.corner_radius * view.transform.zoom,
        stroke_width,
        stroke_color: Some(outline),
    });

    if !block.label.is_empty() {
        list.push(DrawCommand::Text {
            pos: pos + DVec2::new(4.0, 4.0),
            text: block.label.clone(),
            color: label_color,
            size: 12.0,
        });
    }

    if block.show_ports {
        for port in &block.ports {
            let anchor = port.anchor_scene(block.bounds, block.port_snap_step);
            let hovered = overlay.hovered_port.map(|r| r.port_id == port.id && r.item_id == block.id).unwrap_or(false);
            let color = if hovered { config.style.port_color * 1.3 } else { config.style.port_color };
            list.push(DrawCommand::Circle {
                center: view.scene_to_view(anchor),
                radius: 4.0 * view.transform.zoom,
                color,
            });
            if block.show_port_labels && !port.name.is_empty() {
                list.push(DrawCommand::Text {
                    pos: view.scene_to_view(anchor) + DVec2::new(6.0, -6.0),
                    text: port.name.clone(),
                    color: label_color,
                    size: 10.0,
                });
            }
        }
    }
}

fn draw_overlays(doc: &Document, view: &View, config: &CanvasConfig, overlay: &SceneOverlayState, list: &mut RenderList) {
    if let Some(rect) = overlay.marquee_rect {
        list.push(DrawCommand::Rect {
            pos: view.scene_to_view(rect.top_left()),
            size: rect.size() * view.transform.zoom,
            color: config.style.selection_box_color,
            corner_radius: 0.0,
            stroke_width: 1.0,
            stroke_color: Some(config.style.selection_box_border_color),
        });
    }

    if let Some((start, end)) = overlay.linking_preview {
        list.push(DrawCommand::Line {
            start: view.scene_to_view(start),
            end: view.scene_to_view(end),
            color: Vec4::new(1.0, 1.0, 1.0, 0.8),
            width: 2.0,
        });
    }

    if let Some((item_id, side)) = overlay.hovered_edge {
        if let Some(block) = doc.find_item(item_id).and_then(|i| i.as_block()) {
            let keepout = block.keepout_rect(doc.fabric.step);
            let (start, end) = match side {
                crate::item::PortSide::Left => (keepout.top_left(), DVec2::new(keepout.left(), keepout.bottom())),
                crate::item::PortSide::Right => (DVec2::new(keepout.right(), keepout.top()), DVec2::new(keepout.right(), keepout.bottom())),
                crate::item::PortSide::Top => (keepout.top_left(), DVec2::new(keepout.right(), keepout.top())),
                crate::item::PortSide::Bottom => (DVec2::new(keepout.left(), keepout.bottom()), DVec2::new(keepout.right(), keepout.bottom())),
            };
            list.push(DrawCommand::Line {
                start: view.scene_to_view(start),
                end: view.scene_to_view(end),
                color: config.style.port_color,
                width: 3.0,
            });
        }
    }
}
