//! Selection Controller: click / ctrl-click / shift-click / marquee.

use glam::DVec2;

use crate::config::CanvasConfig;
use crate::document::Document;
use crate::geometry::Rect;
use crate::item::PortRef;
use crate::selection::Selection;

use super::{Modifiers, PointerSample};

#[derive(Default)]
pub struct SelectionController {
    press: Option<PointerSample>,
    marquee_active: bool,
}

impl SelectionController {
    pub fn on_press(&mut self, sample: PointerSample) {
        self.press = Some(sample);
        self.marquee_active = false;
    }

    /// Returns the current marquee rect in scene space, if a marquee drag
    /// has begun.
    pub fn on_move(&mut self, sample: PointerSample, config: &CanvasConfig) -> Option<Rect> {
        let press = self.press?;
        if !self.marquee_active {
            let dist = (sample.view_pos - press.view_pos).length();
            if dist < config.marquee_drag_threshold_px {
                return None;
            }
            self.marquee_active = true;
        }
        Some(marquee_rect(press.scene_pos, sample.scene_pos))
    }

    /// Finalizes a click or marquee on release. `hit_item` is the topmost
    /// item under the press point, if any (the controller does not own hit
    /// testing against the Document's item list).
    pub fn on_release(
        &mut self,
        doc: &mut Document,
        selection: &mut Selection,
        release: PointerSample,
        modifiers: Modifiers,
        hit_item: Option<crate::ids::ObjectId>,
        config: &CanvasConfig,
    ) {
        if self.marquee_active {
            let Some(press) = self.press else { return };
            let rect = marquee_rect(press.scene_pos, release.scene_pos);
            self.apply_marquee(doc, selection, rect, modifiers, config);
        } else if let Some(id) = hit_item {
            if modifiers.ctrl {
                selection.toggle_item(id);
            } else if modifiers.shift {
                selection.add_items([id]);
            } else {
                selection.set_items([id]);
            }
        } else if !modifiers.shift && !modifiers.ctrl {
            selection.clear_all();
        }

        self.press = None;
        self.marquee_active = false;
    }

    fn apply_marquee(
        &self,
        doc: &mut Document,
        selection: &mut Selection,
        rect: Rect,
        modifiers: Modifiers,
        config: &CanvasConfig,
    ) {
        let hit_items: Vec<_> = doc
            .items()
            .iter()
            .filter_map(|i| i.as_block())
            .filter(|b| rects_intersect(b.bounds, rect))
            .map(|b| b.id)
            .collect();

        let expanded = rect.expanded(config.port_hit_box_half_px);
        let hit_ports: Vec<PortRef> = doc
            .items()
            .iter()
            .filter_map(|i| i.as_block())
            .flat_map(|b| {
                b.ports.iter().filter_map(move |p| {
                    let anchor = p.anchor_scene(b.bounds, b.port_snap_step);
                    if expanded.contains(anchor) {
                        Some(PortRef { item_id: b.id, port_id: p.id })
                    } else {
                        None
                    }
                })
            })
            .collect();

        if modifiers.ctrl {
            let mut items = selection.items().clone();
            for id in &hit_items {
                if !items.insert(*id) {
                    items.remove(id);
                }
            }
            selection.set_items(items);
        } else if modifiers.shift {
            selection.add_items(hit_items);
        } else {
            selection.set_items(hit_items);
        }
        selection.set_marquee_ports(hit_ports);
    }
}

fn marquee_rect(a: DVec2, b: DVec2) -> Rect {
    let min_x = a.x.min(b.x);
    let min_y = a.y.min(b.y);
    Rect::new(min_x, min_y, (a.x - b.x).abs(), (a.y - b.y).abs())
}

fn rects_intersect(a: Rect, b: Rect) -> bool {
    a.left() < b.right() && a.right() > b.left() && a.top() < b.bottom() && a.bottom() > b.top()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric::Fabric;

    #[test]
    fn marquee_requires_threshold_before_activating() {
        let mut ctrl = SelectionController::default();
        let config = CanvasConfig::default();
        ctrl.on_press(PointerSample { view_pos: DVec2::ZERO, scene_pos: DVec2::ZERO });
        let result = ctrl.on_move(PointerSample { view_pos: DVec2::new(1.0, 0.0), scene_pos: DVec2::new(1.0, 0.0) }, &config);
        assert!(result.is_none());
        let result = ctrl.on_move(PointerSample { view_pos: DVec2::new(10.0, 0.0), scene_pos: DVec2::new(10.0, 0.0) }, &config);
        assert!(result.is_some());
    }

    #[test]
    fn click_replaces_selection_without_modifiers() {
        let mut doc = Document::new(Fabric::new(8.0));
        let a = doc.create_block(crate::geometry::Rect::new(0.0, 0.0, 8.0, 8.0), true);
        let mut selection = Selection::default();
        let mut ctrl = SelectionController::default();
        let config = CanvasConfig::default();
        ctrl.on_press(PointerSample { view_pos: DVec2::ZERO, scene_pos: DVec2::ZERO });
        ctrl.on_release(&mut doc, &mut selection, PointerSample { view_pos: DVec2::ZERO, scene_pos: DVec2::ZERO }, Modifiers::default(), Some(a), &config);
        assert!(selection.is_item_selected(a));
    }
}
