//! Context Menu Controller: resolves a click target and builds a flat
//! action list; executes the chosen action against the Document.

use glam::DVec2;

use crate::commands::{Command, CompositeCommand, DeleteItemCommand, DeletePortCommand};
use crate::config::CanvasConfig;
use crate::document::Document;
use crate::ids::{ObjectId, PortId};
use crate::selection::Selection;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextTarget {
    Port { item_id: ObjectId, port_id: PortId },
    Wire(ObjectId),
    Block(ObjectId),
    LinkHub(ObjectId),
    Selection,
    Empty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContextAction {
    Undo,
    Redo,
    DeleteTarget,
    DeleteSelection,
    DeletePort { item_id: ObjectId, port_id: PortId },
    Custom(String),
}

pub struct ContextMenuController;

impl ContextMenuController {
    /// Resolves the click target at `scene_pos`.
    pub fn resolve_target(doc: &mut Document, selection: &Selection, scene_pos: DVec2, config: &CanvasConfig) -> ContextTarget {
        if let Some(port_ref) = doc.hit_test_port(scene_pos, config.port_hit_radius_px) {
            return ContextTarget::Port { item_id: port_ref.item_id, port_id: port_ref.port_id };
        }

        for item in doc.items().iter().rev() {
            match item {
                crate::item::CanvasItem::Block(b) if b.bounds.contains(scene_pos) => {
                    if selection.items().len() > 1 && selection.is_item_selected(b.id) {
                        return ContextTarget::Selection;
                    }
                    return if b.is_link_hub {
                        ContextTarget::LinkHub(b.id)
                    } else {
                        ContextTarget::Block(b.id)
                    };
                }
                crate::item::CanvasItem::Wire(w) if item.hit_test(scene_pos) => {
                    return ContextTarget::Wire(w.id);
                }
                _ => {}
            }
        }
        ContextTarget::Empty
    }

    /// Builds the flat action list for a resolved target.
    pub fn actions_for(target: ContextTarget, doc: &Document) -> Vec<ContextAction> {
        let mut actions = vec![];
        if doc.commands.can_undo() {
            actions.push(ContextAction::Undo);
        }
        if doc.commands.can_redo() {
            actions.push(ContextAction::Redo);
        }
        match target {
            ContextTarget::Port { item_id, port_id } => {
                actions.push(ContextAction::DeletePort { item_id, port_id });
            }
            ContextTarget::Wire(id) | ContextTarget::Block(id) | ContextTarget::LinkHub(id) => {
                actions.push(ContextAction::DeleteTarget);
                let _ = id;
            }
            ContextTarget::Selection => {
                actions.push(ContextAction::DeleteSelection);
            }
            ContextTarget::Empty => {}
        }
        actions
    }

    /// Executes a chosen action against the Document.
    pub fn execute(doc: &mut Document, selection: &Selection, target: ContextTarget, action: &ContextAction) -> bool {
        match action {
            ContextAction::Undo => doc.undo(),
            ContextAction::Redo => doc.redo(),
            ContextAction::DeleteTarget => {
                let id = match target {
                    ContextTarget::Wire(id) | ContextTarget::Block(id) | ContextTarget::LinkHub(id) => id,
                    _ => return false,
                };
                doc.execute(Box::new(DeleteItemCommand::new(id)))
            }
            ContextAction::DeletePort { item_id, port_id } => {
                doc.execute(Box::new(DeletePortCommand::new(*item_id, *port_id)))
            }
            ContextAction::DeleteSelection => {
                let mut ids: Vec<ObjectId> = selection.items().iter().copied().collect();
                ids.sort();
                let children: Vec<Box<dyn Command>> = ids
                    .into_iter()
                    .map(|id| Box::new(DeleteItemCommand::new(id)) as Box<dyn Command>)
                    .collect();
                if children.is_empty() {
                    return false;
                }
                doc.execute(Box::new(CompositeCommand::new("delete selection", children)))
            }
            ContextAction::Custom(_) => false,
        }
    }
}
