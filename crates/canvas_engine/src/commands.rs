//! # Commands
//!
//! Invertible command objects, grounded on `CanvasCommands.cpp`. Each command
//! implements `apply`/`revert`, both totally defined on the current Document
//! state; `apply` never partially mutates and then fails.

use glam::DVec2;
use tracing::debug;

use crate::document::Document;
use crate::ids::{ObjectId, PortId};
use crate::item::{CanvasItem, CanvasPort};

pub trait Command: std::fmt::Debug {
    fn apply(&mut self, doc: &mut Document) -> bool;
    fn revert(&mut self, doc: &mut Document) -> bool;
}

#[derive(Debug)]
pub struct MoveItemCommand {
    pub id: ObjectId,
    pub from: DVec2,
    pub to: DVec2,
}

impl Command for MoveItemCommand {
    fn apply(&mut self, doc: &mut Document) -> bool {
        doc.set_item_top_left(self.id, self.to)
    }

    fn revert(&mut self, doc: &mut Document) -> bool {
        doc.set_item_top_left(self.id, self.from)
    }
}

#[derive(Debug)]
pub struct CreateItemCommand {
    item: Option<CanvasItem>,
    id: ObjectId,
    index: Option<usize>,
}

impl CreateItemCommand {
    pub fn new(item: CanvasItem) -> Self {
        let id = item.id();
        Self { item: Some(item), id, index: None }
    }
}

impl Command for CreateItemCommand {
    fn apply(&mut self, doc: &mut Document) -> bool {
        let Some(item) = self.item.take() else { return false };
        let index = self.index.unwrap_or_else(|| doc.items().len());
        if doc.insert_item(index, item) {
            self.index = Some(index);
            true
        } else {
            debug!(item = %self.id, "create command failed to insert");
            false
        }
    }

    fn revert(&mut self, doc: &mut Document) -> bool {
        if self.index.is_none() {
            return false;
        }
        let Some((_, item)) = doc.remove_item(self.id) else { return false };
        self.item = Some(item);
        true
    }
}

struct SavedItem {
    index: usize,
    item: CanvasItem,
}

#[derive(Debug)]
pub struct DeleteItemCommand {
    /// Target ids, populated on first `apply` (the primary id plus any
    /// link-hub-attached wires discovered at that time).
    ids: Vec<ObjectId>,
    saved: Vec<(usize, CanvasItem)>,
    first_apply_done: bool,
}

impl DeleteItemCommand {
    pub fn new(id: ObjectId) -> Self {
        Self { ids: vec![id], saved: Vec::new(), first_apply_done: false }
    }
}

impl Command for DeleteItemCommand {
    fn apply(&mut self, doc: &mut Document) -> bool {
        if !self.first_apply_done {
            // On the first application, if the target is a link-hub block,
            // additionally collect every wire attached to it. The source
            // does not re-collect hub siblings on a later re-application —
            // see DESIGN.md's Open Question resolution.
            let primary = self.ids[0];
            if let Some(block) = doc.find_item(primary).and_then(|i| i.as_block()) {
                if block.is_link_hub {
                    let attached: Vec<ObjectId> = doc
                        .items()
                        .iter()
                        .filter_map(CanvasItem::as_wire)
                        .filter(|w| w.references_item(primary))
                        .map(|w| w.id)
                        .collect();
                    self.ids.extend(attached);
                }
            }
            self.first_apply_done = true;
        }

        let mut removed = Vec::new();
        for &id in &self.ids {
            if let Some((index, item)) = doc.remove_item(id) {
                removed.push((index, item));
            }
        }
        if removed.is_empty() {
            return false;
        }
        self.saved = removed;
        true
    }

    fn revert(&mut self, doc: &mut Document) -> bool {
        if self.saved.is_empty() {
            return false;
        }
        self.saved.sort_by_key(|(idx, _)| *idx);
        let mut ok = true;
        for (index, item) in self.saved.drain(..) {
            ok &= doc.insert_item(index, item);
        }
        ok
    }
}

#[derive(Debug)]
pub struct DeletePortCommand {
    pub item_id: ObjectId,
    port_index: Option<usize>,
    saved_port: Option<CanvasPort>,
    saved_wires: Vec<(usize, CanvasItem)>,
    port_id: PortId,
}

impl DeletePortCommand {
    pub fn new(item_id: ObjectId, port_id: PortId) -> Self {
        Self { item_id, port_index: None, saved_port: None, saved_wires: Vec::new(), port_id }
    }
}

impl Command for DeletePortCommand {
    fn apply(&mut self, doc: &mut Document) -> bool {
        let wire_ids: Vec<ObjectId> = doc
            .items()
            .iter()
            .filter_map(CanvasItem::as_wire)
            .filter(|w| w.references_port(self.item_id, self.port_id))
            .map(|w| w.id)
            .collect();

        let mut saved_wires = Vec::new();
        for id in wire_ids {
            if let Some((index, item)) = doc.remove_item(id) {
                saved_wires.push((index, item));
            }
        }

        let Some(block) = doc.find_item_mut(self.item_id).and_then(|i| i.as_block_mut()) else {
            return false;
        };
        let Some(idx) = block.port_index(self.port_id) else { return false };
        let port = block.ports.remove(idx);

        self.port_index = Some(idx);
        self.saved_port = Some(port);
        self.saved_wires = saved_wires;
        true
    }

    fn revert(&mut self, doc: &mut Document) -> bool {
        let (Some(idx), Some(port)) = (self.port_index, self.saved_port.take()) else {
            return false;
        };
        let Some(block) = doc.find_item_mut(self.item_id).and_then(|i| i.as_block_mut()) else {
            return false;
        };
        if idx > block.ports.len() {
            return false;
        }
        block.ports.insert(idx, port);

        let mut ok = true;
        self.saved_wires.sort_by_key(|(i, _)| *i);
        for (index, item) in self.saved_wires.drain(..) {
            ok &= doc.insert_item(index, item);
        }
        ok
    }
}

#[derive(Debug, Default)]
pub struct CompositeCommand {
    pub name: String,
    children: Vec<Box<dyn Command>>,
}

impl CompositeCommand {
    pub fn new(name: impl Into<String>, children: Vec<Box<dyn Command>>) -> Self {
        Self { name: name.into(), children }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

impl Command for CompositeCommand {
    fn apply(&mut self, doc: &mut Document) -> bool {
        if self.children.is_empty() {
            return false;
        }
        let mut ok = true;
        for child in self.children.iter_mut() {
            ok &= child.apply(doc);
        }
        ok
    }

    fn revert(&mut self, doc: &mut Document) -> bool {
        if self.children.is_empty() {
            return false;
        }
        let mut ok = true;
        for child in self.children.iter_mut().rev() {
            ok &= child.revert(doc);
        }
        ok
    }
}

/// Executes commands, appending successful applications to the undo stack
/// and clearing redo. Owned by the Document; accessed via
/// `Document::execute`/`undo`/`redo` which temporarily take this out of
/// `self` to avoid a double mutable borrow.
#[derive(Default)]
pub struct CommandManager {
    undo_stack: Vec<Box<dyn Command>>,
    redo_stack: Vec<Box<dyn Command>>,
}

impl CommandManager {
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn execute(&mut self, doc: &mut Document, mut cmd: Box<dyn Command>) -> bool {
        if cmd.apply(doc) {
            self.undo_stack.push(cmd);
            self.redo_stack.clear();
            true
        } else {
            false
        }
    }

    pub fn undo(&mut self, doc: &mut Document) -> bool {
        let Some(mut cmd) = self.undo_stack.pop() else { return false };
        let ok = cmd.revert(doc);
        if ok {
            self.redo_stack.push(cmd);
        } else {
            self.undo_stack.push(cmd);
        }
        ok
    }

    pub fn redo(&mut self, doc: &mut Document) -> bool {
        let Some(mut cmd) = self.redo_stack.pop() else { return false };
        let ok = cmd.apply(doc);
        if ok {
            self.undo_stack.push(cmd);
        } else {
            self.redo_stack.push(cmd);
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric::Fabric;
    use crate::geometry::Rect;

    #[test]
    fn move_command_applies_and_reverts() {
        let mut doc = Document::new(Fabric::new(8.0));
        let id = doc.create_block(Rect::new(0.0, 0.0, 8.0, 8.0), true);
        let mut cmd = MoveItemCommand { id, from: DVec2::ZERO, to: DVec2::new(16.0, 24.0) };
        assert!(cmd.apply(&mut doc));
        assert_eq!(doc.find_item(id).unwrap().as_block().unwrap().bounds.top_left(), DVec2::new(16.0, 24.0));
        assert!(cmd.revert(&mut doc));
        assert_eq!(doc.find_item(id).unwrap().as_block().unwrap().bounds.top_left(), DVec2::ZERO);
    }

    #[test]
    fn delete_then_undo_restores_same_id_at_same_index() {
        let mut doc = Document::new(Fabric::new(8.0));
        let a = doc.create_block(Rect::new(0.0, 0.0, 8.0, 8.0), true);
        let b = doc.create_block(Rect::new(8.0, 0.0, 8.0, 8.0), true);
        let c = doc.create_block(Rect::new(16.0, 0.0, 8.0, 8.0), true);

        let mut cmd = DeleteItemCommand::new(b);
        assert!(cmd.apply(&mut doc));
        assert_eq!(doc.items().iter().map(|i| i.id()).collect::<Vec<_>>(), vec![a, c]);

        assert!(cmd.revert(&mut doc));
        assert_eq!(doc.items().iter().map(|i| i.id()).collect::<Vec<_>>(), vec![a, b, c]);
    }

    #[test]
    fn create_then_undo_yields_empty_document() {
        let mut doc = Document::new(Fabric::new(8.0));
        let block = crate::item::Block::new(ObjectId::create(), Rect::new(0.0, 0.0, 8.0, 8.0), true);
        let id = block.id;
        let mut cmd = CreateItemCommand::new(CanvasItem::Block(block));
        assert!(cmd.apply(&mut doc));
        assert_eq!(doc.items().len(), 1);
        assert!(cmd.revert(&mut doc));
        assert!(doc.items().is_empty());
        assert!(cmd.apply(&mut doc));
        assert_eq!(doc.items()[0].id(), id);
    }

    #[test]
    fn composite_command_rejects_empty() {
        let mut doc = Document::new(Fabric::new(8.0));
        let mut cmd = CompositeCommand::new("noop", vec![]);
        assert!(!cmd.apply(&mut doc));
    }
}
