//! # Selection Model
//!
//! Item set + single-port selection + marquee port-ref set, with
//! canonicalization: selecting items clears single-port selection and vice
//! versa, and an already-empty set does not re-emit a "cleared" signal.

use std::collections::HashSet;

use crate::ids::{ObjectId, PortId};
use crate::item::PortRef;

#[derive(Default)]
pub struct Selection {
    items: HashSet<ObjectId>,
    single_port: Option<PortRef>,
    marquee_ports: HashSet<PortRef>,
    changed: bool,
}

impl Selection {
    pub fn items(&self) -> &HashSet<ObjectId> {
        &self.items
    }

    pub fn single_port(&self) -> Option<PortRef> {
        self.single_port
    }

    pub fn marquee_ports(&self) -> &HashSet<PortRef> {
        &self.marquee_ports
    }

    pub fn take_changed(&mut self) -> bool {
        std::mem::replace(&mut self.changed, false)
    }

    pub fn set_items(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        let ids: HashSet<ObjectId> = ids.into_iter().collect();
        if ids == self.items && self.single_port.is_none() {
            return;
        }
        self.items = ids;
        self.single_port = None;
        self.changed = true;
    }

    pub fn toggle_item(&mut self, id: ObjectId) {
        if self.items.contains(&id) {
            self.items.remove(&id);
        } else {
            self.items.insert(id);
        }
        self.single_port = None;
        self.changed = true;
    }

    pub fn add_items(&mut self, ids: impl IntoIterator<Item = ObjectId>) {
        let before = self.items.len();
        self.items.extend(ids);
        self.single_port = None;
        if self.items.len() != before {
            self.changed = true;
        }
    }

    pub fn clear_items(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.items.clear();
        self.changed = true;
    }

    pub fn set_single_port(&mut self, port: PortRef) {
        if self.single_port == Some(port) && self.items.is_empty() {
            return;
        }
        self.single_port = Some(port);
        self.items.clear();
        self.changed = true;
    }

    pub fn clear_single_port(&mut self) {
        if self.single_port.is_none() {
            return;
        }
        self.single_port = None;
        self.changed = true;
    }

    pub fn set_marquee_ports(&mut self, ports: impl IntoIterator<Item = PortRef>) {
        let ports: HashSet<PortRef> = ports.into_iter().collect();
        if ports.is_empty() && self.marquee_ports.is_empty() {
            return;
        }
        self.marquee_ports = ports;
        self.changed = true;
    }

    pub fn clear_all(&mut self) {
        let was_nonempty = !self.items.is_empty() || self.single_port.is_some() || !self.marquee_ports.is_empty();
        self.items.clear();
        self.single_port = None;
        self.marquee_ports.clear();
        if was_nonempty {
            self.changed = true;
        }
    }

    pub fn is_item_selected(&self, id: ObjectId) -> bool {
        self.items.contains(&id)
    }

    pub fn contains_port(&self, item_id: ObjectId, port_id: PortId) -> bool {
        let r = PortRef { item_id, port_id };
        self.single_port == Some(r) || self.marquee_ports.contains(&r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_items_clears_single_port() {
        let mut s = Selection::default();
        s.set_single_port(PortRef { item_id: ObjectId::create(), port_id: PortId::create() });
        assert!(s.single_port().is_some());
        s.set_items(vec![ObjectId::create()]);
        assert!(s.single_port().is_none());
    }

    #[test]
    fn setting_single_port_clears_items() {
        let mut s = Selection::default();
        s.set_items(vec![ObjectId::create()]);
        s.set_single_port(PortRef { item_id: ObjectId::create(), port_id: PortId::create() });
        assert!(s.items().is_empty());
    }

    #[test]
    fn clearing_already_empty_selection_does_not_signal_changed() {
        let mut s = Selection::default();
        s.take_changed();
        s.clear_all();
        assert!(!s.take_changed());
    }
}
