//! # Port utilities
//!
//! Paired-port naming and opposite-producer auto-pairing, grounded on
//! `CanvasAutoPorts.cpp`, plus attachment counting grounded on
//! `CanvasPortUsage.cpp`.

use uuid::Uuid;

use crate::document::Document;
use crate::item::{CanvasItem, CanvasPort, PortRole, PortSide, LEGACY_PAIR_PREFIX, PAIR_PREFIX};
use crate::ids::{ObjectId, PortId};

/// Builds a canonical `__pair:<key>` name.
pub fn paired_port_name(key: &str) -> String {
    format!("{PAIR_PREFIX}{key}")
}

/// Extracts the pair key from a current or legacy-prefixed name.
pub fn paired_port_key(name: &str) -> Option<&str> {
    name.strip_prefix(PAIR_PREFIX).or_else(|| name.strip_prefix(LEGACY_PAIR_PREFIX))
}

/// Number of wires whose endpoint references `(item_id, port_id)`.
pub fn count_port_attachments(doc: &Document, item_id: ObjectId, port_id: PortId) -> usize {
    doc.items()
        .iter()
        .filter_map(CanvasItem::as_wire)
        .filter(|w| w.references_port(item_id, port_id))
        .count()
}

/// A port is available if nothing attaches to it yet, or the block allows
/// multiple wires per port.
pub fn is_port_available(doc: &Document, item_id: ObjectId, port_id: PortId, allow_multiple: bool) -> bool {
    allow_multiple || count_port_attachments(doc, item_id, port_id) == 0
}

/// Ensures a Producer port mirroring `port_id` exists on the opposite side
/// at the same `t`. Idempotent: a second call is a no-op.
///
/// Strategy: if no paired producer with a matching key exists, either (a)
/// reuse a legacy producer keyed by the consumer's own id string, or (b)
/// mint a fresh pair key, rename the consumer to `__pair:<key>`, and append
/// a new Producer port on the opposite side.
pub fn ensure_opposite_producer_port(doc: &mut Document, block_id: ObjectId, port_id: PortId) -> Option<PortId> {
    let block = doc.find_item(block_id)?.as_block()?;
    if !block.auto_opposite_producer_port {
        return None;
    }
    let consumer = block.port(port_id)?.clone();
    if consumer.role == PortRole::Producer {
        return None;
    }

    let opposite_side = consumer.side.opposite();
    let consumer_key = consumer.paired_key().map(str::to_string);

    if let Some(ref key) = consumer_key {
        if let Some(existing) = find_matching_producer(block, key, opposite_side, consumer.t) {
            return Some(existing);
        }
    }

    let key = consumer_key.unwrap_or_else(|| port_id.to_string());
    let pair_name = paired_port_name(&key);

    let block_mut = doc.find_item_mut(block_id)?.as_block_mut()?;
    if let Some(p) = block_mut.port_mut(port_id) {
        p.name = pair_name.clone();
    }
    let t = block_mut.port(port_id)?.t;
    let new_id = block_mut.add_port(opposite_side, t, PortRole::Producer, pair_name);
    Some(new_id)
}

fn find_matching_producer(
    block: &crate::item::Block,
    key: &str,
    side: PortSide,
    t: f64,
) -> Option<PortId> {
    block
        .ports
        .iter()
        .find(|p| {
            p.role == PortRole::Producer
                && p.side == side
                && (p.t - t).abs() < 1e-6
                && p.paired_key() == Some(key)
        })
        .map(|p| p.id)
}

/// Inverse of `ensure_opposite_producer_port`: removes the paired producer
/// iff it has zero wire attachments. Returns the removed port's
/// `(index, CanvasPort)` for undo.
pub fn remove_opposite_producer_port(
    doc: &mut Document,
    block_id: ObjectId,
    consumer_port_id: PortId,
) -> Option<(usize, CanvasPort)> {
    let block = doc.find_item(block_id)?.as_block()?;
    let consumer = block.port(consumer_port_id)?;
    let key = consumer.paired_key()?.to_string();
    let opposite_side = consumer.side.opposite();
    let t = consumer.t;

    let producer_id = find_matching_producer(block, &key, opposite_side, t)?;
    if count_port_attachments(doc, block_id, producer_id) > 0 {
        return None;
    }

    let block_mut = doc.find_item_mut(block_id)?.as_block_mut()?;
    let idx = block_mut.port_index(producer_id)?;
    let port = block_mut.ports.remove(idx);
    Some((idx, port))
}

/// Draws a fresh pair key. Exists as a seam so tests can assert the
/// resulting name shape without coupling to `uuid`'s formatting directly.
pub fn fresh_pair_key() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::fabric::Fabric;
    use crate::geometry::Rect;

    #[test]
    fn ensure_opposite_producer_port_is_idempotent() {
        let mut doc = Document::new(Fabric::new(8.0));
        let block_id = doc.create_block(Rect::new(0.0, 0.0, 40.0, 40.0), true);
        let block = doc.find_item_mut(block_id).unwrap().as_block_mut().unwrap();
        block.auto_opposite_producer_port = true;
        let consumer_id = block.add_port(PortSide::Left, 0.5, PortRole::Consumer, String::new());

        let first = ensure_opposite_producer_port(&mut doc, block_id, consumer_id);
        assert!(first.is_some());
        let count_after_first = doc
            .find_item(block_id)
            .unwrap()
            .as_block()
            .unwrap()
            .ports
            .len();

        let second = ensure_opposite_producer_port(&mut doc, block_id, consumer_id);
        assert!(second.is_some());
        let count_after_second = doc
            .find_item(block_id)
            .unwrap()
            .as_block()
            .unwrap()
            .ports
            .len();

        assert_eq!(count_after_first, count_after_second);

        let block = doc.find_item(block_id).unwrap().as_block().unwrap();
        let producers: Vec<_> = block.ports.iter().filter(|p| p.role == PortRole::Producer).collect();
        assert_eq!(producers.len(), 1);
        assert_eq!(producers[0].side, PortSide::Right);
    }

    #[test]
    fn remove_opposite_producer_port_refuses_if_attached() {
        let mut doc = Document::new(Fabric::new(8.0));
        let block_id = doc.create_block(Rect::new(0.0, 0.0, 40.0, 40.0), true);
        let block = doc.find_item_mut(block_id).unwrap().as_block_mut().unwrap();
        block.auto_opposite_producer_port = true;
        let consumer_id = block.add_port(PortSide::Left, 0.5, PortRole::Consumer, String::new());
        let producer_id = ensure_opposite_producer_port(&mut doc, block_id, consumer_id).unwrap();

        use crate::item::{CanvasItem, Endpoint, PortRef, Wire};
        let wire = Wire::new(
            ObjectId::create(),
            Endpoint::Attached(PortRef { item_id: block_id, port_id: producer_id }),
            Endpoint::Free(glam::DVec2::ZERO),
        );
        doc.insert_item_raw(CanvasItem::Wire(wire));

        assert!(remove_opposite_producer_port(&mut doc, block_id, consumer_id).is_none());
    }
}
