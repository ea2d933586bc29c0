use dashmap::DashMap;

use crate::model::{Courier, Order};

use super::EngineError;

/// The two collections behind the engine, keyed by externally supplied ids.
///
/// Mirrors the narrow contract the service needs from a document store:
/// point reads, all-or-nothing batch inserts, atomic single-document
/// conditioned updates, and bulk filtered updates. Each update runs under
/// the entry's shard lock, so a document is never observed mid-mutation;
/// nothing spans more than one document atomically.
pub struct DocumentStore {
    couriers: DashMap<u64, Courier>,
    orders: DashMap<u64, Order>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            couriers: DashMap::new(),
            orders: DashMap::new(),
        }
    }

    // ── Couriers ─────────────────────────────────────────────

    /// Insert a batch of couriers, rejecting the whole batch on any id
    /// collision. Callers serialize inserts per collection via the engine's
    /// ingest lock, so check-then-insert cannot interleave with itself.
    pub fn insert_couriers(&self, docs: Vec<Courier>) -> Result<(), EngineError> {
        let taken: Vec<u64> = docs
            .iter()
            .map(|c| c.id)
            .filter(|id| self.couriers.contains_key(id))
            .collect();
        if !taken.is_empty() {
            return Err(EngineError::IdsTaken {
                collection: "couriers",
                ids: taken,
            });
        }
        for doc in docs {
            self.couriers.insert(doc.id, doc);
        }
        Ok(())
    }

    pub fn get_courier(&self, id: u64) -> Option<Courier> {
        self.couriers.get(&id).map(|e| e.value().clone())
    }

    /// Atomic read-modify-write on one courier. Returns the post-update
    /// document.
    pub fn update_courier<F>(&self, id: u64, mutate: F) -> Option<Courier>
    where
        F: FnOnce(&mut Courier),
    {
        let mut entry = self.couriers.get_mut(&id)?;
        mutate(entry.value_mut());
        Some(entry.value().clone())
    }

    pub fn courier_count(&self) -> usize {
        self.couriers.len()
    }

    // ── Orders ───────────────────────────────────────────────

    pub fn insert_orders(&self, docs: Vec<Order>) -> Result<(), EngineError> {
        let taken: Vec<u64> = docs
            .iter()
            .map(|o| o.id)
            .filter(|id| self.orders.contains_key(id))
            .collect();
        if !taken.is_empty() {
            return Err(EngineError::IdsTaken {
                collection: "orders",
                ids: taken,
            });
        }
        for doc in docs {
            self.orders.insert(doc.id, doc);
        }
        Ok(())
    }

    pub fn get_order(&self, id: u64) -> Option<Order> {
        self.orders.get(&id).map(|e| e.value().clone())
    }

    /// Filtered scan, returned in ascending id order so repeated calls agree
    /// on "collection order" (map iteration order is arbitrary).
    pub fn find_orders<P>(&self, pred: P) -> Vec<Order>
    where
        P: Fn(&Order) -> bool,
    {
        let mut found: Vec<Order> = self
            .orders
            .iter()
            .filter(|e| pred(e.value()))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|o| o.id);
        found
    }

    pub fn count_orders<P>(&self, pred: P) -> usize
    where
        P: Fn(&Order) -> bool,
    {
        self.orders.iter().filter(|e| pred(e.value())).count()
    }

    /// Single-document compare-and-swap: `mutate` runs only if `pred` holds
    /// for the current document, under that document's lock. Returns the
    /// post-update document, or None when the document is absent or the
    /// predicate fails.
    pub fn update_order_if<P, F>(&self, id: u64, pred: P, mutate: F) -> Option<Order>
    where
        P: FnOnce(&Order) -> bool,
        F: FnOnce(&mut Order),
    {
        let mut entry = self.orders.get_mut(&id)?;
        if !pred(entry.value()) {
            return None;
        }
        mutate(entry.value_mut());
        Some(entry.value().clone())
    }

    /// Bulk filtered update. Atomic per document, not across documents —
    /// the filter re-runs under each entry's lock.
    pub fn update_orders_where<P, F>(&self, pred: P, mutate: F) -> usize
    where
        P: Fn(&Order) -> bool,
        F: Fn(&mut Order),
    {
        let mut touched = 0;
        for mut entry in self.orders.iter_mut() {
            if pred(entry.value()) {
                mutate(entry.value_mut());
                touched += 1;
            }
        }
        touched
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}
