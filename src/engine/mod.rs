mod error;
mod matcher;
mod mutations;
mod store;

pub use error::EngineError;
pub use matcher::{fits_schedule, profile_satisfies, split_orders};
pub use mutations::AssignResult;
pub use store::DocumentStore;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Logical key for the coordination table: one in-flight mutation per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockKey {
    CouriersIngest,
    OrdersIngest,
    Courier(u64),
}

pub struct Engine {
    pub store: DocumentStore,
    /// Keyed locks, created on first use and kept for the engine's lifetime.
    /// The key space is bounded by the courier count plus the two ingest keys.
    locks: DashMap<LockKey, Arc<Mutex<()>>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            store: DocumentStore::new(),
            locks: DashMap::new(),
        }
    }

    pub(super) fn lock(&self, key: LockKey) -> Arc<Mutex<()>> {
        self.locks.entry(key).or_default().value().clone()
    }
}
