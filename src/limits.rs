use crate::model::Minutes;

/// Minutes in one day; an overnight window's end lies past this.
pub const MINUTES_PER_DAY: Minutes = 24 * 60;

/// Order weight must satisfy `0 < weight <= MAX_ORDER_WEIGHT`.
pub const MAX_ORDER_WEIGHT: f64 = 50.0;

/// Hard cap on entities in one ingest batch.
pub const MAX_BATCH_SIZE: usize = 10_000;
