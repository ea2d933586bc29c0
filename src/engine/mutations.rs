use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::limits::MAX_BATCH_SIZE;
use crate::model::{Courier, CourierPatch, Order, OrderStatus};
use crate::observability;

use super::matcher::{profile_satisfies, split_orders};
use super::{Engine, EngineError, LockKey};

/// Outcome of one assign call. `assign_time` is None exactly when no order
/// matched and nothing was mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignResult {
    pub order_ids: Vec<u64>,
    pub assign_time: Option<DateTime<Utc>>,
}

impl Engine {
    pub async fn ingest_couriers(&self, couriers: Vec<Courier>) -> Result<Vec<u64>, EngineError> {
        if couriers.len() > MAX_BATCH_SIZE {
            return Err(EngineError::LimitExceeded("courier batch too large"));
        }
        let ids: Vec<u64> = couriers.iter().map(|c| c.id).collect();

        let lock = self.lock(LockKey::CouriersIngest);
        let _guard = lock.lock().await;
        self.store.insert_couriers(couriers)?;

        info!(count = ids.len(), "couriers ingested");
        Ok(ids)
    }

    pub async fn ingest_orders(&self, orders: Vec<Order>) -> Result<Vec<u64>, EngineError> {
        if orders.len() > MAX_BATCH_SIZE {
            return Err(EngineError::LimitExceeded("order batch too large"));
        }
        let ids: Vec<u64> = orders.iter().map(|o| o.id).collect();

        let lock = self.lock(LockKey::OrdersIngest);
        let _guard = lock.lock().await;
        self.store.insert_orders(orders)?;

        info!(count = ids.len(), "orders ingested");
        Ok(ids)
    }

    /// Assign a batch of compatible orders to the courier.
    ///
    /// Idempotent: while the courier still carries an in-progress batch, the
    /// same order ids and the original assign_time come back unchanged. A
    /// call that matches nothing mutates nothing and carries no assign_time.
    pub async fn assign_orders(&self, courier_id: u64) -> Result<AssignResult, EngineError> {
        let lock = self.lock(LockKey::Courier(courier_id));
        let _guard = lock.lock().await;

        let courier = self
            .store
            .get_courier(courier_id)
            .ok_or(EngineError::CourierNotFound(courier_id))?;

        let active = self
            .store
            .find_orders(|o| o.courier_id == Some(courier_id) && o.status == OrderStatus::InProgress);
        if !active.is_empty() {
            // existing batch: re-return it, never re-stamp
            return Ok(AssignResult {
                assign_time: active[0].assign_time,
                order_ids: active.iter().map(|o| o.id).collect(),
            });
        }

        let capacity = courier.courier_type.max_weight();
        let candidates = self.store.find_orders(|o| {
            o.status == OrderStatus::NotAssigned
                && o.weight <= capacity
                && courier.regions.contains(&o.region)
        });
        let (assignable, _) = split_orders(candidates, &courier.working_hours);
        if assignable.is_empty() {
            return Ok(AssignResult {
                order_ids: Vec::new(),
                assign_time: None,
            });
        }

        let assign_time = Utc::now();
        let id_set: HashSet<u64> = assignable.iter().map(|o| o.id).collect();
        // conditioned bulk commit: only orders still not_assigned take the stamp
        let stamped = self.store.update_orders_where(
            |o| id_set.contains(&o.id) && o.status == OrderStatus::NotAssigned,
            |o| {
                o.status = OrderStatus::InProgress;
                o.courier_id = Some(courier_id);
                o.assign_time = Some(assign_time);
            },
        );

        // The response reports the committed state, not the candidate set: a
        // courier over the same region may have claimed some candidates
        // between the scan and the commit.
        let batch = self
            .store
            .find_orders(|o| o.courier_id == Some(courier_id) && o.status == OrderStatus::InProgress);
        if batch.is_empty() {
            return Ok(AssignResult {
                order_ids: Vec::new(),
                assign_time: None,
            });
        }

        metrics::counter!(observability::ORDERS_ASSIGNED_TOTAL).increment(stamped as u64);
        info!(courier_id, orders = stamped, "assigned batch");
        Ok(AssignResult {
            assign_time: batch[0].assign_time,
            order_ids: batch.iter().map(|o| o.id).collect(),
        })
    }

    /// Transition one in-progress order of the courier to completed.
    ///
    /// The transition is a single conditioned update on the stored status and
    /// courier_id; re-completing an order the same courier already completed
    /// is success without re-applying. An order held by a different courier
    /// reports as not-found, exactly like an absent one.
    pub async fn complete_order(
        &self,
        courier_id: u64,
        order_id: u64,
        complete_time: DateTime<Utc>,
    ) -> Result<u64, EngineError> {
        let lock = self.lock(LockKey::Courier(courier_id));
        let _guard = lock.lock().await;

        if self.store.get_courier(courier_id).is_none() {
            return Err(EngineError::CourierNotFound(courier_id));
        }

        // completion may not predate the batch's assignment
        if let Some(order) = self.store.get_order(order_id)
            && order.courier_id == Some(courier_id)
            && let Some(assigned) = order.assign_time
            && complete_time < assigned
        {
            return Err(EngineError::CompleteBeforeAssign(order_id));
        }

        let completed = self.store.update_order_if(
            order_id,
            |o| o.courier_id == Some(courier_id) && o.status == OrderStatus::InProgress,
            |o| {
                o.status = OrderStatus::Completed;
                o.complete_time = Some(complete_time);
            },
        );

        let Some(order) = completed else {
            return match self.store.get_order(order_id) {
                Some(o) if o.status == OrderStatus::Completed && o.courier_id == Some(courier_id) => {
                    Ok(o.id) // idempotent re-completion
                }
                _ => Err(EngineError::OrderNotFound(order_id)),
            };
        };

        metrics::counter!(observability::ORDERS_COMPLETED_TOTAL).increment(1);

        // Batch bookkeeping, a separate step after the order transition: one
        // increment per drained batch, not per order.
        let remaining = self
            .store
            .count_orders(|o| o.courier_id == Some(courier_id) && o.status == OrderStatus::InProgress);
        if remaining == 0 {
            self.store
                .update_courier(courier_id, |c| c.assigns += 1)
                .ok_or(EngineError::CourierNotFound(courier_id))?;
            metrics::counter!(observability::BATCHES_COMPLETED_TOTAL).increment(1);
            info!(courier_id, "batch completed");
        }

        Ok(order.id)
    }

    /// Apply a partial profile update, then revalidate the courier's
    /// in-progress orders against the new profile in a single pass.
    ///
    /// Orders that no longer satisfy capacity, region and schedule together
    /// revert to not_assigned with courier_id and assign_time cleared; the
    /// rest keep their original assign_time.
    pub async fn patch_courier(
        &self,
        courier_id: u64,
        patch: CourierPatch,
    ) -> Result<Courier, EngineError> {
        let lock = self.lock(LockKey::Courier(courier_id));
        let _guard = lock.lock().await;

        let courier = self
            .store
            .update_courier(courier_id, |c| {
                if let Some(courier_type) = patch.courier_type {
                    c.courier_type = courier_type;
                }
                if let Some(regions) = patch.regions {
                    c.regions = regions;
                }
                if let Some(working_hours) = patch.working_hours {
                    c.working_hours = working_hours;
                }
            })
            .ok_or(EngineError::CourierNotFound(courier_id))?;

        let active = self
            .store
            .find_orders(|o| o.courier_id == Some(courier_id) && o.status == OrderStatus::InProgress);
        let released: HashSet<u64> = active
            .iter()
            .filter(|o| !profile_satisfies(&courier, o))
            .map(|o| o.id)
            .collect();
        if !released.is_empty() {
            let count = self.store.update_orders_where(
                |o| {
                    released.contains(&o.id)
                        && o.courier_id == Some(courier_id)
                        && o.status == OrderStatus::InProgress
                },
                |o| {
                    o.status = OrderStatus::NotAssigned;
                    o.courier_id = None;
                    o.assign_time = None;
                },
            );
            metrics::counter!(observability::ORDERS_RELEASED_TOTAL).increment(count as u64);
            info!(courier_id, released = count, "released incompatible orders after patch");
        }

        Ok(courier)
    }
}
