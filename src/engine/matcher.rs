use crate::model::{Courier, Order, TimeWindow};

/// Partition candidate orders into (assignable, unassignable ids) on
/// schedule fit alone. The caller has already filtered candidates by weight
/// and region; the matcher's contribution is interval containment.
///
/// Pure and deterministic: identical inputs give identical outputs on every
/// call, and the assignable list keeps the candidates' incoming order.
pub fn split_orders(
    candidates: Vec<Order>,
    working_hours: &[TimeWindow],
) -> (Vec<Order>, Vec<u64>) {
    let mut assignable = Vec::new();
    let mut unassignable = Vec::new();
    for order in candidates {
        if fits_schedule(&order.delivery_hours, working_hours) {
            assignable.push(order);
        } else {
            unassignable.push(order.id);
        }
    }
    (assignable, unassignable)
}

/// OR semantics across windows: some delivery window lies fully inside some
/// working window.
pub fn fits_schedule(delivery: &[TimeWindow], working: &[TimeWindow]) -> bool {
    delivery.iter().any(|d| working.iter().any(|w| w.contains(d)))
}

/// Conjunctive compatibility check used by patch revalidation: capacity,
/// region and schedule must all hold against the courier's current profile.
pub fn profile_satisfies(courier: &Courier, order: &Order) -> bool {
    order.weight <= courier.courier_type.max_weight()
        && courier.regions.contains(&order.region)
        && fits_schedule(&order.delivery_hours, &courier.working_hours)
}
