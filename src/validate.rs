//! Explicit request validation.
//!
//! The checks a declarative schema would express are written out as a typed
//! pass over the incoming JSON, so per-item failures aggregate into one
//! error value instead of unwinding on the first bad entry.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::limits::{MAX_BATCH_SIZE, MAX_ORDER_WEIGHT};
use crate::model::{Courier, CourierPatch, CourierType, Order, TimeWindow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Whole payload unusable: wrong shape, missing or non-integer ids.
    Malformed(String),
    /// Field-level failures, aggregated: every offending item id, one error.
    BadItems {
        collection: &'static str,
        ids: Vec<u64>,
    },
    /// Duplicate ids within one submission.
    DuplicateIds {
        collection: &'static str,
        ids: Vec<u64>,
    },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Malformed(msg) => write!(f, "{msg}"),
            ValidationError::BadItems { collection, ids } => {
                write!(f, "invalid {collection}: {ids:?}")
            }
            ValidationError::DuplicateIds { collection, ids } => {
                write!(f, "{collection} ids are not unique: {ids:?}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

fn malformed(msg: &str) -> ValidationError {
    ValidationError::Malformed(msg.to_string())
}

/// Validated complete request: courier_id + order_id + complete_time.
#[derive(Debug, Clone, PartialEq)]
pub struct CompleteRequest {
    pub courier_id: u64,
    pub order_id: u64,
    pub complete_time: DateTime<Utc>,
}

// ── Batch payloads ───────────────────────────────────────────────

pub fn validate_couriers(payload: &Value) -> Result<Vec<Courier>, ValidationError> {
    let items = batch_items(payload)?;
    let ids = collect_ids(items, "courier_id")?;

    let mut bad = Vec::new();
    let mut parsed = Vec::with_capacity(items.len());
    for (item, &id) in items.iter().zip(&ids) {
        match courier_fields(item) {
            Ok((courier_type, regions, working_hours)) => parsed.push(Courier {
                id,
                courier_type,
                regions,
                working_hours,
                assigns: 0,
            }),
            Err(()) => bad.push(id),
        }
    }
    if !bad.is_empty() {
        return Err(ValidationError::BadItems {
            collection: "couriers",
            ids: bad,
        });
    }

    let dupes = duplicate_ids(&ids);
    if !dupes.is_empty() {
        return Err(ValidationError::DuplicateIds {
            collection: "couriers",
            ids: dupes,
        });
    }
    Ok(parsed)
}

pub fn validate_orders(payload: &Value) -> Result<Vec<Order>, ValidationError> {
    let items = batch_items(payload)?;
    let ids = collect_ids(items, "order_id")?;

    let mut bad = Vec::new();
    let mut parsed = Vec::with_capacity(items.len());
    for (item, &id) in items.iter().zip(&ids) {
        match order_fields(item) {
            Ok((weight, region, delivery_hours)) => {
                parsed.push(Order::new(id, weight, region, delivery_hours))
            }
            Err(()) => bad.push(id),
        }
    }
    if !bad.is_empty() {
        return Err(ValidationError::BadItems {
            collection: "orders",
            ids: bad,
        });
    }

    let dupes = duplicate_ids(&ids);
    if !dupes.is_empty() {
        return Err(ValidationError::DuplicateIds {
            collection: "orders",
            ids: dupes,
        });
    }
    Ok(parsed)
}

// ── Singleton payloads ───────────────────────────────────────────

pub fn validate_courier_patch(payload: &Value) -> Result<CourierPatch, ValidationError> {
    let invalid = || malformed("courier patch is not valid");
    let obj = payload.as_object().ok_or_else(invalid)?;

    let mut patch = CourierPatch::default();
    for (key, value) in obj {
        match key.as_str() {
            "courier_type" => {
                let courier_type = value
                    .as_str()
                    .and_then(|s| s.parse::<CourierType>().ok())
                    .ok_or_else(invalid)?;
                patch.courier_type = Some(courier_type);
            }
            "regions" => patch.regions = Some(parse_regions(value).map_err(|()| invalid())?),
            "working_hours" => {
                patch.working_hours = Some(parse_windows(value).map_err(|()| invalid())?)
            }
            _ => return Err(invalid()),
        }
    }
    Ok(patch)
}

/// Assign carries the courier_id and nothing else.
pub fn validate_assign(payload: &Value) -> Result<u64, ValidationError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| malformed("assign request must be a JSON object"))?;
    if obj.len() != 1 {
        return Err(malformed(
            "assign request must have exactly one field: courier_id",
        ));
    }
    positive_id(obj.get("courier_id"))
        .ok_or_else(|| malformed("courier_id must be a positive integer"))
}

pub fn validate_complete(payload: &Value) -> Result<CompleteRequest, ValidationError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| malformed("complete request must be a JSON object"))?;
    for key in obj.keys() {
        if !matches!(key.as_str(), "courier_id" | "order_id" | "complete_time") {
            return Err(malformed("complete request has unknown fields"));
        }
    }
    let courier_id = positive_id(obj.get("courier_id"))
        .ok_or_else(|| malformed("courier_id must be a positive integer"))?;
    let order_id = positive_id(obj.get("order_id"))
        .ok_or_else(|| malformed("order_id must be a positive integer"))?;
    let complete_time = obj
        .get("complete_time")
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| malformed("complete_time must be an ISO-8601 timestamp"))?;
    Ok(CompleteRequest {
        courier_id,
        order_id,
        complete_time,
    })
}

// ── Field helpers ────────────────────────────────────────────────

fn batch_items(payload: &Value) -> Result<&[Value], ValidationError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| malformed("payload must be a JSON object"))?;
    if obj.len() != 1 || !obj.contains_key("data") {
        return Err(malformed("payload must have exactly one field: data"));
    }
    let items = obj["data"]
        .as_array()
        .ok_or_else(|| malformed("data must be an array"))?;
    if items.is_empty() {
        return Err(malformed("data must not be empty"));
    }
    if items.len() > MAX_BATCH_SIZE {
        return Err(malformed("batch too large"));
    }
    Ok(items)
}

/// Every item must carry its id as a positive integer — without one there is
/// nothing to report a field-level failure against.
fn collect_ids(items: &[Value], id_key: &str) -> Result<Vec<u64>, ValidationError> {
    items
        .iter()
        .map(|item| positive_id(item.get(id_key)))
        .collect::<Option<Vec<u64>>>()
        .ok_or_else(|| malformed(&format!("every item needs a positive integer {id_key}")))
}

fn positive_id(value: Option<&Value>) -> Option<u64> {
    value.and_then(Value::as_u64).filter(|id| *id >= 1)
}

fn duplicate_ids(ids: &[u64]) -> Vec<u64> {
    let mut seen = HashSet::new();
    let mut dupes = Vec::new();
    for &id in ids {
        if !seen.insert(id) && !dupes.contains(&id) {
            dupes.push(id);
        }
    }
    dupes
}

fn courier_fields(item: &Value) -> Result<(CourierType, Vec<u32>, Vec<TimeWindow>), ()> {
    let obj = item.as_object().ok_or(())?;
    for key in obj.keys() {
        if !matches!(
            key.as_str(),
            "courier_id" | "courier_type" | "regions" | "working_hours"
        ) {
            return Err(());
        }
    }
    let courier_type = obj
        .get("courier_type")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .ok_or(())?;
    let regions = parse_regions(obj.get("regions").ok_or(())?)?;
    let working_hours = parse_windows(obj.get("working_hours").ok_or(())?)?;
    Ok((courier_type, regions, working_hours))
}

fn order_fields(item: &Value) -> Result<(f64, u32, Vec<TimeWindow>), ()> {
    let obj = item.as_object().ok_or(())?;
    for key in obj.keys() {
        if !matches!(
            key.as_str(),
            "order_id" | "weight" | "region" | "delivery_hours"
        ) {
            return Err(());
        }
    }
    let weight = obj.get("weight").and_then(Value::as_f64).ok_or(())?;
    if !(weight > 0.0 && weight <= MAX_ORDER_WEIGHT) {
        return Err(());
    }
    let region = obj.get("region").ok_or(())?;
    let region = region.as_u64().ok_or(())?;
    if region == 0 || region > u64::from(u32::MAX) {
        return Err(());
    }
    let delivery_hours = parse_windows(obj.get("delivery_hours").ok_or(())?)?;
    Ok((weight, region as u32, delivery_hours))
}

fn parse_regions(value: &Value) -> Result<Vec<u32>, ()> {
    let array = value.as_array().ok_or(())?;
    if array.is_empty() {
        return Err(());
    }
    array
        .iter()
        .map(|v| {
            let region = v.as_u64().ok_or(())?;
            if region == 0 || region > u64::from(u32::MAX) {
                return Err(());
            }
            Ok(region as u32)
        })
        .collect()
}

fn parse_windows(value: &Value) -> Result<Vec<TimeWindow>, ()> {
    let array = value.as_array().ok_or(())?;
    if array.is_empty() {
        return Err(());
    }
    array
        .iter()
        .map(|v| v.as_str().ok_or(())?.parse().map_err(|_| ()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn courier_item(id: u64) -> Value {
        json!({
            "courier_id": id,
            "courier_type": "foot",
            "regions": [1, 2],
            "working_hours": ["09:00-18:00"],
        })
    }

    fn order_item(id: u64) -> Value {
        json!({
            "order_id": id,
            "weight": 2.5,
            "region": 1,
            "delivery_hours": ["10:00-14:00"],
        })
    }

    #[test]
    fn couriers_happy_path() {
        let payload = json!({"data": [courier_item(1), courier_item(2)]});
        let couriers = validate_couriers(&payload).unwrap();
        assert_eq!(couriers.len(), 2);
        assert_eq!(couriers[0].id, 1);
        assert_eq!(couriers[0].courier_type, CourierType::Foot);
        assert_eq!(couriers[0].assigns, 0);
        assert_eq!(couriers[1].working_hours[0].to_string(), "09:00-18:00");
    }

    #[test]
    fn couriers_bad_items_aggregated_not_short_circuited() {
        let mut bad_type = courier_item(2);
        bad_type["courier_type"] = json!("rocket");
        let mut bad_window = courier_item(4);
        bad_window["working_hours"] = json!(["nine-to-five"]);
        let payload = json!({
            "data": [courier_item(1), bad_type, courier_item(3), bad_window, courier_item(5)]
        });
        assert_eq!(
            validate_couriers(&payload),
            Err(ValidationError::BadItems {
                collection: "couriers",
                ids: vec![2, 4]
            })
        );
    }

    #[test]
    fn couriers_duplicate_ids_one_aggregate_error() {
        let payload = json!({
            "data": [courier_item(1), courier_item(2), courier_item(1), courier_item(2)]
        });
        assert_eq!(
            validate_couriers(&payload),
            Err(ValidationError::DuplicateIds {
                collection: "couriers",
                ids: vec![1, 2]
            })
        );
    }

    #[test]
    fn couriers_unknown_field_flags_item() {
        let mut item = courier_item(7);
        item["vehicle"] = json!("scooter");
        let payload = json!({"data": [item]});
        assert_eq!(
            validate_couriers(&payload),
            Err(ValidationError::BadItems {
                collection: "couriers",
                ids: vec![7]
            })
        );
    }

    #[test]
    fn couriers_missing_id_rejects_whole_payload() {
        let mut item = courier_item(1);
        item.as_object_mut().unwrap().remove("courier_id");
        let payload = json!({"data": [item]});
        assert!(matches!(
            validate_couriers(&payload),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn payload_shape_enforced() {
        assert!(matches!(
            validate_couriers(&json!([1, 2])),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            validate_couriers(&json!({"data": []})),
            Err(ValidationError::Malformed(_))
        ));
        assert!(matches!(
            validate_couriers(&json!({"data": [], "extra": 1})),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn orders_weight_bounds() {
        let mut zero = order_item(1);
        zero["weight"] = json!(0.0);
        let mut heavy = order_item(2);
        heavy["weight"] = json!(50.01);
        let mut at_limit = order_item(3);
        at_limit["weight"] = json!(50.0);

        assert_eq!(
            validate_orders(&json!({"data": [zero, heavy]})),
            Err(ValidationError::BadItems {
                collection: "orders",
                ids: vec![1, 2]
            })
        );
        assert!(validate_orders(&json!({"data": [at_limit]})).is_ok());
    }

    #[test]
    fn orders_region_must_be_positive_integer() {
        let mut item = order_item(9);
        item["region"] = json!(0);
        assert_eq!(
            validate_orders(&json!({"data": [item]})),
            Err(ValidationError::BadItems {
                collection: "orders",
                ids: vec![9]
            })
        );
    }

    #[test]
    fn orders_new_are_not_assigned() {
        let orders = validate_orders(&json!({"data": [order_item(1)]})).unwrap();
        assert_eq!(orders[0].status, crate::model::OrderStatus::NotAssigned);
        assert_eq!(orders[0].courier_id, None);
        assert_eq!(orders[0].assign_time, None);
    }

    #[test]
    fn patch_accepts_subset() {
        let patch = validate_courier_patch(&json!({"regions": [11, 44, 55]})).unwrap();
        assert_eq!(patch.regions, Some(vec![11, 44, 55]));
        assert_eq!(patch.courier_type, None);
        assert_eq!(patch.working_hours, None);
    }

    #[test]
    fn patch_rejects_unknown_and_bad_fields() {
        assert!(validate_courier_patch(&json!({"assigns": 5})).is_err());
        assert!(validate_courier_patch(&json!({"working_hours": ["junk"]})).is_err());
        assert!(validate_courier_patch(&json!({"courier_type": "rocket"})).is_err());
    }

    #[test]
    fn patch_empty_is_noop() {
        assert_eq!(
            validate_courier_patch(&json!({})).unwrap(),
            CourierPatch::default()
        );
    }

    #[test]
    fn assign_takes_courier_id_only() {
        assert_eq!(validate_assign(&json!({"courier_id": 4})).unwrap(), 4);
        assert!(validate_assign(&json!({"courier_id": 4, "order_id": 1})).is_err());
        assert!(validate_assign(&json!({"courier_id": 0})).is_err());
        assert!(validate_assign(&json!({"courier_id": "4"})).is_err());
    }

    #[test]
    fn complete_parses_timestamp() {
        let req = validate_complete(&json!({
            "courier_id": 2,
            "order_id": 33,
            "complete_time": "2021-03-27T10:42:30.000000Z",
        }))
        .unwrap();
        assert_eq!(req.courier_id, 2);
        assert_eq!(req.order_id, 33);
        assert_eq!(req.complete_time.timestamp(), 1_616_841_750);
    }

    #[test]
    fn complete_rejects_bad_shapes() {
        assert!(validate_complete(&json!({"courier_id": 2, "order_id": 33})).is_err());
        assert!(
            validate_complete(&json!({
                "courier_id": 2, "order_id": 33, "complete_time": "yesterday"
            }))
            .is_err()
        );
        assert!(
            validate_complete(&json!({
                "courier_id": 2, "order_id": 33,
                "complete_time": "2021-03-27T10:42:30Z", "extra": 1
            }))
            .is_err()
        );
    }
}
