use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{patch, post};
use axum::{Json, Router};
use chrono::SecondsFormat;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::engine::{Engine, EngineError};
use crate::observability;
use crate::validate::{self, ValidationError};

pub type SharedEngine = Arc<Engine>;

pub fn router(engine: SharedEngine) -> Router {
    Router::new()
        .route("/couriers", post(post_couriers))
        .route("/couriers/:courier_id", patch(patch_courier))
        .route("/orders", post(post_orders))
        .route("/orders/assign", post(assign_orders))
        .route("/orders/complete", post(complete_order))
        .with_state(engine)
}

// ── Error mapping ────────────────────────────────────────────────

/// Every rejected request is a 400 with a JSON body; errors never reveal
/// more than the validation/engine message.
pub struct ApiError(Value);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self.0)).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::BadItems { collection, ids } => {
                ApiError(item_error_body(collection, &ids))
            }
            ValidationError::DuplicateIds { collection, ids } => ApiError(json!({
                "validation_error": {
                    "message": format!("{collection} ids are not unique"),
                    "ids": ids,
                }
            })),
            ValidationError::Malformed(msg) => ApiError(json!({ "error": msg })),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError(json!({ "error": err.to_string() }))
    }
}

fn item_error_body(collection: &str, ids: &[u64]) -> Value {
    let items: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
    let mut inner = serde_json::Map::new();
    inner.insert(collection.to_string(), Value::Array(items));
    json!({ "validation_error": Value::Object(inner) })
}

/// Body that failed to parse as JSON (or arrived with the wrong content
/// type). Always 400, matching the rest of the error channel.
fn bad_json(rejection: JsonRejection) -> ApiError {
    warn!("rejected request body: {rejection}");
    ApiError(json!({ "error": format!("error when parsing JSON: {rejection}") }))
}

/// Path segment that failed to parse as an id. Same 400 JSON channel as
/// everything else; axum's default rejection would answer in plain text.
fn bad_path(rejection: PathRejection) -> ApiError {
    warn!("rejected request path: {rejection}");
    ApiError(json!({ "error": format!("error when parsing path: {rejection}") }))
}

fn respond(
    endpoint: &'static str,
    started: Instant,
    result: Result<Value, ApiError>,
) -> Response {
    let status = if result.is_ok() { "ok" } else { "error" };
    metrics::counter!(observability::REQUESTS_TOTAL, "endpoint" => endpoint, "status" => status)
        .increment(1);
    metrics::histogram!(observability::REQUEST_DURATION_SECONDS, "endpoint" => endpoint)
        .record(started.elapsed().as_secs_f64());
    match result {
        Ok(body) => (StatusCode::CREATED, Json(body)).into_response(),
        Err(err) => err.into_response(),
    }
}

// ── Response shapes ──────────────────────────────────────────────

#[derive(Serialize)]
struct IdRef {
    id: u64,
}

#[derive(Serialize)]
struct AssignBody {
    orders: Vec<IdRef>,
    /// Omitted entirely when the batch is empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    assign_time: Option<String>,
}

fn id_refs(ids: &[u64]) -> Vec<IdRef> {
    ids.iter().map(|&id| IdRef { id }).collect()
}

// ── Handlers ─────────────────────────────────────────────────────

async fn post_couriers(
    State(engine): State<SharedEngine>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let result = async {
        let Json(payload) = payload.map_err(bad_json)?;
        let couriers = validate::validate_couriers(&payload)?;
        let ids = engine.ingest_couriers(couriers).await?;
        Ok(json!({ "couriers": id_refs(&ids) }))
    }
    .await;
    respond("post_couriers", started, result)
}

async fn patch_courier(
    State(engine): State<SharedEngine>,
    courier_id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let result = async {
        let Path(courier_id) = courier_id.map_err(bad_path)?;
        let Json(payload) = payload.map_err(bad_json)?;
        let patch = validate::validate_courier_patch(&payload)?;
        let courier = engine.patch_courier(courier_id, patch).await?;
        Ok(serde_json::to_value(courier).map_err(|e| ApiError(json!({ "error": e.to_string() })))?)
    }
    .await;
    respond("patch_courier", started, result)
}

async fn post_orders(
    State(engine): State<SharedEngine>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let result = async {
        let Json(payload) = payload.map_err(bad_json)?;
        let orders = validate::validate_orders(&payload)?;
        let ids = engine.ingest_orders(orders).await?;
        Ok(json!({ "orders": id_refs(&ids) }))
    }
    .await;
    respond("post_orders", started, result)
}

async fn assign_orders(
    State(engine): State<SharedEngine>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let result = async {
        let Json(payload) = payload.map_err(bad_json)?;
        let courier_id = validate::validate_assign(&payload)?;
        let batch = engine.assign_orders(courier_id).await?;
        let body = AssignBody {
            orders: id_refs(&batch.order_ids),
            assign_time: batch
                .assign_time
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Micros, true)),
        };
        Ok(serde_json::to_value(body).map_err(|e| ApiError(json!({ "error": e.to_string() })))?)
    }
    .await;
    respond("assign_orders", started, result)
}

async fn complete_order(
    State(engine): State<SharedEngine>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let result = async {
        let Json(payload) = payload.map_err(bad_json)?;
        let req = validate::validate_complete(&payload)?;
        let order_id = engine
            .complete_order(req.courier_id, req.order_id, req.complete_time)
            .await?;
        Ok(json!({ "order_id": order_id }))
    }
    .await;
    respond("complete_order", started, result)
}
