//! Sequence CRUD routes.
//!
//! | Verb | Path |
//! |---|---|
//! | GET, POST, PUT | `/api/config/:db/:model_id/sequences` |
//! | DELETE | `/api/config/:db/:model_id/sequences/:sequence_id` |
//! | GET, POST | `/api/config/:db/:model_id/sequences/:sequence_id/states` |
//! | DELETE | `/api/config/:db/:model_id/sequences/:sequence_id/states/:state_id` |
//!
//! Bodies are JSON: `{sequence}` for POST/PUT on sequences, `{state}` or
//! `{states}` for POST on states.
//!
//! Store errors answer with their own status code (404 when they carry none)
//! and a JSON body describing the error.

use std::sync::PoisonError;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use spotlight_store::{Sequence, SequenceState, SequenceStore, SequenceStores, StoreError};
use tracing::warn;

type ApiResult = Result<Json<Value>, ApiError>;
type Body = Result<Json<Value>, JsonRejection>;

/// Build the CRUD router over `stores`.  A known path with an unsupported
/// verb is answered like an unknown route.
pub fn router(stores: SequenceStores) -> Router {
    Router::new()
        .route(
            "/api/config/:db/:model_id/sequences",
            get(list_sequences)
                .post(add_sequence)
                .put(update_sequence)
                .fallback(unknown_route),
        )
        .route(
            "/api/config/:db/:model_id/sequences/:sequence_id",
            delete(delete_sequence).fallback(unknown_route),
        )
        .route(
            "/api/config/:db/:model_id/sequences/:sequence_id/states",
            get(list_states).post(add_states).fallback(unknown_route),
        )
        .route(
            "/api/config/:db/:model_id/sequences/:sequence_id/states/:state_id",
            delete(delete_state).fallback(unknown_route),
        )
        .with_state(stores)
}

async fn unknown_route() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "statusCode": 404, "error": "Not Found" })),
    )
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A [`StoreError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::NOT_FOUND);
        warn!(status = status.as_u16(), error = %self.0, "api request failed");
        (status, Json(self.0.to_json())).into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_sequences(
    State(stores): State<SequenceStores>,
    Path((db, model_id)): Path<(String, String)>,
) -> ApiResult {
    with_store(&stores, &db, |s| to_json(s.get_sequences(&model_id)?))
}

async fn add_sequence(
    State(stores): State<SequenceStores>,
    Path((db, model_id)): Path<(String, String)>,
    body: Body,
) -> ApiResult {
    let sequence: Sequence = field(body, "sequence")?;
    with_store(&stores, &db, |s| to_json(s.add_sequence(&model_id, sequence)?))
}

async fn update_sequence(
    State(stores): State<SequenceStores>,
    Path((db, model_id)): Path<(String, String)>,
    body: Body,
) -> ApiResult {
    let sequence: Sequence = field(body, "sequence")?;
    with_store(&stores, &db, |s| to_json(s.update_sequence(&model_id, sequence)?))
}

async fn delete_sequence(
    State(stores): State<SequenceStores>,
    Path((db, model_id, sequence_id)): Path<(String, String, String)>,
) -> ApiResult {
    with_store(&stores, &db, |s| to_json(s.delete_sequence(&model_id, &sequence_id)?))
}

async fn list_states(
    State(stores): State<SequenceStores>,
    Path((db, model_id, sequence_id)): Path<(String, String, String)>,
) -> ApiResult {
    with_store(&stores, &db, |s| to_json(s.get_states(&model_id, &sequence_id)?))
}

async fn add_states(
    State(stores): State<SequenceStores>,
    Path((db, model_id, sequence_id)): Path<(String, String, String)>,
    body: Body,
) -> ApiResult {
    let states = parse_states(body)?;
    with_store(&stores, &db, |s| {
        to_json(s.add_states(&model_id, &sequence_id, states)?)
    })
}

async fn delete_state(
    State(stores): State<SequenceStores>,
    Path((db, model_id, sequence_id, state_id)): Path<(String, String, String, String)>,
) -> ApiResult {
    with_store(&stores, &db, |s| {
        to_json(s.delete_state(&model_id, &sequence_id, &state_id)?)
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn with_store<F>(stores: &SequenceStores, db: &str, f: F) -> ApiResult
where
    F: FnOnce(&mut SequenceStore) -> Result<Value, StoreError>,
{
    let store = stores.get(db)?;
    let mut guard = store.lock().unwrap_or_else(PoisonError::into_inner);
    Ok(Json(f(&mut guard)?))
}

fn to_json<T: serde::Serialize>(value: T) -> Result<Value, StoreError> {
    Ok(serde_json::to_value(value)?)
}

fn body_value(body: Body) -> Result<Value, StoreError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| StoreError::BadRequest(rejection.body_text()))
}

fn take_field<T: DeserializeOwned>(value: &mut Value, name: &str) -> Result<T, StoreError> {
    let inner = value
        .get_mut(name)
        .map(Value::take)
        .ok_or_else(|| StoreError::BadRequest(format!("missing `{name}` in body")))?;
    serde_json::from_value(inner)
        .map_err(|e| StoreError::BadRequest(format!("invalid `{name}`: {e}")))
}

fn field<T: DeserializeOwned>(body: Body, name: &str) -> Result<T, StoreError> {
    take_field(&mut body_value(body)?, name)
}

/// `{"state": {..}}` or `{"states": [..]}`.
fn parse_states(body: Body) -> Result<Vec<SequenceState>, StoreError> {
    let mut value = body_value(body)?;
    if value.get("states").is_some() {
        take_field(&mut value, "states")
    } else {
        take_field::<SequenceState>(&mut value, "state").map(|s| vec![s])
    }
}
