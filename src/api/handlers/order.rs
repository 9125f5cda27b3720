use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::auth::AuthUser;
use crate::engine;
use crate::engine::types::{Side, TimeInForce};
use crate::error::AppError;
use crate::AppState;

/// Wire shape of §6's `POST /submit` body. Validated here, at the boundary,
/// before the engine is ever called — the propagation policy is that the
/// matching engine only ever surfaces `ok` or `invariant_violation`.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitRequest {
    #[validate(range(min = 1, message = "p must be a positive price"))]
    p: i64,
    #[validate(range(min = 1, message = "q must be a positive quantity"))]
    q: i64,
    d: Side,
    #[serde(default)]
    tif: TimeInForce,
}

/// Returns the bare `logical_timestamp`, per spec.md §6's endpoint table —
/// unlike every other object-shaped row there, `/submit`'s Result column is
/// the scalar itself, not an envelope around it.
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SubmitRequest>,
) -> Result<Json<i64>, AppError> {
    body.validate()
        .map_err(|err| AppError::Validation(err.to_string()))?;

    let outcome = engine::submit(&state.store, user.participant_id, body.d, body.p, body.q, body.tif).await?;
    Ok(Json(outcome.logical_timestamp))
}

#[derive(Debug, Deserialize)]
pub struct CancelQuery {
    logical_timestamp: i64,
}

#[derive(Serialize)]
pub struct CancelResponse {
    cancelled: i64,
}

pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<CancelQuery>,
) -> Result<Json<CancelResponse>, AppError> {
    engine::cancel(&state.store, user.participant_id, query.logical_timestamp).await?;
    Ok(Json(CancelResponse {
        cancelled: query.logical_timestamp,
    }))
}

#[derive(Serialize)]
pub struct CancelAllResponse {
    count: usize,
    ids: Vec<i64>,
}

pub async fn cancel_all(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<CancelAllResponse>, AppError> {
    let ids = engine::cancel_all(&state.store, user.participant_id).await?;
    Ok(Json(CancelAllResponse {
        count: ids.len(),
        ids,
    }))
}
