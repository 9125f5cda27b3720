use axum::{extract::State, Extension, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::store::{Account, RestingOrder};
use crate::AppState;

#[derive(Serialize)]
pub struct MeResponse {
    participant_id: i64,
    name: String,
}

pub async fn me(Extension(user): Extension<AuthUser>) -> Json<MeResponse> {
    Json(MeResponse {
        participant_id: user.participant_id,
        name: user.name,
    })
}

pub async fn balance(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Account>, AppError> {
    let account = state.store.account(user.participant_id).await?;
    Ok(Json(account))
}

/// Bare array, per spec.md §6: `/orders/active`'s Result column is "caller's
/// resting rows", not an object wrapping them.
pub async fn active_orders(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<RestingOrder>>, AppError> {
    let orders = state.store.active_orders(user.participant_id).await?;
    Ok(Json(orders))
}
