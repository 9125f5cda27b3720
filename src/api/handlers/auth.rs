use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::jwt::JwtManager;
use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupQuery {
    name: String,
    password: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    participant_id: i64,
    name: String,
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SignupQuery>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let participant_id = crate::auth::signup(
        &state.store,
        &query.name,
        &query.password,
        state.config.starting_balance,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            participant_id,
            name: query.name,
        }),
    ))
}

/// Form body matches `OAuth2PasswordRequestForm`'s `username`/`password`
/// fields, as `original_source/trading_engine/api.py`'s `/token` endpoint
/// expects, even though nothing here is OAuth2.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    access_token: String,
    token_type: &'static str,
}

pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    crate::auth::authenticate(&state.store, &form.username, &form.password).await?;

    let jwt_manager = JwtManager::new(&state.config.secret_key, state.config.jwt_expiry_seconds);
    let access_token = jwt_manager
        .generate_token(&form.username)
        .map_err(|err| AppError::InvariantViolation(format!("token generation: {err}")))?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}
