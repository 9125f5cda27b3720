use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::auth::jwt::JwtManager;
use crate::error::AppError;
use crate::AppState;

/// The authenticated participant for the current request, inserted into
/// request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub participant_id: i64,
    pub name: String,
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(AppError::Unauthorized),
    };

    let jwt_manager = JwtManager::new(&state.config.secret_key, state.config.jwt_expiry_seconds);
    let claims = jwt_manager
        .verify_token(token)
        .map_err(|_| AppError::Unauthorized)?;

    let (participant_id, _) = state
        .store
        .find_auth_by_name(&claims.sub)
        .await?
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthUser {
        participant_id,
        name: claims.sub,
    });

    Ok(next.run(request).await)
}
