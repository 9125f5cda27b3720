use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde::Serialize;

/// Crate-wide error type, mapped to HTTP responses at the boundary.
///
/// Mirrors the error kinds of the design: validation and auth failures are
/// raised before the engine is ever called; `InvariantViolation` and
/// `TransientStore` are the only two outcomes the engine itself may surface.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("invalid username or password")]
    BadCredentials,

    #[error("unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Conflict(String),

    #[error("too many requests")]
    RateLimited { retry_after_secs: f64 },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("store error: {0}")]
    TransientStore(#[from] sqlx::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadCredentials => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::InvariantViolation(msg) => {
                tracing::error!(violation = %msg, "engine invariant violated, transaction rolled back");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::TransientStore(err) => {
                tracing::error!(error = %err, "store error, transaction rolled back");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let mut response = (status, Json(ErrorBody { error: self.to_string() })).into_response();

        if let AppError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = format!("{:.0}", retry_after_secs.ceil()).parse::<axum::http::HeaderValue>() {
                response.headers_mut().insert("Retry-After", value);
            }
        }

        response
    }
}
