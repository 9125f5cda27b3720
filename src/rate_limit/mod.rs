//! Store-backed sliding-window rate limiter.
//!
//! Reshapes `auth::rate_limit`'s DashMap-based sliding window window into a
//! log against the `ratelimit` table, since the store is the only place
//! shared state is allowed to live. Grounded in
//! `original_source/db_utils.py`'s `ratelimit(rowid, ip, relative_timestamp)`
//! table: one row per admitted request, `relative_timestamp` counted in
//! seconds since process start.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum admitted requests per window, per source IP.
    pub max_requests: u32,
    pub window_secs: f64,
}

/// Monotonic reference point `relative_timestamp` values are measured from.
/// A `std::time::Instant`, not a wall clock, since it only needs to order
/// events within a single process lifetime.
#[derive(Clone)]
pub struct RateLimitClock(pub Instant);

impl RateLimitClock {
    pub fn new() -> Self {
        Self(Instant::now())
    }

    pub fn now_relative(&self) -> f64 {
        self.0.elapsed().as_secs_f64()
    }
}

/// Admits or rejects a request from `ip`, recording it in the store when
/// admitted. Called once per request by `rate_limit_middleware`, but
/// exposed standalone so handlers that aren't behind the axum middleware
/// (tests, `/signup`) can reuse the same check.
pub async fn check(
    state: &AppState,
    ip: &str,
) -> Result<(), AppError> {
    let now = state.rate_limit_clock.now_relative();
    let window_start = now - state.config.rate_limit_window_secs;

    let count = state.store.rate_limit_count_since(ip, window_start).await?;

    if count >= state.config.rate_limit_n as i64 {
        return Err(AppError::RateLimited {
            retry_after_secs: state.config.rate_limit_window_secs,
        });
    }

    state.store.rate_limit_record(ip, now).await?;

    // Opportunistic prune, scoped to this IP: a cheap, indexed delete run
    // on every admitted request, per spec.md §4.4 step 4.
    state.store.rate_limit_prune_before(ip, window_start).await?;

    Ok(())
}

pub async fn rate_limit_middleware(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    check(&state, &addr.ip().to_string()).await?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::store::Store;

    async fn test_state(rate_limit_n: u32, rate_limit_window_secs: f64) -> AppState {
        AppState {
            config: AppConfig {
                db_location: ":memory:".into(),
                secret_key: "test-secret".into(),
                token_url: "token".into(),
                host: "127.0.0.1".into(),
                port: 0,
                starting_balance: 100,
                jwt_expiry_seconds: 1800,
                rate_limit_n,
                rate_limit_window_secs,
            },
            store: Store::connect(":memory:").await.unwrap(),
            rate_limit_clock: RateLimitClock::new(),
        }
    }

    #[tokio::test]
    async fn admits_up_to_n_requests_then_rejects() {
        let state = test_state(5, 1.0).await;

        for _ in 0..5 {
            check(&state, "1.2.3.4").await.unwrap();
        }

        let result = check(&state, "1.2.3.4").await;
        assert!(matches!(result, Err(AppError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn tracks_each_source_ip_independently() {
        let state = test_state(1, 1.0).await;

        check(&state, "1.2.3.4").await.unwrap();
        assert!(check(&state, "1.2.3.4").await.is_err());

        // a different IP has its own budget.
        check(&state, "5.6.7.8").await.unwrap();
    }

    #[tokio::test]
    async fn admits_again_once_the_window_has_elapsed() {
        let state = test_state(5, 0.05).await;

        for _ in 0..5 {
            check(&state, "1.2.3.4").await.unwrap();
        }
        assert!(check(&state, "1.2.3.4").await.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(80)).await;
        assert!(check(&state, "1.2.3.4").await.is_ok());
    }
}
