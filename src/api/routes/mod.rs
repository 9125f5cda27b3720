use axum::{middleware as axum_middleware, routing::{get, post}, Router};
use std::sync::Arc;

use crate::api::handlers;
use crate::auth::middleware::auth_middleware;
use crate::rate_limit::rate_limit_middleware;
use crate::AppState;

/// Builds the full request router. Rate limiting is layered outermost so it
/// runs before auth decoding or any handler work, per the admission-before-
/// expensive-work ordering the design calls for; auth is layered only over
/// the routes that require it.
pub fn create_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let public_routes = Router::new()
        .route("/", get(handlers::root::greeting))
        .route("/orderbook", get(handlers::market::orderbook))
        .route("/trades", get(handlers::market::trades))
        .route("/signup", post(handlers::auth::signup))
        .route(&format!("/{}", state.config.token_url), post(handlers::auth::issue_token));

    let protected_routes = Router::new()
        .route("/balance", get(handlers::account::balance))
        .route("/orders/active", get(handlers::account::active_orders))
        .route("/submit", post(handlers::order::submit))
        .route("/cancel", post(handlers::order::cancel))
        .route("/cancel/all", post(handlers::order::cancel_all))
        .route("/me", get(handlers::account::me))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(axum_middleware::from_fn_with_state(state, rate_limit_middleware))
}
