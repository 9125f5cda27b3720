use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod config;
mod engine;
mod error;
mod rate_limit;
mod store;

use crate::config::AppConfig;
use crate::rate_limit::RateLimitClock;
use crate::store::Store;

pub struct AppState {
    pub config: AppConfig,
    pub store: Store,
    pub rate_limit_clock: RateLimitClock,
}

/// Tiny operator-facing flag check: `--reset` drops and recreates every
/// table before the server starts serving, `--seed` additionally seeds the
/// two demo accounts (rik/ada), mirroring
/// `original_source/trading_engine/db_utils.py`'s `create_db`/
/// `create_mock_db` split. Not a CLI framework — just `std::env::args()`,
/// since nothing else here needs subcommands or flag parsing.
struct BootstrapFlags {
    reset: bool,
    seed: bool,
}

fn parse_bootstrap_flags() -> BootstrapFlags {
    let args: Vec<String> = std::env::args().skip(1).collect();
    BootstrapFlags {
        reset: args.iter().any(|a| a == "--reset"),
        seed: args.iter().any(|a| a == "--seed"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bluelagoon_exchange=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;
    let flags = parse_bootstrap_flags();

    tracing::info!("starting bluelagoon-exchange v{}", env!("CARGO_PKG_VERSION"));

    let store = Store::connect(&config.db_location).await?;
    tracing::info!(db_location = %config.db_location, "store connected");

    if flags.reset {
        store.reset().await?;
        tracing::info!("schema reset: every table dropped and recreated");
    }

    if flags.seed || config.db_location == ":memory:" {
        store.seed_demo_accounts().await?;
        tracing::info!("seeded demo accounts rik/ada");
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        rate_limit_clock: RateLimitClock::new(),
    });

    let app = Router::new()
        .merge(api::routes::create_router(state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
