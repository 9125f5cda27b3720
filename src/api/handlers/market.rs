use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::store::OrderbookLevel;
use crate::AppState;

#[derive(Serialize)]
pub struct OrderbookBody {
    buy: Vec<OrderbookLevel>,
    sell: Vec<OrderbookLevel>,
}

#[derive(Serialize)]
pub struct OrderbookResponse {
    data: OrderbookBody,
}

pub async fn orderbook(State(state): State<Arc<AppState>>) -> Result<Json<OrderbookResponse>, AppError> {
    let (buy, sell) = state.store.orderbook_snapshot().await?;
    Ok(Json(OrderbookResponse {
        data: OrderbookBody { buy, sell },
    }))
}

#[derive(Serialize)]
pub struct TradesResponse {
    data: Vec<serde_json::Value>,
}

/// Only rows whose stored event is a trade are returned, matching the
/// original's `event.type == "trade"` filter. The log has no other event
/// kind today, but the filter keeps this endpoint correct if one is added.
pub async fn trades(State(state): State<Arc<AppState>>) -> Result<Json<TradesResponse>, AppError> {
    const PAGE_SIZE: i64 = 100;
    let rows = state.store.trades(PAGE_SIZE).await?;

    let data = rows
        .into_iter()
        .filter(|entry| entry.event.get("type").and_then(|v| v.as_str()) == Some("trade"))
        .map(|entry| entry.event)
        .collect();

    Ok(Json(TradesResponse { data }))
}
