use serde::Serialize;
use sqlx::FromRow;

/// A row of the `exchange` table: a resting (unmatched) order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RestingOrder {
    pub participant_id: i64,
    pub price: i64,
    pub amount: i64,
    pub logical_timestamp: i64,
}

/// One side of an orderbook snapshot, as the wire format expects it:
/// `[price, amount]` pairs. Serializes as a two-element JSON array, matching
/// the `(price, amount)` tuples the original client-side `api.py` consumes.
#[derive(Debug, Clone, Serialize)]
pub struct OrderbookLevel(pub i64, pub i64);

/// A row of the `accounts` table.
#[derive(Debug, Clone, Copy, FromRow, Serialize)]
pub struct Account {
    pub balance: i64,
    pub stock: i64,
}

/// The append-only event a trade produces in the `log` table.
#[derive(Debug, Clone, Serialize)]
pub struct TradeEvent {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub buyer_id: i64,
    pub seller_id: i64,
    pub amount: i64,
    pub price: i64,
    pub wall_time: String,
}

impl TradeEvent {
    pub fn new(buyer_id: i64, seller_id: i64, amount: i64, price: i64, wall_time: String) -> Self {
        Self {
            kind: "trade",
            buyer_id,
            seller_id,
            amount,
            price,
            wall_time,
        }
    }
}

/// A row read back out of the `log` table, with its stored event decoded.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub event: serde_json::Value,
    pub timestamp: String,
}
