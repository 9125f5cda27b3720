use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    Gtc,
    Ioc,
}

impl Default for TimeInForce {
    fn default() -> Self {
        TimeInForce::Gtc
    }
}

/// One leg of a trade produced while matching an incoming order.
#[derive(Debug, Clone, Serialize)]
pub struct Fill {
    pub counterparty_id: i64,
    pub price: i64,
    pub quantity: i64,
}

/// The outcome of `submit`, returned to the HTTP layer for the response
/// body.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub logical_timestamp: i64,
    /// Whether an unfilled residual is now resting in the book.
    pub resting: bool,
    /// Signed residual quantity left unfilled (0 if fully matched or
    /// cancelled by IOC).
    pub remaining: i64,
    pub trades: Vec<Fill>,
}
