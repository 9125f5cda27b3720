pub mod types;

use std::collections::HashMap;

use crate::error::AppError;
use crate::store::Store;
use types::{Side, SubmitOutcome, TimeInForce};

/// Matches an incoming order against the resting book and settles any
/// resulting trades, all inside a single transaction.
///
/// Grounded directly in `original_source/trading_engine/engine.py::limit_order`:
/// a buy is represented as a positive `amount`, a sell as negative, and the
/// book is scanned at price-then-time priority for the opposite sign. Unlike
/// the original, which keeps the book as a Python-side `sqlite3.Cursor`
/// passed around by the caller, every read and write here goes through
/// `Store`, so no matching state is held outside the transaction.
pub async fn submit(
    store: &Store,
    participant_id: i64,
    side: Side,
    price: i64,
    quantity: i64,
    time_in_force: TimeInForce,
) -> Result<SubmitOutcome, AppError> {
    if price <= 0 {
        return Err(AppError::Validation("price must be positive".into()));
    }
    if quantity <= 0 {
        return Err(AppError::Validation("quantity must be positive".into()));
    }

    let signed_amount = match side {
        Side::Buy => quantity,
        Side::Sell => -quantity,
    };

    let mut tx = store.begin().await?;

    let own_timestamp = Store::insert_order(&mut tx, participant_id, price, signed_amount).await?;

    let matching = match side {
        Side::Buy => Store::fetch_asks_at_or_below(&mut tx, price).await?,
        Side::Sell => Store::fetch_bids_at_or_above(&mut tx, price).await?,
    };

    let mut remaining = signed_amount;
    let mut trades = Vec::new();
    let mut fully_matched = false;

    // Per-participant (balance_delta, stock_delta), accumulated across the
    // whole walk and applied as one UPDATE per affected account per
    // dimension (spec.md §4.2 step 5), instead of one UPDATE per leg.
    let mut deltas: HashMap<i64, (i64, i64)> = HashMap::new();

    for resting in matching {
        let counter_amount = resting.amount;

        // `remaining` and `counter_amount` always carry opposite signs here:
        // the book query only returns orders on the other side.
        if remaining.abs() > counter_amount.abs() {
            let traded_quantity = counter_amount.abs();
            remaining += counter_amount;

            Store::delete_order(&mut tx, resting.logical_timestamp).await?;
            settle_trade(&mut tx, participant_id, &resting, traded_quantity, &side, &mut trades, &mut deltas).await?;
        } else if remaining.abs() == counter_amount.abs() {
            let traded_quantity = counter_amount.abs();
            Store::delete_order(&mut tx, resting.logical_timestamp).await?;
            settle_trade(&mut tx, participant_id, &resting, traded_quantity, &side, &mut trades, &mut deltas).await?;
            Store::delete_order(&mut tx, own_timestamp).await?;
            fully_matched = true;
            break;
        } else {
            // The resting order is bigger than what's left of ours: only
            // `remaining` actually trades, and the resting order's size
            // shrinks by that amount but keeps its side's sign.
            let traded_quantity = remaining.abs();
            let leftover = counter_amount + remaining;
            Store::update_order_amount(&mut tx, resting.logical_timestamp, leftover).await?;
            settle_trade(&mut tx, participant_id, &resting, traded_quantity, &side, &mut trades, &mut deltas).await?;
            Store::delete_order(&mut tx, own_timestamp).await?;
            fully_matched = true;
            break;
        }
    }

    if !fully_matched {
        match time_in_force {
            TimeInForce::Gtc => {
                Store::update_order_amount(&mut tx, own_timestamp, remaining).await?;
            }
            TimeInForce::Ioc => {
                Store::delete_order(&mut tx, own_timestamp).await?;
            }
        }
    }

    for (account_id, (balance_delta, stock_delta)) in deltas {
        Store::apply_balance_delta(&mut tx, account_id, balance_delta, stock_delta).await?;
    }

    tx.commit().await?;

    Ok(SubmitOutcome {
        logical_timestamp: own_timestamp,
        resting: !fully_matched && time_in_force == TimeInForce::Gtc && remaining != 0,
        remaining: if fully_matched { 0 } else { remaining },
        trades,
    })
}

/// Settles one matched leg: accumulates the balance/stock deltas for the
/// incoming participant and the resting counterparty into `deltas` (applied
/// as a single UPDATE per account after the whole walk completes, per
/// spec.md §4.2 step 5), and appends a trade event to the log, priced at
/// the resting order's price (the maker sets the price, as in the
/// original).
async fn settle_trade(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    taker_id: i64,
    resting: &crate::store::RestingOrder,
    traded_quantity: i64,
    taker_side: &Side,
    trades: &mut Vec<types::Fill>,
    deltas: &mut HashMap<i64, (i64, i64)>,
) -> Result<(), AppError> {
    let trade_price = resting.price;
    let cash = traded_quantity * trade_price;

    let (buyer_id, seller_id) = match taker_side {
        Side::Buy => (taker_id, resting.participant_id),
        Side::Sell => (resting.participant_id, taker_id),
    };

    let buyer_entry = deltas.entry(buyer_id).or_insert((0, 0));
    buyer_entry.0 -= cash;
    buyer_entry.1 += traded_quantity;

    let seller_entry = deltas.entry(seller_id).or_insert((0, 0));
    seller_entry.0 += cash;
    seller_entry.1 -= traded_quantity;

    Store::append_trade(tx, buyer_id, seller_id, traded_quantity, trade_price).await?;

    trades.push(types::Fill {
        counterparty_id: resting.participant_id,
        price: trade_price,
        quantity: traded_quantity,
    });

    Ok(())
}

/// Cancels a single resting order. Only the owning participant may cancel
/// it; an unknown or foreign `logical_timestamp` reports the same
/// `Unauthorized` outcome rather than leaking whether the order id exists,
/// which is also what makes cancelling a gone-already order idempotent.
pub async fn cancel(store: &Store, participant_id: i64, logical_timestamp: i64) -> Result<(), AppError> {
    let mut tx = store.begin().await?;
    let removed = Store::delete_order_owned_by(&mut tx, logical_timestamp, participant_id).await?;
    tx.commit().await?;

    if removed {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Cancels every resting order belonging to `participant_id`, returning the
/// logical timestamps removed. Idempotent: cancelling an empty book just
/// returns an empty list.
pub async fn cancel_all(store: &Store, participant_id: i64) -> Result<Vec<i64>, AppError> {
    let mut tx = store.begin().await?;
    let removed = Store::delete_all_orders_for(&mut tx, participant_id).await?;
    tx.commit().await?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Opens an in-memory store and registers `a` and `b` with the given
    /// starting balances, stock at zero. Returns their participant ids.
    async fn two_accounts(a_balance: i64, b_balance: i64) -> (Store, i64, i64) {
        let store = Store::connect(":memory:").await.unwrap();
        let a = store.signup("a", "unused-hash", a_balance).await.unwrap();
        let b = store.signup("b", "unused-hash", b_balance).await.unwrap();
        (store, a, b)
    }

    #[tokio::test]
    async fn s1_simple_cross() {
        let (store, a, b) = two_accounts(100, 100).await;

        submit(&store, a, Side::Sell, 31, 5, TimeInForce::Gtc).await.unwrap();
        let outcome = submit(&store, b, Side::Buy, 31, 5, TimeInForce::Gtc).await.unwrap();

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.remaining, 0);

        let (buy, sell) = store.orderbook_snapshot().await.unwrap();
        assert!(buy.is_empty());
        assert!(sell.is_empty());

        let account_a = store.account(a).await.unwrap();
        let account_b = store.account(b).await.unwrap();
        assert_eq!((account_a.balance, account_a.stock), (255, -5));
        assert_eq!((account_b.balance, account_b.stock), (-55, 5));

        let trades = store.trades(10).await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].event["buyer_id"], b);
        assert_eq!(trades[0].event["seller_id"], a);
        assert_eq!(trades[0].event["amount"], 5);
        assert_eq!(trades[0].event["price"], 31);
    }

    #[tokio::test]
    async fn s2_partial_fill_leaves_gtc_remainder() {
        let (store, a, b) = two_accounts(100, 100).await;

        submit(&store, a, Side::Sell, 31, 5, TimeInForce::Gtc).await.unwrap();
        submit(&store, b, Side::Buy, 31, 3, TimeInForce::Gtc).await.unwrap();

        let (_, sell) = store.orderbook_snapshot().await.unwrap();
        assert_eq!(sell.len(), 1);
        assert_eq!((sell[0].0, sell[0].1), (31, -2));

        let account_a = store.account(a).await.unwrap();
        let account_b = store.account(b).await.unwrap();
        assert_eq!((account_a.balance, account_a.stock), (193, -3));
        assert_eq!((account_b.balance, account_b.stock), (7, 3));
    }

    #[tokio::test]
    async fn s3_ioc_drops_unfilled_remainder() {
        let (store, a, b) = two_accounts(100, 100).await;

        submit(&store, a, Side::Sell, 31, 5, TimeInForce::Gtc).await.unwrap();
        let outcome = submit(&store, b, Side::Buy, 31, 10, TimeInForce::Ioc).await.unwrap();

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].quantity, 5);

        let (buy, sell) = store.orderbook_snapshot().await.unwrap();
        assert!(buy.is_empty());
        assert!(sell.is_empty());

        let account_a = store.account(a).await.unwrap();
        let account_b = store.account(b).await.unwrap();
        assert_eq!((account_a.balance, account_a.stock), (255, -5));
        assert_eq!((account_b.balance, account_b.stock), (-55, 5));
    }

    #[tokio::test]
    async fn s4_better_price_wins_over_arrival_order() {
        let (store, a, b) = two_accounts(100, 100).await;

        submit(&store, a, Side::Sell, 32, 5, TimeInForce::Gtc).await.unwrap();
        submit(&store, b, Side::Sell, 31, 5, TimeInForce::Gtc).await.unwrap();

        let taker = store.signup("c", "unused-hash", 100).await.unwrap();
        submit(&store, taker, Side::Buy, 32, 5, TimeInForce::Gtc).await.unwrap();

        let orders_a = store.active_orders(a).await.unwrap();
        let orders_b = store.active_orders(b).await.unwrap();
        assert_eq!(orders_a.len(), 1, "A's higher-priced ask should still be resting");
        assert!(orders_b.is_empty(), "B's better-priced ask should have been consumed first");
    }

    #[tokio::test]
    async fn s5_earlier_order_wins_at_equal_price() {
        let (store, a, b) = two_accounts(100, 100).await;

        submit(&store, a, Side::Sell, 31, 5, TimeInForce::Gtc).await.unwrap();
        submit(&store, b, Side::Sell, 31, 5, TimeInForce::Gtc).await.unwrap();

        let taker = store.signup("c", "unused-hash", 100).await.unwrap();
        submit(&store, taker, Side::Buy, 32, 5, TimeInForce::Gtc).await.unwrap();

        assert!(store.active_orders(a).await.unwrap().is_empty(), "A arrived first and should be consumed");
        assert_eq!(store.active_orders(b).await.unwrap().len(), 1, "B should still be resting");
    }

    #[tokio::test]
    async fn logical_clock_is_strictly_increasing() {
        let (store, a, _b) = two_accounts(1000, 1000).await;

        let mut timestamps = Vec::new();
        for price in 1..=5 {
            let outcome = submit(&store, a, Side::Sell, price, 1, TimeInForce::Gtc).await.unwrap();
            timestamps.push(outcome.logical_timestamp);
        }

        let mut sorted = timestamps.clone();
        sorted.sort();
        assert_eq!(timestamps, sorted, "timestamps should already arrive in increasing order");
        assert_eq!(timestamps.len(), timestamps.iter().collect::<std::collections::HashSet<_>>().len());
    }

    #[tokio::test]
    async fn cash_and_inventory_are_conserved_across_a_cross() {
        let (store, a, b) = two_accounts(100, 100).await;

        submit(&store, a, Side::Sell, 31, 5, TimeInForce::Gtc).await.unwrap();
        submit(&store, b, Side::Buy, 31, 5, TimeInForce::Gtc).await.unwrap();

        let account_a = store.account(a).await.unwrap();
        let account_b = store.account(b).await.unwrap();
        assert_eq!(account_a.balance + account_b.balance, 200);
        assert_eq!(account_a.stock + account_b.stock, 0);
    }

    #[tokio::test]
    async fn cancel_of_foreign_order_is_unauthorized_and_idempotent() {
        let (store, a, b) = two_accounts(100, 100).await;
        let outcome = submit(&store, a, Side::Sell, 31, 5, TimeInForce::Gtc).await.unwrap();

        let result = cancel(&store, b, outcome.logical_timestamp).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));

        // state wasn't mutated: the order is still resting for `a`.
        assert_eq!(store.active_orders(a).await.unwrap().len(), 1);

        let result_again = cancel(&store, b, outcome.logical_timestamp).await;
        assert!(matches!(result_again, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn cancel_of_unknown_order_is_unauthorized() {
        let (store, a, _b) = two_accounts(100, 100).await;
        let result = cancel(&store, a, 999_999).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn book_never_crosses_after_a_submit() {
        let (store, a, b) = two_accounts(100, 100).await;

        // a resting bid at 30 and a non-marketable ask at 31 (31 > 30, so
        // nothing trades) leave both sides resting without crossing.
        submit(&store, a, Side::Buy, 30, 5, TimeInForce::Gtc).await.unwrap();
        submit(&store, b, Side::Sell, 31, 8, TimeInForce::Gtc).await.unwrap();

        let (buy, sell) = store.orderbook_snapshot().await.unwrap();
        assert_eq!(buy.len(), 1);
        assert_eq!(sell.len(), 1);

        let best_bid = buy.iter().map(|level| level.0).max().unwrap();
        let best_ask = sell.iter().map(|level| level.0).min().unwrap();
        assert!(best_bid < best_ask, "resting book must never be crossed");
    }
}
