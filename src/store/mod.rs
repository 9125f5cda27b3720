mod schema;
pub mod types;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

pub use types::{Account, LogEntry, OrderbookLevel, RestingOrder, TradeEvent};

/// Owns the single `SqlitePool` the process talks to. Every piece of shared
/// state lives here; there is no in-memory order book or account cache
/// anywhere else in the process.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (and, for file-backed locations, creates) the database at
    /// `db_location`, which is either a filesystem path or the literal
    /// `:memory:`, exactly as `original_source/trading_engine/db_utils.py`
    /// treats its `DB_LOCATION` environment variable.
    pub async fn connect(db_location: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_location}"))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            // a single writer connection avoids SQLITE_BUSY under concurrent
            // transactions; sqlite serializes writes regardless of pool size
            .max_connections(if db_location == ":memory:" { 1 } else { 5 })
            .connect_with(options)
            .await?;

        schema::ensure_schema(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn reset(&self) -> Result<(), sqlx::Error> {
        schema::reset_schema(&self.pool).await
    }

    pub async fn seed_demo_accounts(&self) -> Result<(), sqlx::Error> {
        schema::seed_demo_accounts(&self.pool).await
    }

    /// Starts a transaction. Every operation that must observe-and-mutate the
    /// store atomically (order submission, cancellation, signup) runs inside
    /// one of these.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'_, sqlx::Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    // ---- order book -----------------------------------------------------

    /// Inserts a new resting order and returns the logical timestamp SQLite
    /// assigned it via `AUTOINCREMENT`. This value is the sole clock the
    /// matching engine trusts for ordering.
    pub async fn insert_order(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        participant_id: i64,
        price: i64,
        amount: i64,
    ) -> Result<i64, sqlx::Error> {
        let row = sqlx::query(
            "INSERT INTO exchange (participant_id, price, amount) VALUES (?1, ?2, ?3) RETURNING logical_timestamp",
        )
        .bind(participant_id)
        .bind(price)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await?;

        row.try_get("logical_timestamp")
    }

    /// Resting sell orders priced at or below `price`, in price-time
    /// priority (lowest price first, ties broken by earliest timestamp).
    /// Used to match an incoming buy order.
    pub async fn fetch_asks_at_or_below(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        price: i64,
    ) -> Result<Vec<RestingOrder>, sqlx::Error> {
        sqlx::query_as::<_, RestingOrder>(
            "SELECT participant_id, price, amount, logical_timestamp FROM exchange \
             WHERE amount < 0 AND price <= ?1 \
             ORDER BY price ASC, logical_timestamp ASC",
        )
        .bind(price)
        .fetch_all(&mut **tx)
        .await
    }

    /// Resting buy orders priced at or above `price`, in price-time
    /// priority (highest price first, ties broken by earliest timestamp).
    /// Used to match an incoming sell order.
    pub async fn fetch_bids_at_or_above(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        price: i64,
    ) -> Result<Vec<RestingOrder>, sqlx::Error> {
        sqlx::query_as::<_, RestingOrder>(
            "SELECT participant_id, price, amount, logical_timestamp FROM exchange \
             WHERE amount > 0 AND price >= ?1 \
             ORDER BY price DESC, logical_timestamp ASC",
        )
        .bind(price)
        .fetch_all(&mut **tx)
        .await
    }

    pub async fn update_order_amount(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        logical_timestamp: i64,
        amount: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE exchange SET amount = ?1 WHERE logical_timestamp = ?2")
            .bind(amount)
            .bind(logical_timestamp)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn delete_order(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        logical_timestamp: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM exchange WHERE logical_timestamp = ?1")
            .bind(logical_timestamp)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Deletes an order only if it still belongs to `participant_id`, for
    /// use by the cancel endpoint. Returns whether a row was removed.
    pub async fn delete_order_owned_by(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        logical_timestamp: i64,
        participant_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM exchange WHERE logical_timestamp = ?1 AND participant_id = ?2",
        )
        .bind(logical_timestamp)
        .bind(participant_id)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Deletes every resting order owned by `participant_id` and returns the
    /// logical timestamps removed, for `/cancel/all`'s `{count, ids}` body.
    pub async fn delete_all_orders_for(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        participant_id: i64,
    ) -> Result<Vec<i64>, sqlx::Error> {
        let rows = sqlx::query(
            "DELETE FROM exchange WHERE participant_id = ?1 RETURNING logical_timestamp",
        )
        .bind(participant_id)
        .fetch_all(&mut **tx)
        .await?;
        Ok(rows.into_iter().map(|row| row.get("logical_timestamp")).collect())
    }

    pub async fn active_orders(&self, participant_id: i64) -> Result<Vec<RestingOrder>, sqlx::Error> {
        sqlx::query_as::<_, RestingOrder>(
            "SELECT participant_id, price, amount, logical_timestamp FROM exchange \
             WHERE participant_id = ?1 ORDER BY logical_timestamp ASC",
        )
        .bind(participant_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Aggregates resting orders into the `[price, amount]` levels the
    /// `/orderbook` endpoint returns: bids descending by price, asks
    /// ascending by price.
    pub async fn orderbook_snapshot(&self) -> Result<(Vec<OrderbookLevel>, Vec<OrderbookLevel>), sqlx::Error> {
        let bids = sqlx::query(
            "SELECT price, SUM(amount) AS amount FROM exchange WHERE amount > 0 \
             GROUP BY price ORDER BY price DESC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| OrderbookLevel(row.get("price"), row.get("amount")))
        .collect();

        let asks = sqlx::query(
            "SELECT price, SUM(amount) AS amount FROM exchange WHERE amount < 0 \
             GROUP BY price ORDER BY price ASC",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| OrderbookLevel(row.get("price"), row.get("amount")))
        .collect();

        Ok((bids, asks))
    }

    // ---- accounts ---------------------------------------------------

    pub async fn account(&self, participant_id: i64) -> Result<Account, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            "SELECT balance, stock FROM accounts WHERE participant_id = ?1",
        )
        .bind(participant_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn apply_balance_delta(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        participant_id: i64,
        balance_delta: i64,
        stock_delta: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE accounts SET balance = balance + ?1, stock = stock + ?2 WHERE participant_id = ?3",
        )
        .bind(balance_delta)
        .bind(stock_delta)
        .bind(participant_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    // ---- trade log ----------------------------------------------------

    pub async fn append_trade(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        buyer_id: i64,
        seller_id: i64,
        amount: i64,
        price: i64,
    ) -> Result<(), sqlx::Error> {
        let event = TradeEvent::new(buyer_id, seller_id, amount, price, Utc::now().to_rfc3339());
        let payload = serde_json::to_string(&event).expect("TradeEvent always serializes");

        sqlx::query("INSERT INTO log (event, timestamp) VALUES (?1, ?2)")
            .bind(payload)
            .bind(event.wall_time)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn trades(&self, limit: i64) -> Result<Vec<LogEntry>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT event, timestamp FROM log ORDER BY rowid DESC LIMIT ?1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let raw: String = row.get("event");
                let event = serde_json::from_str(&raw).unwrap_or(serde_json::Value::Null);
                Ok(LogEntry {
                    event,
                    timestamp: row.get("timestamp"),
                })
            })
            .collect()
    }

    // ---- auth -----------------------------------------------------------

    pub async fn find_auth_by_name(
        &self,
        name: &str,
    ) -> Result<Option<(i64, String)>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT participant_id, hashed_password FROM auth WHERE name = ?1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| (row.get("participant_id"), row.get("hashed_password"))))
    }

    /// Registers a new participant and opens their account in a single
    /// transaction, returning the assigned participant id. Fails with a
    /// unique-constraint violation if `name` is already taken.
    pub async fn signup(
        &self,
        name: &str,
        hashed_password: &str,
        starting_balance: i64,
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query(
            "INSERT INTO auth (name, hashed_password) VALUES (?1, ?2) RETURNING participant_id",
        )
        .bind(name)
        .bind(hashed_password)
        .fetch_one(&mut *tx)
        .await?
        .get("participant_id");

        sqlx::query("INSERT INTO accounts (participant_id, balance, stock) VALUES (?1, ?2, 0)")
            .bind(id)
            .bind(starting_balance)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(id)
    }

    // ---- rate limiting ----------------------------------------------------

    /// Number of requests recorded for `ip` with a timestamp newer than
    /// `since`. `since` and the stored timestamps are both seconds relative
    /// to process start, matching
    /// `original_source/trading_engine/db_utils.py`'s `ratelimit` table.
    pub async fn rate_limit_count_since(
        &self,
        ip: &str,
        since: f64,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM ratelimit WHERE ip = ?1 AND relative_timestamp >= ?2",
        )
        .bind(ip)
        .bind(since)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn rate_limit_record(&self, ip: &str, relative_timestamp: f64) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO ratelimit (ip, relative_timestamp) VALUES (?1, ?2)")
            .bind(ip)
            .bind(relative_timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Prunes `ip`'s rows older than `cutoff` so the table does not grow
    /// unbounded, scoped to the requesting IP per spec.md §4.4 step 4.
    pub async fn rate_limit_prune_before(&self, ip: &str, cutoff: f64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM ratelimit WHERE ip = ?1 AND relative_timestamp < ?2")
            .bind(ip)
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
