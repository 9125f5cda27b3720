use sqlx::SqlitePool;

/// Creates the six tables of the data model if they do not already exist.
///
/// Grounded in `original_source/trading_engine/db_utils.py::create_db`: same
/// table names and column set, translated to SQLite DDL idiomatic for
/// `sqlx`.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS exchange (
            participant_id INTEGER NOT NULL,
            price INTEGER NOT NULL,
            amount INTEGER NOT NULL,
            logical_timestamp INTEGER PRIMARY KEY AUTOINCREMENT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            participant_id INTEGER PRIMARY KEY,
            balance INTEGER NOT NULL DEFAULT 0,
            stock INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS log (
            event TEXT,
            timestamp TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS earnings (
            amount INTEGER,
            timestamp TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS auth (
            participant_id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            hashed_password TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ratelimit (
            rowid INTEGER PRIMARY KEY AUTOINCREMENT,
            ip TEXT NOT NULL,
            relative_timestamp REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Drops and recreates every table. Used by the `--reset` bootstrap flag and
/// by tests that want a clean slate without a fresh connection.
pub async fn reset_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for table in ["exchange", "accounts", "log", "earnings", "auth", "ratelimit"] {
        sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
            .execute(pool)
            .await?;
    }
    ensure_schema(pool).await
}

/// Seeds two demo accounts for manual smoke testing, mirroring
/// `original_source/trading_engine/db_utils.py::create_mock_db`.
pub async fn seed_demo_accounts(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // bcrypt hash of "foo123"
    const RIK_HASH: &str = "$2b$12$IPLrdHW7c.Z9i9qzBfzKMud8W9vuRotGEqqs690IPukZkNhPD9YOi";
    // bcrypt hash of "bar123"
    const ADA_HASH: &str = "$2b$12$Nq6wV4XoWJRCUc8efmf0IOzYkFR0Rh.D0y8rKd0e7wV9MW2OQrqaC";

    for (name, hash) in [("rik", RIK_HASH), ("ada", ADA_HASH)] {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO auth (name, hashed_password) VALUES (?1, ?2) RETURNING participant_id",
        )
        .bind(name)
        .bind(hash)
        .fetch_one(pool)
        .await?;

        sqlx::query("INSERT INTO accounts (participant_id, balance, stock) VALUES (?1, 100, 10)")
            .bind(id)
            .execute(pool)
            .await?;
    }

    sqlx::query("INSERT INTO earnings (amount, timestamp) VALUES (?1, ?2)")
        .bind(10_000_i64)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await?;

    Ok(())
}
