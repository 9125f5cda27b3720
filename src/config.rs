use anyhow::Context;

/// Process-wide configuration, loaded once at startup.
///
/// No hidden global state: everything the server needs is threaded through
/// this value into `AppState`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the sqlite database, or `:memory:`.
    pub db_location: String,
    /// HMAC-SHA256 signing key for bearer tokens.
    pub secret_key: String,
    /// Path segment under which the login endpoint is mounted, e.g. `token`.
    pub token_url: String,
    pub host: String,
    pub port: u16,

    /// Starting balance credited to a new account at signup.
    pub starting_balance: i64,
    /// Bearer token lifetime, in seconds.
    pub jwt_expiry_seconds: i64,

    /// Rate limiter: max admitted requests per window, per source IP.
    pub rate_limit_n: u32,
    /// Rate limiter: window width in seconds.
    pub rate_limit_window_secs: f64,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .set_default("db_location", ":memory:")?
            .set_default("token_url", "token")?
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8000)?
            .set_default("starting_balance", 100)?
            .set_default("jwt_expiry_seconds", 30 * 60)?
            .set_default("rate_limit_n", 5)?
            .set_default("rate_limit_window_secs", 1.0)?
            .add_source(
                config::Environment::default()
                    .try_parsing(true)
                    .prefix_separator("")
                    .separator("__"),
            );

        let raw = builder.build().context("loading configuration")?;

        let secret_key = raw
            .get_string("secret_key")
            .context("SECRET_KEY must be set")?;

        Ok(Self {
            db_location: raw.get_string("db_location")?,
            secret_key,
            token_url: raw.get_string("token_url")?,
            host: raw.get_string("host")?,
            port: raw.get_int("port")? as u16,
            starting_balance: raw.get_int("starting_balance")?,
            jwt_expiry_seconds: raw.get_int("jwt_expiry_seconds")?,
            rate_limit_n: raw.get_int("rate_limit_n")? as u32,
            rate_limit_window_secs: raw.get_float("rate_limit_window_secs")?,
        })
    }
}
