use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::store::executor::{ConnectionMode, StoreConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Pool size in `pooled` mode.
    /// Set via HISCORE_DB_MAX_CONNECTIONS env var. Default: 10.
    pub max_connections: u32,
    /// `pooled` (default) or `per_call`.
    #[serde(skip)]
    pub connection_mode: ConnectionMode,
    /// Deadline for a single executor call, in seconds.
    /// Set via HISCORE_DB_TIMEOUT_SECS env var. Default: 30.
    pub statement_timeout_secs: u64,
    /// Log compiled SQL and bound parameters at debug level.
    pub debug_sql: bool,
}

impl Config {
    pub fn store(&self) -> StoreConfig {
        StoreConfig {
            database_url: self.database_url.clone(),
            max_connections: self.max_connections,
            mode: self.connection_mode,
            statement_timeout: Duration::from_secs(self.statement_timeout_secs),
            debug_sql: self.debug_sql,
        }
    }
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();
    from_lookup(|key| std::env::var(key).ok())
}

/// Build a config from an arbitrary variable source.
pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let connection_mode = match lookup("HISCORE_DB_CONNECTION_MODE") {
        Some(raw) => raw
            .parse::<ConnectionMode>()
            .map_err(anyhow::Error::msg)
            .context("invalid HISCORE_DB_CONNECTION_MODE")?,
        None => ConnectionMode::default(),
    };

    Ok(Config {
        port: lookup("HISCORE_PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(5000),
        database_url: lookup("DATABASE_URL")
            .unwrap_or_else(|| "mysql://root@localhost/playerdata".into()),
        max_connections: lookup("HISCORE_DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(10),
        connection_mode,
        statement_timeout_secs: lookup("HISCORE_DB_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(30),
        debug_sql: lookup("HISCORE_DEBUG_SQL")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false),
    })
}
