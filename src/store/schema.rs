//! Idempotent schema bootstrap.
//!
//! Column types are limited to what MySQL, SQLite and PostgreSQL all accept
//! and what the Any driver can decode: integers and short strings.
//! Timestamps are stored as `YYYY-MM-DD HH:MM:SS` text.

use crate::errors::StoreError;
use crate::store::executor::{QueryExecutor, Statement};
use crate::store::params::Params;

const CREATE_TOKENS: &str = r#"
CREATE TABLE IF NOT EXISTS tokens (
    token VARCHAR(64) NOT NULL PRIMARY KEY,
    request_highscores SMALLINT NOT NULL DEFAULT 0,
    verify_ban SMALLINT NOT NULL DEFAULT 0,
    create_token SMALLINT NOT NULL DEFAULT 0,
    verify_players SMALLINT NOT NULL DEFAULT 0
)"#;

const CREATE_PLAYERS: &str = r#"
CREATE TABLE IF NOT EXISTS players (
    id BIGINT NOT NULL PRIMARY KEY,
    name VARCHAR(13) NOT NULL UNIQUE
)"#;

const CREATE_HISCORE_DATA: &str = r#"
CREATE TABLE IF NOT EXISTS player_hiscore_data (
    player_id BIGINT NOT NULL,
    scraped_at VARCHAR(19) NOT NULL,
    total BIGINT NOT NULL DEFAULT 0,
    attack BIGINT NOT NULL DEFAULT 0,
    defence BIGINT NOT NULL DEFAULT 0,
    strength BIGINT NOT NULL DEFAULT 0,
    hitpoints BIGINT NOT NULL DEFAULT 0,
    ranged BIGINT NOT NULL DEFAULT 0,
    prayer BIGINT NOT NULL DEFAULT 0,
    magic BIGINT NOT NULL DEFAULT 0,
    PRIMARY KEY (player_id, scraped_at)
)"#;

const CREATE_HISCORE_LATEST: &str = r#"
CREATE TABLE IF NOT EXISTS player_hiscore_data_latest (
    player_id BIGINT NOT NULL PRIMARY KEY,
    scraped_at VARCHAR(19) NOT NULL,
    total BIGINT NOT NULL DEFAULT 0,
    attack BIGINT NOT NULL DEFAULT 0,
    defence BIGINT NOT NULL DEFAULT 0,
    strength BIGINT NOT NULL DEFAULT 0,
    hitpoints BIGINT NOT NULL DEFAULT 0,
    ranged BIGINT NOT NULL DEFAULT 0,
    prayer BIGINT NOT NULL DEFAULT 0,
    magic BIGINT NOT NULL DEFAULT 0
)"#;

/// Create any missing tables. Safe to run on every start.
pub async fn ensure(executor: &QueryExecutor) -> Result<(), StoreError> {
    let statements: Vec<Statement> = [
        CREATE_TOKENS,
        CREATE_PLAYERS,
        CREATE_HISCORE_DATA,
        CREATE_HISCORE_LATEST,
    ]
    .into_iter()
    .map(|ddl| Statement::new(ddl.trim(), Params::new()))
    .collect();

    executor.execute_batch(&statements).await?;
    tracing::info!("schema ready");
    Ok(())
}
