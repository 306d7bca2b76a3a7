//! Generic parameterized SQL execution.
//!
//! Every call runs in its own connection scope and its own transaction.
//! Read statements (text starting with `select`, case-insensitive, after
//! trimming) get an offset/limit clause appended and are materialized into a
//! [`ResultSet`]; everything else is treated as a write and yields nothing.
//! The prefix check is a convention, not a parser: `WITH ... SELECT` and
//! procedure calls are classified as writes.

use std::str::FromStr;
use std::time::{Duration, Instant};

use sqlx::any::{AnyArguments, AnyPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::query::Query;
use sqlx::Statement as _;
use sqlx::{Any, AnyConnection, AnyPool, Column, Connection, Executor, Transaction};

use crate::errors::StoreError;
use crate::middleware::metrics;
use crate::store::dialect::Dialect;
use crate::store::params::{CompiledQuery, Params, SqlValue};
use crate::store::result::ResultSet;

/// Upper bound on rows returned by a single read.
pub const MAX_ROW_LIMIT: i64 = 100_000;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Effective page window for a read statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    row_limit: i64,
    page: i64,
}

impl Pagination {
    /// `row_limit` is clamped into `0..=100_000`, `page` to at least 1.
    pub fn new(row_limit: i64, page: i64) -> Self {
        Self {
            row_limit: row_limit.clamp(0, MAX_ROW_LIMIT),
            page: page.max(1),
        }
    }

    pub fn row_limit(&self) -> i64 {
        self.row_limit
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.row_limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(MAX_ROW_LIMIT, 1)
    }
}

pub fn is_read_statement(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("select"))
}

/// Append the dialect's pagination clause and bind `offset` / `row_count`,
/// overwriting any caller values under those names.
///
/// The clause goes on its own line so a trailing `--` comment cannot swallow it.
pub fn paginate(sql: &str, mut params: Params, page: Pagination, dialect: Dialect) -> (String, Params) {
    let base = sql.trim_end().trim_end_matches(';').trim_end();
    params.insert("offset", page.offset());
    params.insert("row_count", page.row_limit());
    (format!("{}\n{}", base, dialect.pagination_clause()), params)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionMode {
    /// One shared pool; each call checks out a connection and returns it.
    #[default]
    Pooled,
    /// A fresh connection per call, closed before the call returns.
    PerCall,
}

impl FromStr for ConnectionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pooled" | "pool" => Ok(ConnectionMode::Pooled),
            "per_call" | "per-call" => Ok(ConnectionMode::PerCall),
            other => Err(format!("unknown connection mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub mode: ConnectionMode,
    pub statement_timeout: Duration,
    pub debug_sql: bool,
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 10,
            mode: ConnectionMode::Pooled,
            statement_timeout: DEFAULT_TIMEOUT,
            debug_sql: false,
        }
    }
}

/// One statement of a batch.
#[derive(Debug, Clone)]
pub struct Statement {
    pub sql: String,
    pub params: Params,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Params) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

#[derive(Clone)]
enum ConnectionSource {
    Pool(AnyPool),
    PerCall { url: String },
}

enum ScopedConnection {
    Pooled(PoolConnection<Any>),
    Owned(AnyConnection),
}

impl ScopedConnection {
    fn as_mut(&mut self) -> &mut AnyConnection {
        match self {
            ScopedConnection::Pooled(conn) => &mut **conn,
            ScopedConnection::Owned(conn) => conn,
        }
    }

    async fn release(self) {
        match self {
            ScopedConnection::Pooled(conn) => drop(conn),
            ScopedConnection::Owned(conn) => {
                if let Err(e) = conn.close().await {
                    tracing::warn!("failed to close per-call connection: {}", e);
                }
            }
        }
    }
}

/// Runs parameterized SQL against the store. Cheap to clone.
#[derive(Clone)]
pub struct QueryExecutor {
    source: ConnectionSource,
    dialect: Dialect,
    timeout: Duration,
    debug_sql: bool,
}

impl QueryExecutor {
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();
        let dialect = Dialect::from_url(&config.database_url)?;

        let source = match config.mode {
            ConnectionMode::Pooled => {
                let pool = AnyPoolOptions::new()
                    .max_connections(config.max_connections)
                    .acquire_timeout(config.statement_timeout)
                    .connect(&config.database_url)
                    .await?;
                ConnectionSource::Pool(pool)
            }
            ConnectionMode::PerCall => ConnectionSource::PerCall {
                url: config.database_url.clone(),
            },
        };

        tracing::info!(?dialect, mode = ?config.mode, "query executor ready");

        Ok(Self {
            source,
            dialect,
            timeout: config.statement_timeout,
            debug_sql: config.debug_sql,
        })
    }

    /// Build an executor over an existing pool.
    pub fn from_pool(pool: AnyPool, dialect: Dialect) -> Self {
        Self {
            source: ConnectionSource::Pool(pool),
            dialect,
            timeout: DEFAULT_TIMEOUT,
            debug_sql: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_debug_sql(mut self, debug_sql: bool) -> Self {
        self.debug_sql = debug_sql;
        self
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn pool(&self) -> Option<&AnyPool> {
        match &self.source {
            ConnectionSource::Pool(pool) => Some(pool),
            ConnectionSource::PerCall { .. } => None,
        }
    }

    /// Execute with the default window: 100 000 rows, page 1.
    pub async fn execute(&self, sql: &str, params: Params) -> Result<Option<ResultSet>, StoreError> {
        self.execute_paged(sql, params, Pagination::default()).await
    }

    /// Execute one statement in its own transaction. Reads return `Some`,
    /// writes return `None` once committed.
    pub async fn execute_paged(
        &self,
        sql: &str,
        params: Params,
        page: Pagination,
    ) -> Result<Option<ResultSet>, StoreError> {
        let read = is_read_statement(sql);
        let (text, params) = if read {
            paginate(sql, params, page, self.dialect)
        } else {
            (sql.to_string(), params)
        };
        let compiled = CompiledQuery::compile(&text, &params, self.dialect)?;

        if self.debug_sql {
            tracing::debug!(read, sql = compiled.sql(), params = ?params, "executing statement");
        }

        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.timeout, self.run_single(&compiled, read)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(self.deadline_exceeded()),
        };
        metrics::record_query(if read { "read" } else { "write" }, outcome.is_ok(), started.elapsed());

        if let Err(e) = &outcome {
            tracing::debug!(read, "statement failed: {}", e);
        }
        outcome
    }

    /// Execute several statements atomically in one transaction. No
    /// pagination is applied and no rows are returned.
    pub async fn execute_batch(&self, statements: &[Statement]) -> Result<(), StoreError> {
        let compiled = statements
            .iter()
            .map(|s| CompiledQuery::compile(&s.sql, &s.params, self.dialect))
            .collect::<Result<Vec<_>, _>>()?;

        if self.debug_sql {
            for q in &compiled {
                tracing::debug!(sql = q.sql(), "batched statement");
            }
        }

        let started = Instant::now();
        let outcome = match tokio::time::timeout(self.timeout, self.run_batch(&compiled)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(self.deadline_exceeded()),
        };
        metrics::record_query("batch", outcome.is_ok(), started.elapsed());
        outcome
    }

    pub async fn close(&self) {
        if let ConnectionSource::Pool(pool) = &self.source {
            pool.close().await;
        }
    }

    fn deadline_exceeded(&self) -> StoreError {
        StoreError::execution(format!("statement exceeded deadline of {:?}", self.timeout))
    }

    async fn checkout(&self) -> Result<ScopedConnection, StoreError> {
        match &self.source {
            ConnectionSource::Pool(pool) => Ok(ScopedConnection::Pooled(pool.acquire().await?)),
            ConnectionSource::PerCall { url } => {
                Ok(ScopedConnection::Owned(AnyConnection::connect(url).await?))
            }
        }
    }

    async fn run_single(&self, compiled: &CompiledQuery, read: bool) -> Result<Option<ResultSet>, StoreError> {
        let mut conn = self.checkout().await?;
        let outcome = single_in_transaction(conn.as_mut(), compiled, read).await;
        conn.release().await;
        outcome
    }

    async fn run_batch(&self, compiled: &[CompiledQuery]) -> Result<(), StoreError> {
        let mut conn = self.checkout().await?;
        let outcome = batch_in_transaction(conn.as_mut(), compiled).await;
        conn.release().await;
        outcome
    }
}

async fn single_in_transaction(
    conn: &mut AnyConnection,
    compiled: &CompiledQuery,
    read: bool,
) -> Result<Option<ResultSet>, StoreError> {
    let mut tx = conn.begin().await?;
    match run_statement(&mut tx, compiled, read).await {
        Ok(result) => {
            tx.commit().await?;
            Ok(result)
        }
        Err(e) => {
            rollback(tx).await;
            Err(e)
        }
    }
}

async fn batch_in_transaction(conn: &mut AnyConnection, compiled: &[CompiledQuery]) -> Result<(), StoreError> {
    let mut tx = conn.begin().await?;
    for q in compiled {
        if let Err(e) = bind_all(sqlx::query(q.sql()), q.values()).execute(&mut *tx).await {
            rollback(tx).await;
            return Err(e.into());
        }
    }
    tx.commit().await?;
    Ok(())
}

async fn run_statement(
    tx: &mut Transaction<'_, Any>,
    compiled: &CompiledQuery,
    read: bool,
) -> Result<Option<ResultSet>, StoreError> {
    if read {
        let statement = (&mut **tx).prepare(compiled.sql()).await?;
        let columns = statement
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let rows = bind_all(statement.query(), compiled.values())
            .fetch_all(&mut **tx)
            .await?;
        Ok(Some(ResultSet::from_rows(columns, &rows)?))
    } else {
        let done = bind_all(sqlx::query(compiled.sql()), compiled.values())
            .execute(&mut **tx)
            .await?;
        tracing::debug!(rows_affected = done.rows_affected(), "write statement applied");
        Ok(None)
    }
}

async fn rollback(tx: Transaction<'_, Any>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!("rollback failed: {}", e);
    }
}

fn bind_all<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    values: &[SqlValue],
) -> Query<'q, Any, AnyArguments<'q>> {
    values.iter().fold(query, |q, value| match value {
        // `CompiledQuery` writes NULL inline, so no NULL reaches here.
        SqlValue::Null => q.bind(None::<String>),
        SqlValue::Bool(b) => q.bind(*b),
        SqlValue::Int(i) => q.bind(*i),
        SqlValue::Float(f) => q.bind(*f),
        SqlValue::Text(s) => q.bind(s.clone()),
        SqlValue::Bytes(b) => q.bind(b.clone()),
    })
}
