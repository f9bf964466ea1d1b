//! SQLite connection pooling and migration ledger for bookshelf.
//!
//! File databases run in WAL mode with a configurable pool. In-memory
//! databases (`sqlite::memory:`) are pinned to a single long-lived
//! connection, since every new SQLite connection to `:memory:` opens a fresh,
//! empty database.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{debug, info, warn};

const LEDGER_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
        PRIMARY KEY (module, id)
    )
"#;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration {module}/{id} failed: {source}")]
    Migration {
        module: String,
        id: String,
        #[source]
        source: sqlx::Error,
    },
}

pub type DbResult<T> = Result<T, DbError>;

/// Connection parameters for the pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl PoolConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }

    /// Shared in-memory database, mostly for tests.
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

/// Handle to the relational store shared by every module.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the pool and verify it answers queries.
    pub async fn connect(config: &PoolConfig) -> DbResult<Self> {
        info!(
            url = %config.url,
            max_connections = config.max_connections,
            "opening database pool"
        );

        let mut options = SqliteConnectOptions::from_str(&config.url)?
            .foreign_keys(true)
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new().acquire_timeout(config.acquire_timeout);

        if config.is_memory() {
            pool_options = pool_options
                .min_connections(1)
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        } else {
            options = options
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
            pool_options = pool_options.max_connections(config.max_connections);
        }

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            warn!(error = %e, "failed to open database pool");
            DbError::Sqlx(e)
        })?;

        let db = Self { pool };
        db.health_check().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        debug!("database health check passed");
        Ok(())
    }

    /// Apply one migration unless the ledger already records it.
    ///
    /// Returns `true` when the script ran.
    pub async fn apply_migration(&self, module: &str, id: &str, up: &str) -> DbResult<bool> {
        sqlx::query(LEDGER_DDL).execute(&self.pool).await?;

        let applied = sqlx::query("SELECT COUNT(*) AS n FROM _migrations WHERE module = ? AND id = ?")
            .bind(module)
            .bind(id)
            .fetch_one(&self.pool)
            .await?
            .get::<i64, _>("n")
            > 0;

        if applied {
            debug!(module, id, "migration already applied");
            return Ok(false);
        }

        let wrap = |source| DbError::Migration {
            module: module.to_string(),
            id: id.to_string(),
            source,
        };

        let mut tx = self.pool.begin().await?;
        sqlx::raw_sql(up).execute(&mut *tx).await.map_err(wrap)?;
        sqlx::query("INSERT INTO _migrations (module, id) VALUES (?, ?)")
            .bind(module)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(wrap)?;
        tx.commit().await?;

        info!(module, id, "migration applied");
        Ok(true)
    }

    /// Ids of applied migrations for a module, oldest first.
    pub async fn applied_migrations(&self, module: &str) -> DbResult<Vec<String>> {
        sqlx::query(LEDGER_DDL).execute(&self.pool).await?;
        let rows = sqlx::query("SELECT id FROM _migrations WHERE module = ? ORDER BY id")
            .bind(module)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|row| row.get("id")).collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
