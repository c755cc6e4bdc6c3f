//! Connection Provider - PostgreSQL pool lifecycle
//!
//! The pool is created lazily: no connection is attempted until the first
//! statement runs. The first physical connection is announced once in the
//! log. Callers own the pool and must call [`ManagedPool::close`] on every
//! exit path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Executor, PgPool, Row};
use tidemark_core::DatabaseConfig;

use crate::connection::SqlConnection;
use crate::error::{DatabaseFailure, PoolError};

/// Connection pool configuration.
///
/// Timeouts are left at the sqlx defaults.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            // Migrations run strictly one at a time
            max_connections: 1,
        }
    }
}

/// Server details returned by [`ManagedPool::server_info`]
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub current_time: DateTime<Utc>,
    pub version: String,
}

/// Managed connection pool with a single, idempotent teardown
pub struct ManagedPool {
    pool: PgPool,
    config: PoolConfig,
    connections_established: Arc<AtomicU64>,
    close_requested: AtomicBool,
}

impl ManagedPool {
    /// Build a lazy pool with default configuration
    pub fn connect_lazy(config: &DatabaseConfig) -> Result<Self, PoolError> {
        Self::connect_lazy_with(config, PoolConfig::default())
    }

    /// Build a lazy pool.
    ///
    /// Fails with [`PoolError::Configuration`] when user, host or database is
    /// missing. No network I/O happens here.
    pub fn connect_lazy_with(config: &DatabaseConfig, pool_config: PoolConfig) -> Result<Self, PoolError> {
        config.validate()?;

        tracing::debug!(
            "Creating database pool: max={}, target={}@{}/{}",
            pool_config.max_connections,
            config.user(),
            config.host(),
            config.database()
        );

        let established = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&established);

        let pool = PgPoolOptions::new()
            .max_connections(pool_config.max_connections)
            .min_connections(0)
            .after_connect(move |_conn, _meta| {
                let counter = Arc::clone(&counter);
                Box::pin(async move {
                    note_connection(&counter);
                    Ok(())
                })
            })
            .connect_lazy_with(connect_options(config));

        Ok(Self {
            pool,
            config: pool_config,
            connections_established: established,
            close_requested: AtomicBool::new(false),
        })
    }

    /// Get the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get connection pool configuration
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of physical connections opened so far
    pub fn connections_established(&self) -> u64 {
        self.connections_established.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Close the pool and every connection in it.
    ///
    /// Returns `true` for the call that performed the close and `false` for
    /// any later call.
    pub async fn close(&self) -> bool {
        if self.close_requested.swap(true, Ordering::SeqCst) {
            return false;
        }

        self.pool.close().await;
        tracing::info!("Database connection closed");
        true
    }

    /// Query server time and version
    pub async fn server_info(&self) -> Result<ServerInfo, DatabaseFailure> {
        let row = sqlx::query("SELECT NOW() AS current_time, version() AS pg_version")
            .fetch_one(&self.pool)
            .await?;

        Ok(ServerInfo {
            current_time: row.try_get("current_time")?,
            version: row.try_get("pg_version")?,
        })
    }
}

#[async_trait]
impl SqlConnection for ManagedPool {
    async fn execute_batch(&self, sql: &str) -> Result<(), DatabaseFailure> {
        // A bare &str has no bind arguments, so sqlx sends it over the simple
        // query protocol, which accepts several statements at once.
        Executor::execute(&self.pool, sql).await?;
        Ok(())
    }

    async fn table_names(&self, schema: &str) -> Result<Vec<String>, DatabaseFailure> {
        let rows = sqlx::query(
            "SELECT table_name::text AS table_name \
             FROM information_schema.tables \
             WHERE table_schema = $1 \
             ORDER BY table_name",
        )
        .bind(schema)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("table_name").map_err(DatabaseFailure::from))
            .collect()
    }

    async fn close(&self) -> bool {
        ManagedPool::close(self).await
    }
}

/// Count a new physical connection; only the first one is announced.
/// Returns whether this call made the announcement.
fn note_connection(counter: &AtomicU64) -> bool {
    let first = counter.fetch_add(1, Ordering::SeqCst) == 0;
    if first {
        tracing::info!("Connection pool established with database");
    }
    first
}

fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(config.host())
        .username(config.user())
        .database(config.database());

    if let Some(password) = config.password() {
        options = options.password(password);
    }

    if let Some(port) = config.port {
        options = options.port(port);
    }

    options
}
