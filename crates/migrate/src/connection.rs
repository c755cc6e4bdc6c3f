//! Database access seam used by the executor and the schema reporter

use async_trait::async_trait;

use crate::error::DatabaseFailure;

/// Minimal database surface the migration engine needs
#[async_trait]
pub trait SqlConnection: Send + Sync {
    /// Execute raw SQL text, possibly containing several statements, as one batch
    async fn execute_batch(&self, sql: &str) -> Result<(), DatabaseFailure>;

    /// Names of the base tables and views visible in `schema`
    async fn table_names(&self, schema: &str) -> Result<Vec<String>, DatabaseFailure>;

    /// Release every underlying resource. Returns `true` only for the call
    /// that actually closed the connection.
    async fn close(&self) -> bool;
}

