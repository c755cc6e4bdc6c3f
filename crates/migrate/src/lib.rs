//! # tidemark-migrate: ordered SQL migrations for PostgreSQL
//!
//! Applies every `.sql` file in a directory, in lexical filename order, as a
//! single batch each. There is no applied-migrations table: a re-run is
//! tolerated by treating "already exists" failures as skips, while a missing
//! table or any unrecognised failure aborts the run.
//!
//! ```no_run
//! # async fn demo() -> tidemark_migrate::MigrationResult<()> {
//! let config = tidemark_core::DatabaseConfig::from_env()?;
//! let summary = tidemark_migrate::run_migrations(&config, "database/migrations").await?;
//! println!("{} table(s) in public", summary.snapshot.len());
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod connection;
pub mod database;
pub mod diagnostics;
pub mod error;
pub mod executor;
pub mod reporter;
pub mod runner;
pub mod source;

pub use classify::{classify, classify_code, ErrorClass};
pub use connection::SqlConnection;
pub use database::{ManagedPool, PoolConfig, ServerInfo};
pub use diagnostics::{check_connection, diagnose, ConnectionReport, Diagnosis};
pub use error::{DatabaseFailure, MigrationError, MigrationResult, PoolError};
pub use executor::{
    ExecutionReport, MigrationExecutor, MigrationOutcome, MigrationRunResult, RunState,
};
pub use reporter::{SchemaReporter, SchemaSnapshot, DEFAULT_SCHEMA};
pub use runner::{run_migrations, MigrationRunner, RunSummary};
pub use source::{list_migrations, MigrationFile, MigrationSource, DEFAULT_MIGRATIONS_DIR};
