//! Migration Runner - wires discovery, execution and reporting together
//!
//! [`run_migrations`] owns the connection for one invocation and closes it on
//! every exit path before handing back the run's result.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tidemark_core::DatabaseConfig;

use crate::connection::SqlConnection;
use crate::database::ManagedPool;
use crate::error::MigrationResult;
use crate::executor::{MigrationExecutor, MigrationRunResult, RunState};
use crate::reporter::{SchemaReporter, SchemaSnapshot};
use crate::source::MigrationSource;

/// Result of a run that reached [`RunState::Completed`]
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub results: Vec<MigrationRunResult>,
    pub snapshot: SchemaSnapshot,
    pub state: RunState,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn applied_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_applied()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_skipped()).count()
    }
}

/// Runs every pending migration file found by its source
#[derive(Debug, Clone)]
pub struct MigrationRunner {
    source: MigrationSource,
    executor: MigrationExecutor,
    reporter: SchemaReporter,
}

impl MigrationRunner {
    /// Create a runner over `dir` with default discovery rules
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_source(MigrationSource::new(dir))
    }

    pub fn with_source(source: MigrationSource) -> Self {
        Self {
            source,
            executor: MigrationExecutor::new(),
            reporter: SchemaReporter::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: SchemaReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn source(&self) -> &MigrationSource {
        &self.source
    }

    /// Discover, apply and report.
    ///
    /// An aborted run returns the error that stopped it and the schema is not
    /// reported. The connection is left open.
    pub async fn run<C>(&self, conn: &C) -> MigrationResult<RunSummary>
    where
        C: SqlConnection + ?Sized,
    {
        let start_time = Instant::now();
        let mut state = RunState::Start;
        tracing::debug!("Run state: {:?}", state);

        state = RunState::Discovering;
        tracing::debug!("Run state: {:?}", state);
        let files = self.source.list()?;
        tracing::info!(
            "Found {} migration(s) in {}",
            files.len(),
            self.source.dir().display()
        );

        let report = self.executor.execute(&files, conn).await;
        tracing::debug!("Run state: {:?}", report.state);
        let results = report.into_result()?;

        state = RunState::Reporting;
        tracing::debug!("Run state: {:?}", state);
        let snapshot = self.reporter.snapshot(conn).await?;

        state = RunState::Completed;
        let summary = RunSummary {
            results,
            snapshot,
            state,
            elapsed: start_time.elapsed(),
        };

        tracing::info!(
            "Migrations completed: {} applied, {} skipped in {}ms",
            summary.applied_count(),
            summary.skipped_count(),
            summary.elapsed.as_millis()
        );
        Ok(summary)
    }

    /// [`MigrationRunner::run`], then close `conn` whatever the outcome
    pub async fn run_and_close<C>(&self, conn: &C) -> MigrationResult<RunSummary>
    where
        C: SqlConnection + ?Sized,
    {
        let result = self.run(conn).await;
        conn.close().await;
        result
    }
}

/// Connect lazily with `config`, apply the migrations in `dir`, and close the
/// pool before returning.
///
/// A missing connection parameter fails here, before any connection attempt.
pub async fn run_migrations(config: &DatabaseConfig, dir: impl Into<PathBuf>) -> MigrationResult<RunSummary> {
    let pool = ManagedPool::connect_lazy(config)?;
    MigrationRunner::new(dir).run_and_close(&pool).await
}
