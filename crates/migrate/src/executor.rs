//! Migration Executor - applies ordered migrations one at a time
//!
//! The executor is a small state machine. Each file is executed as a single
//! batch; its failure is classified through [`crate::classify`] and either
//! recorded as a skip or ends the run in [`RunState::Aborted`].

use crate::classify::{classify, ErrorClass};
use crate::connection::SqlConnection;
use crate::error::{DatabaseFailure, MigrationError};
use crate::source::MigrationFile;

/// Remediation hint attached to undefined-table failures
pub const DEPENDENCY_HINT: &str = "This might be because a previous migration was skipped. \
     Try dropping and recreating the database, or manually fix the issue.";

/// Position of a migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    Discovering,
    /// Applying the file at this index of the ordered list
    Executing(usize),
    AllApplied,
    Reporting,
    /// Terminal: a fatal error stopped the run
    Aborted,
    /// Terminal: every file was handled and the schema was reported
    Completed,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Aborted | RunState::Completed)
    }
}

/// Outcome of a single migration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Applied,
    SkippedAlreadyExists {
        failure: DatabaseFailure,
    },
    Failed {
        class: ErrorClass,
        failure: DatabaseFailure,
        hint: Option<String>,
    },
}

impl MigrationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MigrationOutcome::Applied)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, MigrationOutcome::SkippedAlreadyExists { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MigrationOutcome::Failed { .. })
    }
}

/// Per-file result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRunResult {
    pub name: String,
    pub outcome: MigrationOutcome,
}

/// Everything the executor produced for one pass over the files
#[derive(Debug)]
pub struct ExecutionReport {
    pub results: Vec<MigrationRunResult>,
    /// Either [`RunState::AllApplied`] or [`RunState::Aborted`]
    pub state: RunState,
    /// The error that aborted the run
    pub error: Option<MigrationError>,
}

impl ExecutionReport {
    pub fn is_aborted(&self) -> bool {
        self.state == RunState::Aborted
    }

    pub fn applied_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_applied()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.results.iter().filter(|r| r.outcome.is_skipped()).count()
    }

    /// The per-file results, or the error that aborted the run
    pub fn into_result(self) -> Result<Vec<MigrationRunResult>, MigrationError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.results),
        }
    }
}

/// Applies migrations strictly in the order given
#[derive(Debug, Default, Clone)]
pub struct MigrationExecutor;

impl MigrationExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Apply `files` in order, stopping at the first fatal failure
    pub async fn execute<C>(&self, files: &[MigrationFile], conn: &C) -> ExecutionReport
    where
        C: SqlConnection + ?Sized,
    {
        let mut results = Vec::with_capacity(files.len());
        let mut error = None;
        let mut skipped_earlier = false;
        let mut trust_warned = false;

        let mut state = if files.is_empty() {
            RunState::AllApplied
        } else {
            RunState::Executing(0)
        };

        while let RunState::Executing(index) = state {
            let file = &files[index];
            let (outcome, fatal) = self.apply(file, conn).await;

            match &outcome {
                MigrationOutcome::SkippedAlreadyExists { .. } => skipped_earlier = true,
                MigrationOutcome::Applied if skipped_earlier && !trust_warned => {
                    // Nothing verifies that the skipped files left the schema in
                    // the shape this file expects.
                    tracing::warn!(
                        "{} applied after earlier migrations were skipped as already existing; verify the resulting schema",
                        file.name
                    );
                    trust_warned = true;
                }
                _ => {}
            }

            state = if fatal.is_some() {
                RunState::Aborted
            } else if index + 1 < files.len() {
                RunState::Executing(index + 1)
            } else {
                RunState::AllApplied
            };

            results.push(MigrationRunResult {
                name: file.name.clone(),
                outcome,
            });
            error = fatal;
        }

        ExecutionReport {
            results,
            state,
            error,
        }
    }

    async fn apply<C>(&self, file: &MigrationFile, conn: &C) -> (MigrationOutcome, Option<MigrationError>)
    where
        C: SqlConnection + ?Sized,
    {
        tracing::info!("Running: {}", file.name);

        let failure = match conn.execute_batch(&file.sql).await {
            Ok(()) => {
                tracing::info!("{} completed", file.name);
                return (MigrationOutcome::Applied, None);
            }
            Err(failure) => failure,
        };

        match classify(&failure) {
            ErrorClass::Skippable => {
                tracing::warn!(
                    "{} - some objects already exist, skipping: {}",
                    file.name,
                    failure
                );
                (MigrationOutcome::SkippedAlreadyExists { failure }, None)
            }
            ErrorClass::Dependency => {
                tracing::error!("{} failed: {}", file.name, failure);
                tracing::error!("{}", DEPENDENCY_HINT);
                let error = MigrationError::Dependency {
                    file: file.name.clone(),
                    failure: failure.clone(),
                    hint: DEPENDENCY_HINT.to_string(),
                };
                let outcome = MigrationOutcome::Failed {
                    class: ErrorClass::Dependency,
                    failure,
                    hint: Some(DEPENDENCY_HINT.to_string()),
                };
                (outcome, Some(error))
            }
            ErrorClass::Unclassified => {
                tracing::error!("{} failed: {}", file.name, failure);
                let error = MigrationError::Unclassified {
                    file: file.name.clone(),
                    failure: failure.clone(),
                };
                let outcome = MigrationOutcome::Failed {
                    class: ErrorClass::Unclassified,
                    failure,
                    hint: None,
                };
                (outcome, Some(error))
            }
        }
    }
}
