//! Error types for the migration engine
//!
//! Database failures are carried as [`DatabaseFailure`], a driver-independent
//! record of the SQLSTATE code and message, so classification and reporting
//! never depend on sqlx internals.

use std::path::PathBuf;
use tidemark_core::ConfigError;

/// Result type alias for migration operations
pub type MigrationResult<T> = Result<T, MigrationError>;

/// A failure reported by the database (or the driver on its behalf)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}{}", .message, code_suffix(.code))]
pub struct DatabaseFailure {
    /// Five-character SQLSTATE, when the server supplied one
    pub code: Option<String>,
    pub message: String,
}

impl DatabaseFailure {
    pub fn new(code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Failure carrying a server-reported SQLSTATE
    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Some(code.into()), message)
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_ref()
        .map(|code| format!(" (code {})", code))
        .unwrap_or_default()
}

impl From<sqlx::Error> for DatabaseFailure {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) => Self {
                code: db_err.code().map(|c| c.into_owned()),
                message: db_err.message().to_string(),
            },
            _ => Self {
                code: None,
                message: err.to_string(),
            },
        }
    }
}

/// Connection pool error types
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

/// Error types for migration runs
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    /// A required connection parameter is missing or malformed
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// The migrations directory or one of its files could not be read
    #[error("Failed to read migrations from {}: {source}", path.display())]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration referenced a table that does not exist
    #[error("Migration {file} failed: {failure}. {hint}")]
    Dependency {
        file: String,
        failure: DatabaseFailure,
        hint: String,
    },

    /// Any database failure not explicitly known to be safe
    #[error("Migration {file} failed: {failure}")]
    Unclassified {
        file: String,
        failure: DatabaseFailure,
    },

    /// The post-run schema query failed
    #[error("Schema report failed: {0}")]
    Report(DatabaseFailure),
}

impl MigrationError {
    pub fn source_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Source {
            path: path.into(),
            source,
        }
    }

    /// The database failure behind this error, if any
    pub fn database_failure(&self) -> Option<&DatabaseFailure> {
        match self {
            Self::Dependency { failure, .. } | Self::Unclassified { failure, .. } => Some(failure),
            Self::Report(failure) => Some(failure),
            _ => None,
        }
    }

    /// Name of the migration file that triggered the error, if any
    pub fn file(&self) -> Option<&str> {
        match self {
            Self::Dependency { file, .. } | Self::Unclassified { file, .. } => Some(file),
            _ => None,
        }
    }
}

impl From<PoolError> for MigrationError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Configuration(config) => MigrationError::Configuration(config),
        }
    }
}
