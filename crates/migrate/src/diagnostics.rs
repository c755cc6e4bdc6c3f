//! Connection diagnostics
//!
//! A one-shot connectivity check plus a mapping from common connection
//! failures to remediation hints.

use chrono::{DateTime, Utc};
use tidemark_core::DatabaseConfig;

use crate::connection::SqlConnection;
use crate::database::ManagedPool;
use crate::error::DatabaseFailure;
use crate::reporter::DEFAULT_SCHEMA;

/// What a successful connection check saw
#[derive(Debug, Clone)]
pub struct ConnectionReport {
    pub server_time: DateTime<Utc>,
    /// Version banner up to the first comma, e.g. `PostgreSQL 16.2 on x86_64-pc-linux-gnu`
    pub server_version: String,
    pub tables: Vec<String>,
}

impl ConnectionReport {
    /// An empty `public` schema is ready for a first run
    pub fn is_empty_database(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Query server time, version and the public tables
pub async fn check_connection(pool: &ManagedPool) -> Result<ConnectionReport, DatabaseFailure> {
    let info = pool.server_info().await?;
    let tables = pool.table_names(DEFAULT_SCHEMA).await?;

    Ok(ConnectionReport {
        server_time: info.current_time,
        server_version: short_version(&info.version).to_string(),
        tables,
    })
}

fn short_version(banner: &str) -> &str {
    banner.split(',').next().unwrap_or(banner).trim()
}

/// Likely cause of a failed connection check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnosis {
    AuthenticationFailed,
    DatabaseNotFound,
    ConnectionRefused,
    Timeout,
    HostNotFound,
    Unknown,
}

pub const INVALID_PASSWORD: &str = "28P01";
pub const INVALID_CATALOG_NAME: &str = "3D000";

/// Map a connection failure to its likely cause.
///
/// The SQLSTATE wins when present; transport errors carry no code and are
/// recognised by their message.
pub fn diagnose(failure: &DatabaseFailure) -> Diagnosis {
    let message = failure.message.to_lowercase();
    let code = failure.code();

    if code == Some(INVALID_PASSWORD) || message.contains("password authentication failed") {
        Diagnosis::AuthenticationFailed
    } else if code == Some(INVALID_CATALOG_NAME) || message.contains("does not exist") {
        Diagnosis::DatabaseNotFound
    } else if message.contains("connection refused") {
        Diagnosis::ConnectionRefused
    } else if message.contains("timed out") || message.contains("timeout") {
        Diagnosis::Timeout
    } else if message.contains("failed to lookup address")
        || message.contains("name or service not known")
        || message.contains("nodename nor servname")
        || message.contains("no such host")
    {
        Diagnosis::HostNotFound
    } else {
        Diagnosis::Unknown
    }
}

impl Diagnosis {
    pub fn title(&self) -> &'static str {
        match self {
            Diagnosis::AuthenticationFailed => "Password authentication failed",
            Diagnosis::DatabaseNotFound => "Database does not exist",
            Diagnosis::ConnectionRefused => "Connection refused",
            Diagnosis::Timeout => "Connection timeout",
            Diagnosis::HostNotFound => "Host not found",
            Diagnosis::Unknown => "Unknown error - check the error details above",
        }
    }

    /// Concrete steps, filled in with the configured values
    pub fn suggestions(&self, config: &DatabaseConfig) -> Vec<String> {
        let port = config
            .port
            .map(|p| p.to_string())
            .unwrap_or_else(|| "5432".to_string());

        match self {
            Diagnosis::AuthenticationFailed => vec![
                "Check DB_PASSWORD in your .env file".to_string(),
                "Make sure the password matches the PostgreSQL user's password".to_string(),
            ],
            Diagnosis::DatabaseNotFound => vec![
                format!("Create the database: CREATE DATABASE {};", config.database()),
                "Or point DB_DATABASE at an existing database".to_string(),
            ],
            Diagnosis::ConnectionRefused => vec![
                "Make sure PostgreSQL is running".to_string(),
                format!("Check DB_HOST ({}) and DB_PORT ({})", config.host(), port),
            ],
            Diagnosis::Timeout => vec![
                "PostgreSQL might not be running".to_string(),
                "A firewall might be blocking the connection".to_string(),
            ],
            Diagnosis::HostNotFound => vec![
                format!("Check DB_HOST: {}", config.host()),
                "It should be \"localhost\" or a resolvable hostname".to_string(),
            ],
            Diagnosis::Unknown => Vec::new(),
        }
    }
}
