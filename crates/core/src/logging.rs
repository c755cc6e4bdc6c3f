//! # Logging
//!
//! Tracing subscriber setup shared by the tidemark binaries.

use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "warn")
    pub level: String,
    /// Enable JSON structured logging (vs plain text)
    pub json_format: bool,
    /// Include the target module in each line
    pub include_target: bool,
    /// Environment filter (supports complex filters like "tidemark_migrate=debug,sqlx=warn")
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            include_target: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn with_level<S: Into<String>>(mut self, level: S) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_json(mut self, json_format: bool) -> Self {
        self.json_format = json_format;
        self
    }

    pub fn with_target(mut self, include_target: bool) -> Self {
        self.include_target = include_target;
        self
    }

    /// Set environment filter
    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Filter directive used when `RUST_LOG` is not set.
    ///
    /// sqlx logs every statement at `info`, which would echo whole migration
    /// files, so it is capped at `warn` unless an explicit filter says otherwise.
    pub fn directive(&self) -> String {
        match &self.env_filter {
            Some(filter) => filter.clone(),
            None => format!("{},sqlx=warn", self.level),
        }
    }
}

/// Initialize logging for the application
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(config.directive()))?;

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(Layer::new().with_writer(io::stderr).json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                Layer::new()
                    .with_writer(io::stderr)
                    .with_target(config.include_target),
            )
            .try_init()?;
    }

    tracing::debug!(
        level = %config.level,
        json_format = config.json_format,
        "Logging initialized"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json_format);
        assert_eq!(config.directive(), "info,sqlx=warn");
    }

    #[test]
    fn test_builder_methods() {
        let config = LoggingConfig::default()
            .with_level("debug")
            .with_json(true);
        assert_eq!(config.level, "debug");
        assert!(config.json_format);
        assert_eq!(config.directive(), "debug,sqlx=warn");

        let config = config.with_env_filter("tidemark_migrate=trace");
        assert_eq!(config.directive(), "tidemark_migrate=trace");
    }

    #[test]
    fn test_target_toggle() {
        assert!(!LoggingConfig::default().include_target);
        assert!(LoggingConfig::default().with_target(true).include_target);
    }
}
