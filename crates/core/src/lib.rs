pub mod config;
pub mod logging;

// Re-export key types for convenience
pub use config::{load_env_file, DatabaseConfig, ConfigError};
pub use logging::{init_logging, LoggingConfig};
