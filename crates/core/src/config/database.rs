use super::validation::{ConfigError, ConfigValidator, PortValidator, RequiredValidator};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DB_USER: &str = "DB_USER";
pub const DB_HOST: &str = "DB_HOST";
pub const DB_DATABASE: &str = "DB_DATABASE";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const DB_PORT: &str = "DB_PORT";

/// Connection parameters for the target database.
///
/// Values are kept exactly as supplied; `validate` decides whether they are
/// usable. `port` of `None` leaves the choice to the driver (5432).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub user: Option<String>,
    pub host: Option<String>,
    pub database: Option<String>,
    pub password: Option<String>,
    pub port: Option<u16>,
}

impl DatabaseConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// `DB_PORT` is parsed here so a malformed port is reported before any
    /// other check runs. Missing required fields are reported by `validate`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup(DB_PORT).filter(|p| !p.trim().is_empty()) {
            Some(raw) => {
                let port: u16 = raw.trim().parse().map_err(|_| {
                    ConfigError::invalid_value(DB_PORT, raw.clone(), "valid port number (1-65535)")
                })?;
                PortValidator::for_field(DB_PORT).validate(&port)?;
                Some(port)
            }
            None => None,
        };

        Ok(Self {
            user: lookup(DB_USER),
            host: lookup(DB_HOST),
            database: lookup(DB_DATABASE),
            password: lookup(DB_PASSWORD),
            port,
        })
    }

    /// Check that every required connection parameter is present
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            (DB_USER, &self.user),
            (DB_HOST, &self.host),
            (DB_DATABASE, &self.database),
        ];

        for (field, value) in required {
            RequiredValidator {
                field,
                hint: "Set it in the environment or in a .env file",
            }
            .validate(value)?;
        }

        if let Some(port) = self.port {
            PortValidator::for_field(DB_PORT).validate(&port)?;
        }

        Ok(())
    }

    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or_default()
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or_default()
    }

    pub fn database(&self) -> &str {
        self.database.as_deref().unwrap_or_default()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Check if a password was supplied
    pub fn has_password(&self) -> bool {
        self.password.as_deref().map_or(false, |p| !p.is_empty())
    }
}

/// Masked rendering, safe to print
impl fmt::Display for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<String>| v.clone().unwrap_or_else(|| "<unset>".to_string());
        write!(
            f,
            "user={} host={} database={} port={} password={}",
            show(&self.user),
            show(&self.host),
            show(&self.database),
            self.port.map_or_else(|| "<default>".to_string(), |p| p.to_string()),
            if self.has_password() { "***" } else { "MISSING" },
        )
    }
}

/// Load a `.env` file unless the environment already carries `DB_USER`.
///
/// Variables already present in the environment are never overridden. A
/// missing file is not an error. Returns the path that was loaded, if any.
pub fn load_env_file(path: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
    if env::var_os(DB_USER).is_some() {
        return Ok(None);
    }

    let result = match path {
        Some(path) => dotenvy::from_path(path).map(|_| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match result {
        Ok(loaded) => {
            tracing::debug!("Loaded environment from {}", loaded.display());
            Ok(Some(loaded))
        }
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(ConfigError::EnvFile {
            path: path.map_or_else(|| ".env".to_string(), |p| p.display().to_string()),
            message: e.to_string(),
        }),
    }
}
