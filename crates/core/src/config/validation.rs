use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Failed to load environment file {path}: {message}")]
    EnvFile { path: String, message: String },
}

impl ConfigError {
    /// Create a missing required field error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    /// Name of the offending field, if the error is tied to one
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRequired { field, .. } | Self::InvalidValue { field, .. } => Some(field),
            Self::EnvFile { .. } => None,
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T> {
    /// Validate a configuration value
    fn validate(&self, value: &T) -> Result<(), ConfigError>;
}

/// Port number validator
pub struct PortValidator {
    pub field: &'static str,
    pub min: u16,
    pub max: u16,
}

impl PortValidator {
    pub fn for_field(field: &'static str) -> Self {
        Self {
            field,
            ..Self::default()
        }
    }
}

impl Default for PortValidator {
    fn default() -> Self {
        Self {
            field: "port",
            min: 1,
            max: 65535,
        }
    }
}

impl ConfigValidator<u16> for PortValidator {
    fn validate(&self, value: &u16) -> Result<(), ConfigError> {
        if *value < self.min || *value > self.max {
            return Err(ConfigError::invalid_value(
                self.field,
                value.to_string(),
                format!("port between {} and {}", self.min, self.max),
            ));
        }
        Ok(())
    }
}

/// Rejects absent or blank string values
pub struct RequiredValidator {
    pub field: &'static str,
    pub hint: &'static str,
}

impl ConfigValidator<Option<String>> for RequiredValidator {
    fn validate(&self, value: &Option<String>) -> Result<(), ConfigError> {
        match value {
            Some(v) if !v.trim().is_empty() => Ok(()),
            _ => Err(ConfigError::missing_required(self.field, self.hint)),
        }
    }
}
