//! SQLSTATE classification
//!
//! A closed mapping from PostgreSQL error codes to how the executor reacts.
//! Codes that are not listed are [`ErrorClass::Unclassified`] and always fatal.

use crate::error::DatabaseFailure;

/// How a failed migration is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The objects the migration creates already exist; record a skip and continue
    Skippable,
    /// A referenced table is missing, so an earlier migration never ran; abort
    Dependency,
    /// Anything else; abort
    Unclassified,
}

impl ErrorClass {
    pub fn is_fatal(self) -> bool {
        !matches!(self, ErrorClass::Skippable)
    }
}

pub const DUPLICATE_TABLE: &str = "42P07";
pub const DUPLICATE_OBJECT: &str = "42710";
pub const UNIQUE_VIOLATION: &str = "23505";
pub const UNDEFINED_TABLE: &str = "42P01";

/// Known SQLSTATE codes. Add rows here; the executor never matches on codes itself.
pub const CLASSIFICATION_TABLE: &[(&str, ErrorClass)] = &[
    (DUPLICATE_TABLE, ErrorClass::Skippable),
    (DUPLICATE_OBJECT, ErrorClass::Skippable),
    (UNIQUE_VIOLATION, ErrorClass::Skippable),
    (UNDEFINED_TABLE, ErrorClass::Dependency),
];

/// Classify a SQLSTATE code
pub fn classify_code(code: Option<&str>) -> ErrorClass {
    code.and_then(|code| {
        CLASSIFICATION_TABLE
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, class)| *class)
    })
    .unwrap_or(ErrorClass::Unclassified)
}

/// Classify a database failure
pub fn classify(failure: &DatabaseFailure) -> ErrorClass {
    classify_code(failure.code())
}
