//! Settings validation errors and semantic validation.

use thiserror::Error;

use crate::settings::Settings;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Settings loading and validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error reading {path}: {message}")]
    IoError { path: String, message: String },

    #[error("Parse error in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl From<ValidationError> for cps_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::IoError { .. } | ValidationError::ParseError { .. } => {
                cps_common::Error::Config(err.to_string())
            }
            ValidationError::InvalidValue { .. } | ValidationError::VersionMismatch { .. } => {
                cps_common::Error::InvalidSettings(err.to_string())
            }
        }
    }
}

/// Validate settings semantically.
pub fn validate_settings(settings: &Settings) -> ValidationResult<()> {
    if settings.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: settings.schema_version.clone(),
        });
    }

    for (i, capacity) in settings.capacities.iter().enumerate() {
        if !capacity.is_finite() || *capacity <= 0.0 {
            return Err(ValidationError::InvalidValue {
                field: format!("capacities[{}]", i),
                message: format!("Must be a positive number, got {}", capacity),
            });
        }
    }

    if let Some(column) = &settings.start_column {
        if column.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "start_column".to_string(),
                message: "Must not be empty".to_string(),
            });
        }
    }

    for (i, alias) in settings.extra_start_aliases.iter().enumerate() {
        if alias.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: format!("extra_start_aliases[{}]", i),
                message: "Must not be empty".to_string(),
            });
        }
    }

    Ok(())
}
