use thiserror::Error;

use crate::validation::ValidationErrors;

/// Application-wide error types for the astro catalog.
#[derive(Error, Debug)]
pub enum AppError {
    /// Payload or query failed field-level or cross-field validation.
    #[error("Validation failed: {0}")]
    ValidationError(ValidationErrors),

    /// A unique field (body name, username, email...) is already taken.
    #[error("{0}")]
    Conflict(String),

    /// The requested record (or a record it references) does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Missing, invalid or expired credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to perform the operation.
    #[error("{0}")]
    Forbidden(String),

    /// JWT could not be issued.
    #[error("Token error: {0}")]
    TokenError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Shortcut for a validation failure on a single field.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::default();
        errors.add(field, message);
        AppError::ValidationError(errors)
    }

    /// Returns true if the error is the caller's fault rather than ours.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::ValidationError(_)
                | AppError::Conflict(_)
                | AppError::NotFound(_)
                | AppError::Unauthorized(_)
                | AppError::Forbidden(_)
                | AppError::SerializationError(_)
        )
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::ValidationError(errors)
    }
}
