/// Application services
///
/// Services orchestrate repositories inside a single
/// [`UnitOfWork`](crate::db::unit_of_work::UnitOfWork) per call and hold no
/// mutable state of their own, so they are cheap to clone into every request.
///
/// - [`auth::AuthService`]: registration, credential checks, token issuance
/// - [`task::TaskService`]: task CRUD and search

pub mod auth;
pub mod task;

use serde::{Deserialize, Serialize};

use crate::auth::{jwt::JwtError, password::PasswordError};

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// One failed input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failures a service operation can report
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or missing input
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    /// Bad credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Duplicate of a unique value (e.g. email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unknown ID
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store unreachable, transaction failure, or unclassified constraint violation
    #[error("Persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),

    /// Hashing, signing or other non-database failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<FieldError> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| {
                    FieldError::new(
                        field.to_string(),
                        error
                            .message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("Invalid value ({})", error.code)),
                    )
                })
            })
            .collect();

        // HashMap iteration order is unspecified
        details.sort_by(|a, b| a.field.cmp(&b.field));
        ServiceError::Validation(details)
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        ServiceError::Internal(format!("Token operation failed: {}", err))
    }
}

/// Whether `err` is a unique violation of `constraint`
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}
