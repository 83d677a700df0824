//! # Service Error Type
//!
//! Unified error type for service operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                     Error Flow in Till POS                         │
//! │                                                                    │
//! │  ValidationError ──┐                                               │
//! │  CoreError ────────┼──► ServiceError ──► ErrorEnvelope (serialized)│
//! │  DbError ──────────┤         │                                     │
//! │  PermissionDenied ─┘         ▼                                     │
//! │                     { "code": "NOT_FOUND",                         │
//! │                       "message": "Invoice not found: INV-9" }      │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two things are deliberately NOT errors here:
//! - an idempotency collision (the guard returns the existing invoice)
//! - a failed return check from `validate_return` (a structured
//!   `ReturnCheck { valid: false, reason }` result the cashier can read)

use serde::Serialize;
use thiserror::Error;

use crate::permissions::PermissionDenied;
use till_core::{CoreError, ValidationError};
use till_db::DbError;

/// Errors surfaced by service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Bad caller input. The message is safe to show to an end user.
    #[error("{0}")]
    Validation(String),

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Permission denied.
    #[error(transparent)]
    Authorization(#[from] PermissionDenied),

    /// Business rule violation from till-core.
    #[error(transparent)]
    Core(CoreError),

    /// Persistence failure, surfaced verbatim.
    #[error(transparent)]
    Db(DbError),
}

impl ServiceError {
    /// Creates a NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(_) => ErrorCode::ValidationError,
            ServiceError::NotFound { .. } => ErrorCode::NotFound,
            ServiceError::Authorization(_) => ErrorCode::AuthorizationError,
            ServiceError::Core(CoreError::Validation(_)) => ErrorCode::ValidationError,
            ServiceError::Core(_) => ErrorCode::BusinessRule,
            ServiceError::Db(DbError::NotFound { .. }) => ErrorCode::NotFound,
            ServiceError::Db(_) => ErrorCode::PersistenceError,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            // Flatten nested validation so the code stays VALIDATION_ERROR
            CoreError::Validation(v) => ServiceError::Validation(v.to_string()),
            other => ServiceError::Core(other),
        }
    }
}

impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            other => ServiceError::Db(other),
        }
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

// =============================================================================
// Error Envelope
// =============================================================================

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced record missing (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Permission denied (403)
    AuthorizationError,

    /// Business rule violation (422)
    BusinessRule,

    /// Transactional/storage failure (500)
    PersistenceError,
}

/// What an RPC caller receives when an operation fails.
///
/// ## Serialization
/// ```json
/// { "code": "VALIDATION_ERROR", "message": "customer is required" }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&ServiceError> for ErrorEnvelope {
    fn from(err: &ServiceError) -> Self {
        ErrorEnvelope {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl Serialize for ServiceError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        ErrorEnvelope::from(self).serialize(serializer)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
