//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                          Error Types                               │
//! │                                                                    │
//! │  till-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations                   │
//! │  └── ValidationError  - Input validation failures                  │
//! │                                                                    │
//! │  till-db errors (separate crate)                                   │
//! │  └── DbError          - Database operation failures                │
//! │                                                                    │
//! │  till-service errors (separate crate)                              │
//! │  └── ServiceError     - What RPC callers see ({code, message})     │
//! │                                                                    │
//! │  Flow: ValidationError → CoreError → DbError → ServiceError        │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` derive macros, never manual Display impls
//! 2. Context (item code, id, quantities) lives in the variant
//! 3. Errors are enum variants, never bare Strings

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and domain logic failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Invoice cannot be found.
    #[error("Invoice not found: {0}")]
    InvoiceNotFound(String),

    /// Shift cannot be found.
    #[error("Shift not found: {0}")]
    ShiftNotFound(String),

    /// Invoice is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Finalizing an invoice that is already finalized or cancelled
    /// - Updating a draft that was finalized by a concurrent retry
    /// - Cancelling a draft
    #[error("Invoice {id} is {status}, cannot perform operation")]
    InvalidInvoiceStatus { id: String, status: String },

    /// Shift is not in a state that allows the requested operation.
    #[error("Shift {id} is {status}, cannot perform operation")]
    InvalidShiftStatus { id: String, status: String },

    /// A return references an original that has not been finalized.
    ///
    /// A draft original has not sold anything yet, so nothing can be
    /// returned against it.
    #[error("Cannot return against {0}: original invoice is not finalized")]
    OriginalNotFinalized(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when caller input doesn't meet requirements, before any
/// business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Collection has too many entries.
    #[error("{field} cannot have more than {max} entries")]
    TooMany { field: String, max: usize },

    /// Invalid format (e.g., control characters in a token).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
