//! # till-core: Pure Business Logic for Till POS
//!
//! This crate is the heart of the Till POS backend. It holds the domain
//! types and all business logic that can be expressed as pure functions,
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                       Till POS Architecture                        │
//! │                                                                    │
//! │  ┌──────────────────────────────────────────────────────────────┐  │
//! │  │                 till-service (orchestration)                 │  │
//! │  │   submit_invoice ─► validate_return ─► open/close shift      │  │
//! │  └──────────────────────────────┬───────────────────────────────┘  │
//! │                                 │                                  │
//! │  ┌──────────────────────────────▼───────────────────────────────┐  │
//! │  │                ★ till-core (THIS CRATE) ★                    │  │
//! │  │                                                              │  │
//! │  │   ┌─────────┐ ┌─────────┐ ┌────────────┐ ┌────────┐          │  │
//! │  │   │  types  │ │ returns │ │ validation │ │ fields │          │  │
//! │  │   │ Invoice │ │Allowance│ │   rules    │ │ config │          │  │
//! │  │   │  Shift  │ │  Check  │ │   checks   │ │ merge  │          │  │
//! │  │   └─────────┘ └─────────┘ └────────────┘ └────────┘          │  │
//! │  │                                                              │  │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS         │  │
//! │  └──────────────────────────────┬───────────────────────────────┘  │
//! │                                 │                                  │
//! │  ┌──────────────────────────────▼───────────────────────────────┐  │
//! │  │                   till-db (persistence)                      │  │
//! │  │          SQLite queries, migrations, repositories            │  │
//! │  └──────────────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Invoice, InvoiceLine, Shift, etc.)
//! - [`returns`] - Return-allowance math (how much of an item may still be returned)
//! - [`validation`] - Input validation rules
//! - [`fields`] - Versioned profile-settings field configuration
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: deterministic - same input, same output
//! 2. **No I/O**: database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: all monetary values are cents (i64), never floats
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

pub mod error;
pub mod fields;
pub mod returns;
pub mod types;
pub mod validation;

pub use error::{CoreError, ValidationError};
pub use returns::{ReturnAllowance, ReturnCheck, ReturnLine};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a caller-supplied idempotency token.
///
/// Tokens are opaque to the backend; the cap only keeps the unique index
/// and the token cache from being fed unbounded strings.
pub const MAX_TOKEN_LEN: usize = 64;

/// Maximum number of lines on a single invoice.
///
/// Prevents runaway payloads at the RPC boundary. Can be made configurable
/// per profile in a later version.
pub const MAX_INVOICE_LINES: usize = 200;

/// Maximum absolute quantity of a single invoice line.
pub const MAX_LINE_QTY: i64 = 9_999;

/// Maximum unit rate of a single invoice line, in cents ($1M per unit).
///
/// Together with [`MAX_LINE_QTY`] and [`MAX_INVOICE_LINES`] this bounds the
/// worst-case invoice total well inside i64, so line amounts and subtotals
/// are computed with plain arithmetic.
pub const MAX_RATE_CENTS: i64 = 100_000_000;
