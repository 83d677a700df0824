//! # Validation Module
//!
//! Input validation for submission payloads.
//!
//! ## Validation Strategy
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                       Validation Layers                            │
//! │                                                                    │
//! │  Layer 1: RPC boundary (serde)                                     │
//! │  └── Type validation (deserialization)                             │
//! │           │                                                        │
//! │           ▼                                                        │
//! │  Layer 2: THIS MODULE                                              │
//! │  └── Field-level rules (empty, length, range)                      │
//! │           │                                                        │
//! │           ▼                                                        │
//! │  Layer 3: Database (SQLite)                                        │
//! │  ├── CHECK / NOT NULL constraints                                  │
//! │  └── Partial unique indexes (token, one open shift)                │
//! └────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_INVOICE_LINES, MAX_LINE_QTY, MAX_RATE_CENTS, MAX_TOKEN_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates an idempotency token.
///
/// ## Rules
/// - May be absent (submissions without retry protection are allowed)
/// - Must not be blank when present
/// - At most [`MAX_TOKEN_LEN`] characters
/// - Printable characters only (it ends up in an index and in log lines)
pub fn validate_token(token: &str) -> ValidationResult<()> {
    let token = token.trim();

    if token.is_empty() {
        return Err(ValidationError::Required {
            field: "idempotency_token".to_string(),
        });
    }

    if token.chars().count() > MAX_TOKEN_LEN {
        return Err(ValidationError::TooLong {
            field: "idempotency_token".to_string(),
            max: MAX_TOKEN_LEN,
        });
    }

    if token.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(ValidationError::InvalidFormat {
            field: "idempotency_token".to_string(),
            reason: "must not contain whitespace or control characters".to_string(),
        });
    }

    Ok(())
}

/// Validates a customer identifier.
pub fn validate_customer(customer: &str) -> ValidationResult<()> {
    let customer = customer.trim();

    if customer.is_empty() {
        return Err(ValidationError::Required {
            field: "customer".to_string(),
        });
    }

    if customer.len() > 140 {
        return Err(ValidationError::TooLong {
            field: "customer".to_string(),
            max: 140,
        });
    }

    Ok(())
}

/// Validates an item code.
pub fn validate_item_code(item_code: &str) -> ValidationResult<()> {
    let item_code = item_code.trim();

    if item_code.is_empty() {
        return Err(ValidationError::Required {
            field: "item_code".to_string(),
        });
    }

    if item_code.len() > 140 {
        return Err(ValidationError::TooLong {
            field: "item_code".to_string(),
            max: 140,
        });
    }

    Ok(())
}

/// Validates a line quantity.
///
/// ## Rules
/// - Must be non-zero (zero-qty lines are dropped before this runs)
/// - |qty| must not exceed [`MAX_LINE_QTY`]
/// - Sales carry positive quantities, returns negative; the sign rule is
///   enforced by the caller which knows whether the draft is a return
pub fn validate_line_qty(qty: i64) -> ValidationResult<()> {
    if qty == 0 {
        return Err(ValidationError::Required {
            field: "qty".to_string(),
        });
    }

    if qty.abs() > MAX_LINE_QTY {
        return Err(ValidationError::OutOfRange {
            field: "qty".to_string(),
            min: -MAX_LINE_QTY,
            max: MAX_LINE_QTY,
        });
    }

    Ok(())
}

/// Validates the number of lines on a draft.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count == 0 {
        return Err(ValidationError::Required {
            field: "lines".to_string(),
        });
    }

    if count > MAX_INVOICE_LINES {
        return Err(ValidationError::TooMany {
            field: "lines".to_string(),
            max: MAX_INVOICE_LINES,
        });
    }

    Ok(())
}

/// Validates a POS profile name.
pub fn validate_pos_profile(profile: &str) -> ValidationResult<()> {
    let profile = profile.trim();

    if profile.is_empty() {
        return Err(ValidationError::Required {
            field: "pos_profile".to_string(),
        });
    }

    if profile.len() > 140 {
        return Err(ValidationError::TooLong {
            field: "pos_profile".to_string(),
            max: 140,
        });
    }

    Ok(())
}

/// Validates a declared opening float. Zero is allowed (empty drawer).
pub fn validate_opening_float(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "opening_float".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a rate in cents. Zero is allowed (free items).
///
/// The upper bound keeps `qty * rate_cents` and the invoice subtotal
/// representable in i64 for any payload that passes the qty and line-count
/// validators.
pub fn validate_rate_cents(cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_RATE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: "rate".to_string(),
            min: 0,
            max: MAX_RATE_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
