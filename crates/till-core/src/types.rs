//! # Domain Types
//!
//! Core domain types for the Till POS backend.
//!
//! ## Type Hierarchy
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                              │
//! │                                                                    │
//! │  ┌────────────────┐   ┌────────────────┐   ┌────────────────┐     │
//! │  │    Invoice     │   │  InvoiceLine   │   │  PaymentLine   │     │
//! │  │  ────────────  │   │  ────────────  │   │  ────────────  │     │
//! │  │  id (UUID)     │   │  id (UUID)     │   │  id (UUID)     │     │
//! │  │  token         │   │  invoice_id    │   │  invoice_id    │     │
//! │  │  status        │   │  item_code     │   │  mode          │     │
//! │  │  return_against│   │  qty           │   │  amount_cents  │     │
//! │  └────────────────┘   └────────────────┘   └────────────────┘     │
//! │                                                                    │
//! │  ┌────────────────┐   ┌────────────────┐                          │
//! │  │     Shift      │   │ InvoiceStatus  │                          │
//! │  │  ────────────  │   │  ────────────  │                          │
//! │  │  id (UUID)     │   │  Draft         │                          │
//! │  │  user_id       │   │  Finalized     │                          │
//! │  │  status        │   │  Cancelled     │                          │
//! │  └────────────────┘   └────────────────┘                          │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity carries an `id`: UUID v4 string, immutable once assigned,
//! used for all relations. Invoices additionally carry an optional
//! `idempotency_token`: a caller-supplied opaque string used to deduplicate
//! retried submissions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Invoice Status
// =============================================================================

/// Lifecycle state of an invoice.
///
/// ## State Machine
/// ```text
/// (submit)            (finalize)              (admin cancel)
///    ──► Draft ──────────► Finalized ──────────► Cancelled
/// ```
/// A draft may be updated in place by retried submissions carrying the same
/// idempotency token. Finalized invoices are immutable. Cancellation is a
/// separate administrative action; cancelled invoices release their token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
pub enum InvoiceStatus {
    Draft,
    Finalized,
    Cancelled,
}

impl InvoiceStatus {
    /// Lowercase string form, matching the database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Finalized => "finalized",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A sales invoice, draft or finalized.
///
/// Return invoices set `is_return` and link to the original via
/// `return_against`; their line quantities are negative.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    /// Unique identifier (UUID v4). Immutable once assigned.
    pub id: String,

    /// Caller-supplied idempotency token, if any. At most one non-cancelled
    /// invoice may carry a given token.
    pub idempotency_token: Option<String>,

    /// Lifecycle state.
    pub status: InvoiceStatus,

    /// Customer identifier.
    pub customer: String,

    /// Cash shift this invoice was rung up under, if any.
    pub shift_id: Option<String>,

    /// True for return (credit) invoices.
    pub is_return: bool,

    /// Original invoice a return references. `None` for plain sales and for
    /// returns accepted under the return-without-original policy.
    pub return_against: Option<String>,

    /// Sum of line amounts, in cents.
    pub subtotal_cents: i64,

    /// Grand total, in cents.
    pub total_cents: i64,

    /// When the first submission attempt created this record.
    pub created_at: DateTime<Utc>,

    /// Last draft update.
    pub updated_at: DateTime<Utc>,

    /// When the invoice reached `Finalized`, if it has.
    pub finalized_at: Option<DateTime<Utc>>,
}

/// A single line on an invoice.
///
/// ## Snapshot Pattern
/// `rate_cents` is captured at sale time; later price changes never touch
/// historical invoices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceLine {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Parent invoice.
    pub invoice_id: String,

    /// Business identifier of the item sold.
    pub item_code: String,

    /// Quantity sold. Negative on return invoices.
    pub qty: i64,

    /// Unit price at sale time, in cents.
    pub rate_cents: i64,

    /// Line amount (`qty * rate_cents`), in cents.
    pub amount_cents: i64,
}

/// A payment applied to an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PaymentLine {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Parent invoice.
    pub invoice_id: String,

    /// Mode of payment ("cash", "card", ...). Opaque to the backend.
    pub mode: String,

    /// Amount paid, in cents. Negative on refunds.
    pub amount_cents: i64,
}

// =============================================================================
// Shift
// =============================================================================

/// Lifecycle state of a cash shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
pub enum ShiftStatus {
    Open,
    Closed,
}

impl ShiftStatus {
    /// Lowercase string form, matching the database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ShiftStatus::Open => "open",
            ShiftStatus::Closed => "closed",
        }
    }
}

/// A cash shift: the period between a cashier opening and closing a drawer.
///
/// A cashier has at most one open shift at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Shift {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// POS profile the shift runs under.
    pub pos_profile: String,

    /// Cashier who opened the shift.
    pub user_id: String,

    /// Lifecycle state.
    pub status: ShiftStatus,

    /// Declared drawer float at opening, in cents.
    pub opening_float_cents: i64,

    /// Counted drawer total at closing, in cents. `None` while open.
    pub closing_total_cents: Option<i64>,

    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Submission Receipt
// =============================================================================

/// Outcome of a submission: which invoice the caller ended up with.
///
/// The id is stable across retries carrying the same idempotency token -
/// a retried submission of a finalized invoice returns the same receipt
/// without performing new work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    /// Identifier of the invoice produced (or found) for this submission.
    pub id: String,

    /// Its lifecycle state after the call.
    pub status: InvoiceStatus,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_as_str_matches_serde() {
        assert_eq!(InvoiceStatus::Draft.as_str(), "draft");
        assert_eq!(InvoiceStatus::Finalized.as_str(), "finalized");
        assert_eq!(InvoiceStatus::Cancelled.as_str(), "cancelled");

        let json = serde_json::to_string(&InvoiceStatus::Finalized).unwrap();
        assert_eq!(json, "\"finalized\"");
    }

    #[test]
    fn test_receipt_round_trips() {
        let receipt = SubmitReceipt {
            id: "abc".to_string(),
            status: InvoiceStatus::Draft,
        };
        let json = serde_json::to_string(&receipt).unwrap();
        let back: SubmitReceipt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, receipt);
    }
}
