//! # Request / Response DTOs
//!
//! JSON-shaped payloads for the service operations. Responses reuse the
//! till-core types ([`till_core::SubmitReceipt`], [`till_core::ReturnCheck`],
//! [`till_core::Shift`]); this module holds the request side.

use serde::{Deserialize, Serialize};

use till_core::ReturnLine;

/// A line on a draft invoice, as supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftLine {
    pub item_code: String,

    /// Positive on sales, negative on returns.
    pub qty: i64,

    /// Unit price in cents. The backend trusts the till's pricing; it only
    /// derives line amounts and totals from it.
    pub rate_cents: i64,
}

/// A payment on a draft invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPayment {
    pub mode: String,
    pub amount_cents: i64,
}

/// The mutable draft payload of a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    pub customer: String,

    #[serde(default)]
    pub shift_id: Option<String>,

    /// True for return (credit) invoices.
    #[serde(default)]
    pub is_return: bool,

    /// Original invoice a return references. Absent means the
    /// return-without-original policy applies.
    #[serde(default)]
    pub return_against: Option<String>,

    pub lines: Vec<DraftLine>,

    #[serde(default)]
    pub payments: Vec<DraftPayment>,
}

impl InvoiceDraft {
    /// Candidate return lines for allowance checking.
    pub(crate) fn return_lines(&self) -> Vec<ReturnLine> {
        self.lines
            .iter()
            .map(|l| ReturnLine {
                item_code: l.item_code.clone(),
                qty: l.qty,
            })
            .collect()
    }
}

/// A submission: optional idempotency token, the draft, and whether the
/// caller wants the invoice finalized in the same call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    /// Caller-supplied opaque retry token.
    #[serde(default)]
    pub token: Option<String>,

    /// Finalize after persisting the draft.
    #[serde(default)]
    pub finalize: bool,

    pub draft: InvoiceDraft,
}

/// A request to open a cash shift for the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftRequest {
    pub pos_profile: String,

    /// Declared drawer float at opening, in cents.
    #[serde(default)]
    pub opening_float_cents: i64,
}

/// A standalone return-validation request (the cashier-facing pre-check).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReturnRequest {
    /// Original invoice. Absent means every candidate is accepted.
    #[serde(default)]
    pub original_id: Option<String>,

    pub lines: Vec<ReturnLine>,
}

// =============================================================================
// Unit Tests
// =============================================================================
