//! # Return Allowance
//!
//! Pure math for validating return quantities against an original invoice.
//!
//! ## How Allowances Work
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                     Return Allowance Lifecycle                     │
//! │                                                                    │
//! │  Original invoice INV-1:   WIDGET x10, GADGET x2                   │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  Prior finalized returns against INV-1:   WIDGET x-7               │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  ReturnAllowance { WIDGET: 3, GADGET: 2 }                          │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  check([{WIDGET, 4}])  → rejected: "4 exceeds remaining 3"         │
//! │  check([{WIDGET, 2}, {WIDGET, 2}]) → second line rejected          │
//! │                        (lines in one request consume cumulatively) │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This module never touches storage: the caller (till-service) loads the
//! original's lines and the prior finalized return lines, builds an
//! allowance, and checks candidates. The accept-everything policy for
//! returns without an original reference also lives in the caller, since
//! there is no allowance to build.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::InvoiceLine;

// =============================================================================
// Return Check Result
// =============================================================================

/// Structured outcome of a return validation.
///
/// Validation failures are results, not errors: callers render `reason` to
/// the cashier without any exception handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ReturnCheck {
    pub fn ok() -> Self {
        ReturnCheck {
            valid: true,
            reason: None,
        }
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        ReturnCheck {
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// A candidate return line, as supplied by the caller.
///
/// Quantity may come in negative (return invoices carry negative lines);
/// only its absolute value matters here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLine {
    pub item_code: String,
    pub qty: i64,
}

// =============================================================================
// Return Allowance
// =============================================================================

/// Remaining returnable quantity per item of one original invoice.
#[derive(Debug, Clone)]
pub struct ReturnAllowance {
    remaining: HashMap<String, i64>,
}

impl ReturnAllowance {
    /// Builds the allowance from the original invoice's lines and the lines
    /// of all returns already finalized against it.
    ///
    /// Sold quantities are summed per item code (an invoice may list the
    /// same item on several lines); returned quantities are consumed by
    /// absolute value. An allowance driven negative by historical data is
    /// clamped to zero - nothing more can be returned either way.
    pub fn new(original_lines: &[InvoiceLine], prior_return_lines: &[InvoiceLine]) -> Self {
        let mut remaining: HashMap<String, i64> = HashMap::new();

        for line in original_lines {
            *remaining.entry(line.item_code.clone()).or_insert(0) += line.qty;
        }

        for line in prior_return_lines {
            if let Some(left) = remaining.get_mut(&line.item_code) {
                *left -= line.qty.abs();
            }
        }

        for left in remaining.values_mut() {
            if *left < 0 {
                *left = 0;
            }
        }

        ReturnAllowance { remaining }
    }

    /// Remaining returnable quantity for an item, if it was sold at all.
    pub fn remaining(&self, item_code: &str) -> Option<i64> {
        self.remaining.get(item_code).copied()
    }

    /// Validates candidate lines against the allowance, consuming it as
    /// lines are accepted so that multiple lines for the same item in one
    /// request are checked cumulatively.
    ///
    /// Returns the first rejection encountered, with a reason naming the
    /// offending item and quantities. Zero-qty lines are ignored. Items
    /// absent from the original are always rejected.
    pub fn check(&mut self, candidates: &[ReturnLine]) -> ReturnCheck {
        for candidate in candidates {
            let qty = candidate.qty.abs();
            if qty == 0 {
                continue;
            }

            match self.remaining.get_mut(&candidate.item_code) {
                None => {
                    return ReturnCheck::rejected(format!(
                        "Item {} was not sold on the original invoice",
                        candidate.item_code
                    ));
                }
                Some(left) if qty > *left => {
                    return ReturnCheck::rejected(format!(
                        "Cannot return {} of item {}: only {} remaining returnable",
                        qty, candidate.item_code, left
                    ));
                }
                Some(left) => {
                    *left -= qty;
                }
            }
        }

        ReturnCheck::ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
