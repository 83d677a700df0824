//! # Return Validation Operation
//!
//! Loads the original invoice and its finalized returns, then delegates to
//! the pure allowance math in till-core.
//!
//! Two callers:
//! - `validate_return` - the cashier-facing pre-check; failures come back
//!   as a structured `ReturnCheck { valid: false, reason }`, never thrown.
//! - the submission guard - runs the same check before persisting a return
//!   draft, turning a rejection into a validation error.

use tracing::debug;

use crate::error::{ServiceError, ServiceResult};
use crate::permissions::Action;
use crate::{dto::ValidateReturnRequest, TillService};
use till_core::{CoreError, InvoiceStatus, ReturnAllowance, ReturnCheck, ReturnLine};

impl TillService {
    /// Validates candidate return lines against an original invoice.
    ///
    /// No original reference means every candidate is accepted (the
    /// return-without-original policy). A missing original is a NotFound
    /// error; an unfinalized one is a business-rule error - neither is a
    /// "rejection" the cashier can argue with.
    pub async fn validate_return(
        &self,
        caller: &str,
        req: ValidateReturnRequest,
    ) -> ServiceResult<ReturnCheck> {
        self.permissions().check("invoice", Action::Read, caller)?;

        let Some(original_id) = req.original_id else {
            debug!("return without original reference, accepted");
            return Ok(ReturnCheck::ok());
        };

        self.check_return_allowance(&original_id, &req.lines).await
    }

    /// Builds the allowance for `original_id` and checks `candidates`
    /// against it.
    pub(crate) async fn check_return_allowance(
        &self,
        original_id: &str,
        candidates: &[ReturnLine],
    ) -> ServiceResult<ReturnCheck> {
        let invoices = self.db().invoices();

        let original = invoices
            .get_by_id(original_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invoice", original_id))?;

        if original.status != InvoiceStatus::Finalized {
            return Err(CoreError::OriginalNotFinalized(original_id.to_string()).into());
        }

        let original_lines = invoices.get_lines(original_id).await?;
        let prior_return_lines = invoices.finalized_return_lines(original_id).await?;

        let mut allowance = ReturnAllowance::new(&original_lines, &prior_return_lines);
        let check = allowance.check(candidates);

        debug!(
            original = %original_id,
            candidates = candidates.len(),
            valid = check.valid,
            "return allowance checked"
        );

        Ok(check)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
