//! # Idempotent Submission Guard
//!
//! Ensures at most one finalized invoice is ever produced per idempotency
//! token, across retries, partial failures, and concurrent duplicates.
//!
//! ## The Sequence of Checks
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  submit_invoice(token, draft)                                      │
//! │                                                                    │
//! │  1. token cache ──► finalized id known? ──► return it, done        │
//! │  2. store: finalized invoice with token? ──► return it, done       │
//! │  3. store: draft with token? ──► reuse its id (update, not insert) │
//! │  4. merge payload into the draft, stamp the token                  │
//! │  5. RECHECK: any OTHER non-cancelled invoice with the token?       │
//! │     ──► yield to it (closes the race window since step 2)          │
//! │  6. persist draft (one transaction)                                │
//! │     └── UNIQUE violation on token index? a concurrent writer       │
//! │         won between 5 and 6 ──► return the winner                  │
//! │  7. finalize if requested (separate statement)                     │
//! │     └── failure leaves the draft persisted; caller retries,        │
//! │         made safe by steps 1-2                                     │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! This is optimistic concurrency control: no locks, a narrow race window
//! between check and commit, a recheck to shrink it, and the partial unique
//! index as the backstop that makes the invariant unconditional.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dto::{InvoiceDraft, SubmitRequest};
use crate::error::{ServiceError, ServiceResult};
use crate::permissions::Action;
use crate::TillService;
use till_core::{
    validation, CoreError, Invoice, InvoiceLine, InvoiceStatus, PaymentLine, SubmitReceipt,
    ValidationError,
};

impl TillService {
    /// Submits a draft invoice, idempotently when a token is supplied.
    ///
    /// Returns the receipt of whichever invoice ended up owning the token -
    /// not necessarily one created by this call.
    pub async fn submit_invoice(
        &self,
        caller: &str,
        req: SubmitRequest,
    ) -> ServiceResult<SubmitReceipt> {
        self.permissions().check("invoice", Action::Submit, caller)?;

        let token = normalize_token(req.token.as_deref())?;
        validate_draft(&req.draft)?;

        // Returns referencing an original must fit the remaining allowance.
        // Returns without an original are accepted as-is (store policy).
        if req.draft.is_return {
            if let Some(original_id) = &req.draft.return_against {
                let check = self
                    .check_return_allowance(original_id, &req.draft.return_lines())
                    .await?;
                if !check.valid {
                    let reason = check.reason.unwrap_or_else(|| "return rejected".to_string());
                    return Err(ServiceError::Validation(reason));
                }
            }
        }

        let invoices = self.db().invoices();

        // Steps 1-2: a finalized invoice already owns the token.
        if let Some(token) = &token {
            if let Some(id) = self.tokens().get(token) {
                if let Some(existing) = invoices.get_by_id(&id).await? {
                    if existing.status == InvoiceStatus::Finalized {
                        debug!(token = %token, id = %id, "token cache hit, returning finalized invoice");
                        return Ok(receipt(&existing));
                    }
                }
                // The cached invoice vanished or is no longer finalized
                // (cancelled): forget it and consult the store.
                self.tokens().remove(token);
            }

            if let Some(existing) = invoices
                .find_by_token(token, InvoiceStatus::Finalized)
                .await?
            {
                debug!(token = %token, id = %existing.id, "token already finalized, no new work");
                self.tokens().put(token, &existing.id);
                return Ok(receipt(&existing));
            }
        }

        // Step 3: reuse an in-flight draft carrying the token.
        let existing_draft = match &token {
            Some(token) => invoices.find_by_token(token, InvoiceStatus::Draft).await?,
            None => None,
        };

        // Step 4: merge the payload.
        let now = Utc::now();
        let (id, created_at) = match &existing_draft {
            Some(draft) => {
                debug!(token = token.as_deref().unwrap_or(""), id = %draft.id, "updating existing draft");
                (draft.id.clone(), draft.created_at)
            }
            None => (Uuid::new_v4().to_string(), now),
        };

        let (invoice, lines, payments) = build_rows(&id, created_at, now, &token, &req.draft);

        // Step 5: pre-commit recheck for any other live token holder.
        if let Some(token) = &token {
            if let Some(other) = invoices.find_conflicting(token, &id).await? {
                warn!(
                    token = %token,
                    ours = %id,
                    theirs = %other.id,
                    "token claimed since first lookup, yielding to existing invoice"
                );
                if other.status == InvoiceStatus::Finalized {
                    self.tokens().put(token, &other.id);
                }
                return Ok(receipt(&other));
            }
        }

        // Step 6: persist. A unique violation means a concurrent writer won
        // between the recheck and this commit.
        let persist = if existing_draft.is_some() {
            invoices.update_draft(&invoice, &lines, &payments).await
        } else {
            invoices.create_draft(&invoice, &lines, &payments).await
        };

        if let Err(err) = persist {
            if err.is_unique_violation() {
                if let Some(token) = &token {
                    if let Some(winner) = invoices.find_conflicting(token, &id).await? {
                        warn!(token = %token, winner = %winner.id, "lost persist race, returning winner");
                        if winner.status == InvoiceStatus::Finalized {
                            self.tokens().put(token, &winner.id);
                        }
                        return Ok(receipt(&winner));
                    }
                }
            }
            // The reused draft is no longer a draft: a concurrent retry
            // finalized it while this one was building the payload.
            if matches!(err, till_db::DbError::NotFound { .. }) {
                if let Some(raced) = invoices.get_by_id(&id).await? {
                    if raced.status == InvoiceStatus::Finalized {
                        warn!(id = %id, "draft finalized by concurrent retry during update");
                        if let Some(token) = &token {
                            self.tokens().put(token, &id);
                        }
                        return Ok(receipt(&raced));
                    }
                }
            }
            return Err(err.into());
        }

        // Step 7: finalize if requested. On failure the draft stays
        // persisted and the error propagates; the retry is idempotent.
        if req.finalize {
            if let Err(err) = invoices.finalize(&id).await {
                // Status-guarded update found no draft row. If a concurrent
                // retry finalized it, this call's outcome is the same
                // invoice; anything else propagates.
                match invoices.get_by_id(&id).await? {
                    Some(raced) if raced.status == InvoiceStatus::Finalized => {
                        warn!(id = %id, "finalized by concurrent retry");
                    }
                    _ => return Err(err.into()),
                }
            }

            if let Some(token) = &token {
                self.tokens().put(token, &id);
            }

            info!(id = %id, total_cents = invoice.total_cents, is_return = invoice.is_return, "invoice finalized");
            return Ok(SubmitReceipt {
                id,
                status: InvoiceStatus::Finalized,
            });
        }

        info!(id = %id, "draft invoice saved");
        Ok(SubmitReceipt {
            id,
            status: InvoiceStatus::Draft,
        })
    }

    /// Cancels a finalized invoice (administrative action).
    ///
    /// Releases the idempotency token: a later submission may claim it
    /// again.
    pub async fn cancel_invoice(&self, caller: &str, invoice_id: &str) -> ServiceResult<()> {
        self.permissions().check("invoice", Action::Cancel, caller)?;

        let invoices = self.db().invoices();
        let invoice = invoices
            .get_by_id(invoice_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Invoice", invoice_id))?;

        if invoice.status != InvoiceStatus::Finalized {
            return Err(CoreError::InvalidInvoiceStatus {
                id: invoice_id.to_string(),
                status: invoice.status.as_str().to_string(),
            }
            .into());
        }

        invoices.cancel(invoice_id).await?;

        if let Some(token) = &invoice.idempotency_token {
            self.tokens().remove(token);
        }

        info!(id = %invoice_id, "invoice cancelled");
        Ok(())
    }
}

fn receipt(invoice: &Invoice) -> SubmitReceipt {
    SubmitReceipt {
        id: invoice.id.clone(),
        status: invoice.status,
    }
}

/// Trims and validates the token; empty-after-trim is a validation error
/// rather than silently degrading to an unprotected submission.
fn normalize_token(token: Option<&str>) -> Result<Option<String>, ServiceError> {
    match token {
        None => Ok(None),
        Some(raw) => {
            validation::validate_token(raw)?;
            Ok(Some(raw.trim().to_string()))
        }
    }
}

fn validate_draft(draft: &InvoiceDraft) -> Result<(), ServiceError> {
    validation::validate_customer(&draft.customer)?;
    validation::validate_line_count(draft.lines.len())?;

    for line in &draft.lines {
        validation::validate_item_code(&line.item_code)?;
        validation::validate_line_qty(line.qty)?;
        validation::validate_rate_cents(line.rate_cents)?;

        // Sign rule: sales sell, returns give back.
        if draft.is_return && line.qty > 0 {
            return Err(ValidationError::InvalidFormat {
                field: "qty".to_string(),
                reason: format!("return lines must carry negative quantities ({})", line.item_code),
            }
            .into());
        }
        if !draft.is_return && line.qty < 0 {
            return Err(ValidationError::InvalidFormat {
                field: "qty".to_string(),
                reason: format!("sale lines must carry positive quantities ({})", line.item_code),
            }
            .into());
        }
    }

    if draft.return_against.is_some() && !draft.is_return {
        return Err(ValidationError::InvalidFormat {
            field: "return_against".to_string(),
            reason: "only return invoices may reference an original".to_string(),
        }
        .into());
    }

    Ok(())
}

/// Materializes the draft payload into store rows, stamping the token.
fn build_rows(
    id: &str,
    created_at: chrono::DateTime<Utc>,
    now: chrono::DateTime<Utc>,
    token: &Option<String>,
    draft: &InvoiceDraft,
) -> (Invoice, Vec<InvoiceLine>, Vec<PaymentLine>) {
    let lines: Vec<InvoiceLine> = draft
        .lines
        .iter()
        .map(|l| InvoiceLine {
            id: Uuid::new_v4().to_string(),
            invoice_id: id.to_string(),
            item_code: l.item_code.trim().to_string(),
            qty: l.qty,
            rate_cents: l.rate_cents,
            amount_cents: l.qty * l.rate_cents,
        })
        .collect();

    let payments: Vec<PaymentLine> = draft
        .payments
        .iter()
        .map(|p| PaymentLine {
            id: Uuid::new_v4().to_string(),
            invoice_id: id.to_string(),
            mode: p.mode.clone(),
            amount_cents: p.amount_cents,
        })
        .collect();

    let subtotal_cents: i64 = lines.iter().map(|l| l.amount_cents).sum();

    let invoice = Invoice {
        id: id.to_string(),
        idempotency_token: token.clone(),
        status: InvoiceStatus::Draft,
        customer: draft.customer.trim().to_string(),
        shift_id: draft.shift_id.clone(),
        is_return: draft.is_return,
        return_against: draft.return_against.clone(),
        subtotal_cents,
        total_cents: subtotal_cents,
        created_at,
        updated_at: now,
        finalized_at: None,
    };

    (invoice, lines, payments)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::{DraftLine, DraftPayment};
    use crate::permissions::{PermissionChecker, PermissionDenied};
    use crate::TokenCache;
    use std::sync::Arc;
    use std::time::Duration;
    use till_db::{Database, DbConfig};

    async fn service() -> TillService {
        let db = Database::open(DbConfig::in_memory()).await.unwrap();
        TillService::with_defaults(db)
    }

    fn sale_request(token: Option<&str>, finalize: bool) -> SubmitRequest {
        SubmitRequest {
            token: token.map(|t| t.to_string()),
            finalize,
            draft: InvoiceDraft {
                customer: "Walk-in Customer".to_string(),
                shift_id: None,
                is_return: false,
                return_against: None,
                lines: vec![DraftLine {
                    item_code: "WIDGET".to_string(),
                    qty: 2,
                    rate_cents: 150,
                }],
                payments: vec![DraftPayment {
                    mode: "cash".to_string(),
                    amount_cents: 300,
                }],
            },
        }
    }

    async fn count_finalized(service: &TillService) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE status = 'finalized'")
            .fetch_one(service.db().pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_retry_returns_same_invoice() {
        let service = service().await;

        let first = service
            .submit_invoice("cashier-1", sale_request(Some("t1"), true))
            .await
            .unwrap();
        let second = service
            .submit_invoice("cashier-1", sale_request(Some("t1"), true))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.status, InvoiceStatus::Finalized);
        assert_eq!(count_finalized(&service).await, 1);
    }

    #[tokio::test]
    async fn test_retry_survives_cold_cache() {
        let service = service().await;

        let first = service
            .submit_invoice("cashier-1", sale_request(Some("t1"), true))
            .await
            .unwrap();

        // Wipe the cache: the store lookup must still dedupe.
        service.tokens().remove("t1");
        let second = service
            .submit_invoice("cashier-1", sale_request(Some("t1"), true))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(count_finalized(&service).await, 1);
    }

    #[tokio::test]
    async fn test_draft_resubmission_updates_in_place() {
        let service = service().await;

        let first = service
            .submit_invoice("cashier-1", sale_request(Some("t1"), false))
            .await
            .unwrap();
        assert_eq!(first.status, InvoiceStatus::Draft);

        // Same token, amended payload, now finalizing.
        let mut amended = sale_request(Some("t1"), true);
        amended.draft.lines[0].qty = 5;
        let second = service.submit_invoice("cashier-1", amended).await.unwrap();

        assert_eq!(first.id, second.id, "draft reused, not duplicated");
        assert_eq!(second.status, InvoiceStatus::Finalized);

        let lines = service.db().invoices().get_lines(&second.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].qty, 5);
        assert_eq!(lines[0].amount_cents, 750);
    }

    #[tokio::test]
    async fn test_distinct_tokens_produce_distinct_invoices() {
        let service = service().await;

        let a = service
            .submit_invoice("cashier-1", sale_request(Some("t1"), true))
            .await
            .unwrap();
        let b = service
            .submit_invoice("cashier-1", sale_request(Some("t2"), true))
            .await
            .unwrap();

        assert_ne!(a.id, b.id);
        assert_eq!(count_finalized(&service).await, 2);
    }

    #[tokio::test]
    async fn test_tokenless_submissions_never_dedupe() {
        let service = service().await;

        let a = service
            .submit_invoice("cashier-1", sale_request(None, true))
            .await
            .unwrap();
        let b = service
            .submit_invoice("cashier-1", sale_request(None, true))
            .await
            .unwrap();

        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_concurrent_retries_agree_on_one_invoice() {
        let service = service().await;

        let mut handles = Vec::new();
        for _ in 0..5 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .submit_invoice("cashier-1", sale_request(Some("t-race"), true))
                    .await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await.unwrap().unwrap().id);
        }

        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 1, "every retry saw the same invoice");
        assert_eq!(count_finalized(&service).await, 1);
    }

    #[tokio::test]
    async fn test_cancellation_releases_token() {
        let service = service().await;

        let first = service
            .submit_invoice("cashier-1", sale_request(Some("t1"), true))
            .await
            .unwrap();
        service.cancel_invoice("manager-1", &first.id).await.unwrap();

        // Token free again: a new submission claims it with a fresh id.
        let second = service
            .submit_invoice("cashier-1", sale_request(Some("t1"), true))
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(second.status, InvoiceStatus::Finalized);
    }

    #[tokio::test]
    async fn test_cancel_draft_is_rejected() {
        let service = service().await;

        let draft = service
            .submit_invoice("cashier-1", sale_request(None, false))
            .await
            .unwrap();

        let err = service
            .cancel_invoice("manager-1", &draft.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Core(CoreError::InvalidInvoiceStatus { .. })
        ));
    }

    #[tokio::test]
    async fn test_return_submission_respects_allowance() {
        let service = service().await;

        // Sell WIDGET x2, then try to return 3.
        let sale = service
            .submit_invoice("cashier-1", sale_request(None, true))
            .await
            .unwrap();

        let over_return = SubmitRequest {
            token: None,
            finalize: true,
            draft: InvoiceDraft {
                customer: "Walk-in Customer".to_string(),
                shift_id: None,
                is_return: true,
                return_against: Some(sale.id.clone()),
                lines: vec![DraftLine {
                    item_code: "WIDGET".to_string(),
                    qty: -3,
                    rate_cents: 150,
                }],
                payments: vec![],
            },
        };

        let err = service
            .submit_invoice("cashier-1", over_return)
            .await
            .unwrap_err();
        match err {
            ServiceError::Validation(reason) => assert!(reason.contains("WIDGET")),
            other => panic!("expected validation rejection, got {other:?}"),
        }

        // Returning the 2 actually sold is fine.
        let ok_return = SubmitRequest {
            token: None,
            finalize: true,
            draft: InvoiceDraft {
                customer: "Walk-in Customer".to_string(),
                shift_id: None,
                is_return: true,
                return_against: Some(sale.id),
                lines: vec![DraftLine {
                    item_code: "WIDGET".to_string(),
                    qty: -2,
                    rate_cents: 150,
                }],
                payments: vec![],
            },
        };
        let receipt = service.submit_invoice("cashier-1", ok_return).await.unwrap();
        assert_eq!(receipt.status, InvoiceStatus::Finalized);
    }

    #[tokio::test]
    async fn test_return_without_original_accepted() {
        let service = service().await;

        let req = SubmitRequest {
            token: None,
            finalize: true,
            draft: InvoiceDraft {
                customer: "Walk-in Customer".to_string(),
                shift_id: None,
                is_return: true,
                return_against: None,
                lines: vec![DraftLine {
                    item_code: "WIDGET".to_string(),
                    qty: -1,
                    rate_cents: 150,
                }],
                payments: vec![],
            },
        };

        let receipt = service.submit_invoice("cashier-1", req).await.unwrap();
        assert_eq!(receipt.status, InvoiceStatus::Finalized);
    }

    #[tokio::test]
    async fn test_blank_token_rejected() {
        let service = service().await;

        let err = service
            .submit_invoice("cashier-1", sale_request(Some("   "), true))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_extreme_rate_rejected_before_totaling() {
        let service = service().await;

        // qty * rate would overflow i64; the rate cap must reject it first.
        let mut req = sale_request(None, true);
        req.draft.lines[0].qty = 3;
        req.draft.lines[0].rate_cents = i64::MAX / 2;

        let err = service.submit_invoice("cashier-1", req).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn test_sign_rules_enforced() {
        let service = service().await;

        let mut negative_sale = sale_request(None, true);
        negative_sale.draft.lines[0].qty = -2;
        assert!(matches!(
            service
                .submit_invoice("cashier-1", negative_sale)
                .await
                .unwrap_err(),
            ServiceError::Validation(_)
        ));

        let mut positive_return = sale_request(None, true);
        positive_return.draft.is_return = true;
        assert!(matches!(
            service
                .submit_invoice("cashier-1", positive_return)
                .await
                .unwrap_err(),
            ServiceError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_permission_denied_aborts() {
        struct DenySubmit;
        impl PermissionChecker for DenySubmit {
            fn check(
                &self,
                record_type: &str,
                action: Action,
                caller: &str,
            ) -> Result<(), PermissionDenied> {
                if action == Action::Submit {
                    return Err(PermissionDenied {
                        record_type: record_type.to_string(),
                        action,
                        caller: caller.to_string(),
                    });
                }
                Ok(())
            }
        }

        let db = Database::open(DbConfig::in_memory()).await.unwrap();
        let service = TillService::new(
            db,
            Arc::new(TokenCache::new(16, Duration::from_secs(60))),
            Arc::new(DenySubmit),
        );

        let err = service
            .submit_invoice("cashier-1", sale_request(Some("t1"), true))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Authorization(_)));
    }

    #[tokio::test]
    async fn test_stale_cache_entry_falls_through_to_store() {
        let service = service().await;

        // Poison the cache with a token that maps to a missing invoice.
        service.tokens().put("t1", "no-such-id");

        let receipt = service
            .submit_invoice("cashier-1", sale_request(Some("t1"), true))
            .await
            .unwrap();
        assert_eq!(receipt.status, InvoiceStatus::Finalized);

        // And the cache now points at the real invoice.
        assert_eq!(service.tokens().get("t1").as_deref(), Some(receipt.id.as_str()));
    }
}
