//! # Invoice Repository
//!
//! Database operations for invoices, their lines and payments.
//!
//! ## Invoice Lifecycle
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                       Invoice Lifecycle                            │
//! │                                                                    │
//! │  1. CREATE DRAFT                                                   │
//! │     └── create_draft() → Invoice { status: Draft }                 │
//! │         (header + lines + payments in one transaction)             │
//! │                                                                    │
//! │  2. RETRIED SUBMISSION (same idempotency token)                    │
//! │     └── update_draft() → replaces lines/payments, keeps id         │
//! │                                                                    │
//! │  3. FINALIZE                                                       │
//! │     └── finalize() → Invoice { status: Finalized }                 │
//! │         (separate statement; failure leaves the draft intact)      │
//! │                                                                    │
//! │  4. (ADMIN) CANCEL                                                 │
//! │     └── cancel() → Invoice { status: Cancelled }, token released   │
//! └────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::{Invoice, InvoiceLine, InvoiceStatus, PaymentLine};

const INVOICE_COLUMNS: &str = "id, idempotency_token, status, customer, shift_id, is_return, \
     return_against, subtotal_cents, total_cents, created_at, updated_at, finalized_at";

/// Repository for invoice database operations.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets an invoice by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Finds the invoice carrying an idempotency token in a given state.
    ///
    /// The guard uses this twice: `Finalized` for the retry fast path,
    /// `Draft` to reuse an in-flight draft instead of creating a new one.
    pub async fn find_by_token(
        &self,
        token: &str,
        status: InvoiceStatus,
    ) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE idempotency_token = ?1 AND status = ?2"
        ))
        .bind(token)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Finds any *other* non-cancelled invoice carrying the token.
    ///
    /// The pre-commit recheck: if some other record claimed the token
    /// between the guard's first lookup and now, the current attempt must
    /// yield to it.
    pub async fn find_conflicting(
        &self,
        token: &str,
        exclude_id: &str,
    ) -> DbResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE idempotency_token = ?1 AND id != ?2 AND status != 'cancelled'"
        ))
        .bind(token)
        .bind(exclude_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Inserts a draft invoice with its lines and payments, atomically.
    ///
    /// A unique violation on the token index surfaces as
    /// [`DbError::UniqueViolation`]; the guard resolves it by returning the
    /// winning invoice.
    pub async fn create_draft(
        &self,
        invoice: &Invoice,
        lines: &[InvoiceLine],
        payments: &[PaymentLine],
    ) -> DbResult<()> {
        debug!(id = %invoice.id, lines = lines.len(), "inserting draft invoice");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO invoices ( \
                 id, idempotency_token, status, customer, shift_id, is_return, \
                 return_against, subtotal_cents, total_cents, \
                 created_at, updated_at, finalized_at \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&invoice.id)
        .bind(&invoice.idempotency_token)
        .bind(invoice.status)
        .bind(&invoice.customer)
        .bind(&invoice.shift_id)
        .bind(invoice.is_return)
        .bind(&invoice.return_against)
        .bind(invoice.subtotal_cents)
        .bind(invoice.total_cents)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .bind(invoice.finalized_at)
        .execute(&mut *tx)
        .await?;

        for line in lines {
            insert_line(&mut tx, line).await?;
        }
        for payment in payments {
            insert_payment(&mut tx, payment).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Rewrites an existing draft in place: header fields are updated and
    /// lines/payments replaced, atomically. The id (and created_at) never
    /// change.
    ///
    /// Fails with NotFound if the row is no longer a draft - a concurrent
    /// retry may have finalized it first.
    pub async fn update_draft(
        &self,
        invoice: &Invoice,
        lines: &[InvoiceLine],
        payments: &[PaymentLine],
    ) -> DbResult<()> {
        debug!(id = %invoice.id, lines = lines.len(), "updating draft invoice");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE invoices SET \
                 idempotency_token = ?2, customer = ?3, shift_id = ?4, \
                 is_return = ?5, return_against = ?6, \
                 subtotal_cents = ?7, total_cents = ?8, updated_at = ?9 \
             WHERE id = ?1 AND status = 'draft'",
        )
        .bind(&invoice.id)
        .bind(&invoice.idempotency_token)
        .bind(&invoice.customer)
        .bind(&invoice.shift_id)
        .bind(invoice.is_return)
        .bind(&invoice.return_against)
        .bind(invoice.subtotal_cents)
        .bind(invoice.total_cents)
        .bind(invoice.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice (draft)", &invoice.id));
        }

        sqlx::query("DELETE FROM invoice_lines WHERE invoice_id = ?1")
            .bind(&invoice.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM payments WHERE invoice_id = ?1")
            .bind(&invoice.id)
            .execute(&mut *tx)
            .await?;

        for line in lines {
            insert_line(&mut tx, line).await?;
        }
        for payment in payments {
            insert_payment(&mut tx, payment).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Transitions a draft to `finalized`.
    ///
    /// Status-guarded: only a draft can be finalized, so a retry racing a
    /// completed finalization fails here instead of double-finalizing.
    pub async fn finalize(&self, id: &str) -> DbResult<()> {
        let now = chrono::Utc::now();

        let result = sqlx::query(
            "UPDATE invoices SET \
                 status = 'finalized', finalized_at = ?2, updated_at = ?2 \
             WHERE id = ?1 AND status = 'draft'",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice (draft)", id));
        }

        Ok(())
    }

    /// Cancels a finalized invoice (administrative action).
    ///
    /// Cancellation releases the idempotency token: the partial unique
    /// index ignores cancelled rows.
    pub async fn cancel(&self, id: &str) -> DbResult<()> {
        let now = chrono::Utc::now();

        let result = sqlx::query(
            "UPDATE invoices SET status = 'cancelled', updated_at = ?2 \
             WHERE id = ?1 AND status = 'finalized'",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice (finalized)", id));
        }

        Ok(())
    }

    /// Gets all lines of an invoice.
    pub async fn get_lines(&self, invoice_id: &str) -> DbResult<Vec<InvoiceLine>> {
        let lines = sqlx::query_as::<_, InvoiceLine>(
            "SELECT id, invoice_id, item_code, qty, rate_cents, amount_cents \
             FROM invoice_lines WHERE invoice_id = ?1 ORDER BY rowid",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Gets all payments of an invoice.
    pub async fn get_payments(&self, invoice_id: &str) -> DbResult<Vec<PaymentLine>> {
        let payments = sqlx::query_as::<_, PaymentLine>(
            "SELECT id, invoice_id, mode, amount_cents \
             FROM payments WHERE invoice_id = ?1 ORDER BY rowid",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    /// Lines of every finalized return referencing an original invoice.
    ///
    /// Input to the return-allowance computation: these quantities have
    /// already been consumed.
    pub async fn finalized_return_lines(&self, original_id: &str) -> DbResult<Vec<InvoiceLine>> {
        let lines = sqlx::query_as::<_, InvoiceLine>(
            "SELECT l.id, l.invoice_id, l.item_code, l.qty, l.rate_cents, l.amount_cents \
             FROM invoice_lines l \
             JOIN invoices i ON i.id = l.invoice_id \
             WHERE i.return_against = ?1 AND i.is_return = 1 AND i.status = 'finalized'",
        )
        .bind(original_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }
}

async fn insert_line(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    line: &InvoiceLine,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO invoice_lines (id, invoice_id, item_code, qty, rate_cents, amount_cents) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(&line.id)
    .bind(&line.invoice_id)
    .bind(&line.item_code)
    .bind(line.qty)
    .bind(line.rate_cents)
    .bind(line.amount_cents)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_payment(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    payment: &PaymentLine,
) -> DbResult<()> {
    sqlx::query(
        "INSERT INTO payments (id, invoice_id, mode, amount_cents) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(&payment.id)
    .bind(&payment.invoice_id)
    .bind(&payment.mode)
    .bind(payment.amount_cents)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use uuid::Uuid;

    fn draft(token: Option<&str>) -> Invoice {
        let now = Utc::now();
        Invoice {
            id: Uuid::new_v4().to_string(),
            idempotency_token: token.map(|t| t.to_string()),
            status: InvoiceStatus::Draft,
            customer: "Walk-in Customer".to_string(),
            shift_id: None,
            is_return: false,
            return_against: None,
            subtotal_cents: 1000,
            total_cents: 1000,
            created_at: now,
            updated_at: now,
            finalized_at: None,
        }
    }

    fn lines_for(invoice: &Invoice) -> Vec<InvoiceLine> {
        vec![InvoiceLine {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice.id.clone(),
            item_code: "WIDGET".to_string(),
            qty: 10,
            rate_cents: 100,
            amount_cents: 1000,
        }]
    }

    async fn test_db() -> Database {
        Database::open(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_fetch_draft() {
        let db = test_db().await;
        let repo = db.invoices();

        let invoice = draft(Some("t1"));
        repo.create_draft(&invoice, &lines_for(&invoice), &[])
            .await
            .unwrap();

        let fetched = repo.get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, InvoiceStatus::Draft);
        assert_eq!(fetched.idempotency_token.as_deref(), Some("t1"));
        assert_eq!(repo.get_lines(&invoice.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_token_filters_on_status() {
        let db = test_db().await;
        let repo = db.invoices();

        let invoice = draft(Some("t2"));
        repo.create_draft(&invoice, &lines_for(&invoice), &[])
            .await
            .unwrap();

        assert!(repo
            .find_by_token("t2", InvoiceStatus::Draft)
            .await
            .unwrap()
            .is_some());
        assert!(repo
            .find_by_token("t2", InvoiceStatus::Finalized)
            .await
            .unwrap()
            .is_none());

        repo.finalize(&invoice.id).await.unwrap();

        assert!(repo
            .find_by_token("t2", InvoiceStatus::Finalized)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_finalize_is_single_shot() {
        let db = test_db().await;
        let repo = db.invoices();

        let invoice = draft(None);
        repo.create_draft(&invoice, &lines_for(&invoice), &[])
            .await
            .unwrap();

        repo.finalize(&invoice.id).await.unwrap();
        let err = repo.finalize(&invoice.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let fetched = repo.get_by_id(&invoice.id).await.unwrap().unwrap();
        assert!(fetched.finalized_at.is_some());
    }

    #[tokio::test]
    async fn test_token_index_rejects_second_live_holder() {
        let db = test_db().await;
        let repo = db.invoices();

        let first = draft(Some("t3"));
        repo.create_draft(&first, &lines_for(&first), &[])
            .await
            .unwrap();

        let second = draft(Some("t3"));
        let err = repo
            .create_draft(&second, &lines_for(&second), &[])
            .await
            .unwrap_err();
        assert!(err.is_unique_violation(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_cancel_releases_token() {
        let db = test_db().await;
        let repo = db.invoices();

        let first = draft(Some("t4"));
        repo.create_draft(&first, &lines_for(&first), &[])
            .await
            .unwrap();
        repo.finalize(&first.id).await.unwrap();
        repo.cancel(&first.id).await.unwrap();

        // Token free again: a new draft may claim it.
        let second = draft(Some("t4"));
        repo.create_draft(&second, &lines_for(&second), &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_draft_replaces_lines() {
        let db = test_db().await;
        let repo = db.invoices();

        let mut invoice = draft(Some("t5"));
        repo.create_draft(&invoice, &lines_for(&invoice), &[])
            .await
            .unwrap();

        invoice.customer = "ACME Corp".to_string();
        let new_lines = vec![
            InvoiceLine {
                id: Uuid::new_v4().to_string(),
                invoice_id: invoice.id.clone(),
                item_code: "WIDGET".to_string(),
                qty: 2,
                rate_cents: 100,
                amount_cents: 200,
            },
            InvoiceLine {
                id: Uuid::new_v4().to_string(),
                invoice_id: invoice.id.clone(),
                item_code: "GADGET".to_string(),
                qty: 1,
                rate_cents: 500,
                amount_cents: 500,
            },
        ];
        repo.update_draft(&invoice, &new_lines, &[]).await.unwrap();

        let fetched = repo.get_by_id(&invoice.id).await.unwrap().unwrap();
        assert_eq!(fetched.customer, "ACME Corp");
        assert_eq!(repo.get_lines(&invoice.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_draft_refuses_finalized_invoice() {
        let db = test_db().await;
        let repo = db.invoices();

        let invoice = draft(None);
        repo.create_draft(&invoice, &lines_for(&invoice), &[])
            .await
            .unwrap();
        repo.finalize(&invoice.id).await.unwrap();

        let err = repo.update_draft(&invoice, &[], &[]).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_finalized_return_lines_ignores_drafts() {
        let db = test_db().await;
        let repo = db.invoices();

        let original = draft(None);
        repo.create_draft(&original, &lines_for(&original), &[])
            .await
            .unwrap();
        repo.finalize(&original.id).await.unwrap();

        // One finalized return (qty -7) and one still-draft return (qty -2).
        for (qty, finalize) in [(-7_i64, true), (-2, false)] {
            let now = Utc::now();
            let ret = Invoice {
                id: Uuid::new_v4().to_string(),
                idempotency_token: None,
                status: InvoiceStatus::Draft,
                customer: original.customer.clone(),
                shift_id: None,
                is_return: true,
                return_against: Some(original.id.clone()),
                subtotal_cents: qty * 100,
                total_cents: qty * 100,
                created_at: now,
                updated_at: now,
                finalized_at: None,
            };
            let line = InvoiceLine {
                id: Uuid::new_v4().to_string(),
                invoice_id: ret.id.clone(),
                item_code: "WIDGET".to_string(),
                qty,
                rate_cents: 100,
                amount_cents: qty * 100,
            };
            repo.create_draft(&ret, &[line], &[]).await.unwrap();
            if finalize {
                repo.finalize(&ret.id).await.unwrap();
            }
        }

        let consumed = repo.finalized_return_lines(&original.id).await.unwrap();
        assert_eq!(consumed.len(), 1);
        assert_eq!(consumed[0].qty, -7);
    }
}
