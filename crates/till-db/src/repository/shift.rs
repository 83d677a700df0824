//! # Shift Repository
//!
//! Database operations for cash shifts.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::Shift;

const SHIFT_COLUMNS: &str = "id, pos_profile, user_id, status, opening_float_cents, \
     closing_total_cents, opened_at, closed_at";

/// Repository for shift database operations.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Gets a shift by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// The caller's open shift, if one exists.
    ///
    /// The one-open-shift-per-user index guarantees at most one row.
    pub async fn find_open_for_user(&self, user_id: &str) -> DbResult<Option<Shift>> {
        let shift = sqlx::query_as::<_, Shift>(&format!(
            "SELECT {SHIFT_COLUMNS} FROM shifts WHERE user_id = ?1 AND status = 'open'"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shift)
    }

    /// Inserts a new open shift.
    ///
    /// A unique violation means another open shift exists for the user;
    /// the service resolves that by returning the existing one.
    pub async fn open(&self, shift: &Shift) -> DbResult<()> {
        debug!(id = %shift.id, user = %shift.user_id, "opening shift");

        sqlx::query(
            "INSERT INTO shifts ( \
                 id, pos_profile, user_id, status, opening_float_cents, \
                 closing_total_cents, opened_at, closed_at \
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&shift.id)
        .bind(&shift.pos_profile)
        .bind(&shift.user_id)
        .bind(shift.status)
        .bind(shift.opening_float_cents)
        .bind(shift.closing_total_cents)
        .bind(shift.opened_at)
        .bind(shift.closed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Transitions an open shift to closed, recording the counted total.
    pub async fn close(&self, id: &str, closing_total_cents: i64) -> DbResult<()> {
        let now = chrono::Utc::now();

        let result = sqlx::query(
            "UPDATE shifts SET status = 'closed', closing_total_cents = ?2, closed_at = ?3 \
             WHERE id = ?1 AND status = 'open'",
        )
        .bind(id)
        .bind(closing_total_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shift (open)", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
