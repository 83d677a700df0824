//! # Shift Operations
//!
//! Opening a shift is idempotent per user: if the caller already has an
//! open shift, that shift is returned instead of a duplicate. The
//! one-open-shift-per-user index backs the invariant against concurrent
//! opens, the same check/recheck shape as the submission guard.

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::dto::OpenShiftRequest;
use crate::error::{ServiceError, ServiceResult};
use crate::permissions::Action;
use crate::TillService;
use till_core::{validation, CoreError, Shift, ShiftStatus};

impl TillService {
    /// Opens a shift for `caller`, or returns their already-open one.
    pub async fn open_shift(&self, caller: &str, req: OpenShiftRequest) -> ServiceResult<Shift> {
        self.permissions().check("shift", Action::Write, caller)?;

        validation::validate_pos_profile(&req.pos_profile)?;
        validation::validate_opening_float(req.opening_float_cents)?;

        let shifts = self.db().shifts();

        if let Some(existing) = shifts.find_open_for_user(caller).await? {
            debug!(user = %caller, id = %existing.id, "shift already open, returning it");
            return Ok(existing);
        }

        let shift = Shift {
            id: Uuid::new_v4().to_string(),
            pos_profile: req.pos_profile.trim().to_string(),
            user_id: caller.to_string(),
            status: ShiftStatus::Open,
            opening_float_cents: req.opening_float_cents,
            closing_total_cents: None,
            opened_at: Utc::now(),
            closed_at: None,
        };

        // A unique violation means a concurrent open won; return theirs.
        if let Err(err) = shifts.open(&shift).await {
            if err.is_unique_violation() {
                if let Some(winner) = shifts.find_open_for_user(caller).await? {
                    debug!(user = %caller, id = %winner.id, "lost open race, returning winner");
                    return Ok(winner);
                }
            }
            return Err(err.into());
        }

        info!(id = %shift.id, user = %caller, float_cents = shift.opening_float_cents, "shift opened");
        Ok(shift)
    }

    /// Closes a shift, recording the counted drawer total.
    ///
    /// Only the shift's owner may close it. Closing an already-closed
    /// shift is a status error, not a silent success.
    pub async fn close_shift(
        &self,
        caller: &str,
        shift_id: &str,
        closing_total_cents: i64,
    ) -> ServiceResult<Shift> {
        self.permissions().check("shift", Action::Write, caller)?;

        let shifts = self.db().shifts();
        let shift = shifts
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Shift", shift_id))?;

        if shift.user_id != caller {
            return Err(ServiceError::not_found("Shift", shift_id));
        }
        if shift.status != ShiftStatus::Open {
            return Err(CoreError::InvalidShiftStatus {
                id: shift_id.to_string(),
                status: shift.status.as_str().to_string(),
            }
            .into());
        }

        shifts.close(shift_id, closing_total_cents).await?;

        let closed = shifts
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Shift", shift_id))?;

        info!(id = %shift_id, user = %caller, total_cents = closing_total_cents, "shift closed");
        Ok(closed)
    }

    /// The caller's open shift, if any.
    pub async fn current_shift(&self, caller: &str) -> ServiceResult<Option<Shift>> {
        self.permissions().check("shift", Action::Read, caller)?;
        Ok(self.db().shifts().find_open_for_user(caller).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
