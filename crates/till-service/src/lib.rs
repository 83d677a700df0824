//! # till-service: Service Layer for Till POS
//!
//! Orchestrates till-core business logic over till-db persistence. This is
//! the crate an RPC transport embeds: every operation takes and returns
//! serde-serializable values and a structured `{ code, message }` error.
//!
//! ## Operations
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                          TillService                               │
//! │                                                                    │
//! │  submit_invoice ──► idempotent submission guard (guard.rs)         │
//! │  cancel_invoice ──► administrative cancel, releases the token      │
//! │  validate_return ─► return-allowance check (returns.rs)            │
//! │  open_shift ──────► idempotent shift open (shifts.rs)              │
//! │  close_shift ─────► status-guarded close                           │
//! │  current_shift ───► caller's open shift, if any                    │
//! │                                                                    │
//! │  Injected collaborators:                                           │
//! │  ├── Database          (till-db pool + repositories)               │
//! │  ├── TokenCache        (bounded TTL, token → finalized invoice id) │
//! │  └── PermissionChecker (yes/no per record type + action + caller)  │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Idempotency Contract
//! For all submissions sharing the same non-empty token, at most one
//! invoice ever reaches `finalized`, and every call returns the same
//! invoice id. See [`guard`] for the exact sequence of checks.

pub mod cache;
pub mod dto;
pub mod error;
pub mod guard;
pub mod permissions;
pub mod returns;
pub mod shifts;

use std::sync::Arc;

use till_db::Database;

pub use cache::TokenCache;
pub use dto::{
    DraftLine, DraftPayment, InvoiceDraft, OpenShiftRequest, SubmitRequest, ValidateReturnRequest,
};
pub use error::{ErrorCode, ErrorEnvelope, ServiceError, ServiceResult};
pub use permissions::{Action, AllowAll, PermissionChecker, PermissionDenied};

/// The service facade.
///
/// Cheap to clone; all state lives behind Arcs or the database pool.
#[derive(Clone)]
pub struct TillService {
    db: Database,
    tokens: Arc<TokenCache>,
    permissions: Arc<dyn PermissionChecker>,
}

impl TillService {
    /// Builds a service over a database with explicit collaborators.
    pub fn new(
        db: Database,
        tokens: Arc<TokenCache>,
        permissions: Arc<dyn PermissionChecker>,
    ) -> Self {
        TillService {
            db,
            tokens,
            permissions,
        }
    }

    /// Convenience constructor: default cache, allow-all permissions.
    /// Suitable for embedding behind a transport that authenticates
    /// upstream, and for tests.
    pub fn with_defaults(db: Database) -> Self {
        TillService::new(db, Arc::new(TokenCache::default()), Arc::new(AllowAll))
    }

    pub(crate) fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    pub(crate) fn permissions(&self) -> &dyn PermissionChecker {
        self.permissions.as_ref()
    }
}
