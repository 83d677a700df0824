//! # Permission Checker
//!
//! Explicit authorization seam for service operations.
//!
//! The decision is a plain yes/no per (record type, action, caller). The
//! service asks before doing anything else; a denial aborts the whole
//! operation with an authorization error. Identity resolution and role
//! models live behind the trait, outside this crate.

use std::fmt;

use thiserror::Error;

/// What the caller wants to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    Submit,
    Cancel,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Read => "read",
            Action::Write => "write",
            Action::Submit => "submit",
            Action::Cancel => "cancel",
        };
        f.write_str(s)
    }
}

/// Permission denied for a (record type, action, caller) triple.
#[derive(Debug, Clone, Error)]
#[error("{caller} is not permitted to {action} {record_type}")]
pub struct PermissionDenied {
    pub record_type: String,
    pub action: Action,
    pub caller: String,
}

/// Yes/no authorization decisions.
///
/// Implementations must be cheap: the check runs on every operation.
pub trait PermissionChecker: Send + Sync {
    fn check(&self, record_type: &str, action: Action, caller: &str)
        -> Result<(), PermissionDenied>;
}

/// Permits everything. For embedding behind a transport that authorizes
/// upstream, and for tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionChecker for AllowAll {
    fn check(&self, _: &str, _: Action, _: &str) -> Result<(), PermissionDenied> {
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
