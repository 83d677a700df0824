//! # Repository Module
//!
//! Typed database access for Till POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  Service operation                                                 │
//! │       │                                                            │
//! │       │  db.invoices().find_by_token("t1", Finalized)              │
//! │       ▼                                                            │
//! │  InvoiceRepository                                                 │
//! │  ├── create_draft / update_draft (one transaction each)            │
//! │  ├── find_by_token / find_conflicting                              │
//! │  ├── finalize / cancel (status-guarded UPDATEs)                    │
//! │  └── finalized_return_lines                                        │
//! │       │                                                            │
//! │       │  SQL                                                       │
//! │       ▼                                                            │
//! │  SQLite                                                            │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQL lives here and nowhere else; callers get domain types back.

pub mod invoice;
pub mod profile;
pub mod shift;
