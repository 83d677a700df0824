//! # till-db: Database Layer for Till POS
//!
//! SQLite persistence for invoices and shifts, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Data Flow                          │
//! │                                                                    │
//! │  Service operation (submit_invoice, open_shift, ...)               │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  ┌──────────────────────────────────────────────────────────────┐  │
//! │  │                    till-db (THIS CRATE)                      │  │
//! │  │                                                              │  │
//! │  │   ┌─────────────┐   ┌───────────────┐   ┌───────────────┐   │  │
//! │  │   │  Database   │   │ Repositories  │   │  Migrations   │   │  │
//! │  │   │  (pool.rs)  │◄──│ invoice.rs    │   │  (embedded)   │   │  │
//! │  │   │ SqlitePool  │   │ shift.rs      │   │  001_*.sql    │   │  │
//! │  │   └─────────────┘   └───────────────┘   └───────────────┘   │  │
//! │  └──────────────────────────────────────────────────────────────┘  │
//! │       │                                                            │
//! │       ▼                                                            │
//! │  SQLite database file (WAL mode, foreign keys on)                  │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (invoice, shift)
//!
//! ## Query Style
//! Queries use the runtime-checked `sqlx::query` / `sqlx::query_as` forms
//! with `FromRow` derives on the till-core types, so the workspace builds
//! without a DATABASE_URL or a prepared query cache.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::invoice::InvoiceRepository;
pub use repository::profile::ProfileRepository;
pub use repository::shift::ShiftRepository;
