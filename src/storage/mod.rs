//! Persistent sample history.
//!
//! One backend: an embedded SQLite database holding the append-only
//! `usage_history` table. Rows are written once per collection tick and
//! removed in bulk by the daily retention sweep; there is no read path in
//! normal operation.

pub mod error;
pub mod sqlite;

pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteStore;
