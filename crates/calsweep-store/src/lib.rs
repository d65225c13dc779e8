//! SQLite persistence for event rows.
//!
//! [`EventStore`] keeps one row per event id. Writes are batched upserts:
//! each batch is a single transaction, and re-running with overlapping data
//! overwrites rather than duplicates.

pub mod error;
pub mod sqlite;

pub use error::{StoreError, StoreResult};
pub use sqlite::{DEFAULT_BATCH_SIZE, EventStore, UpsertSummary};
