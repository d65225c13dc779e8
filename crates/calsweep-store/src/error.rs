//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while persisting or reading event rows.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("batch size must be greater than zero")]
    InvalidBatchSize,

    /// A batch was rolled back; everything before it stays committed.
    #[error("batch {batch} failed after {committed_rows} rows were committed: {source}")]
    Batch {
        /// 1-based index of the failing batch.
        batch: usize,
        committed_rows: usize,
        #[source]
        source: rusqlite::Error,
    },
}

impl StoreError {
    /// Rows durably written before the error, when known.
    pub fn committed_rows(&self) -> Option<usize> {
        match self {
            Self::Batch { committed_rows, .. } => Some(*committed_rows),
            Self::InvalidBatchSize => Some(0),
            _ => None,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
