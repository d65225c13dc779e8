//! SQLite-backed event store.

use std::collections::HashMap;
use std::path::Path;

use calsweep_core::EventRow;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

/// Rows written per transaction unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 500;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS events (
        id TEXT PRIMARY KEY,
        calendar_id TEXT NOT NULL,
        summary TEXT,
        start_time TEXT,
        end_time TEXT,
        guests TEXT NOT NULL,
        created_at TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_events_calendar ON events(calendar_id);
    CREATE INDEX IF NOT EXISTS idx_events_start ON events(start_time);
"#;

const UPSERT: &str = r#"
    INSERT INTO events (id, calendar_id, summary, start_time, end_time, guests, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
    ON CONFLICT(id) DO UPDATE SET
        calendar_id = excluded.calendar_id,
        summary = excluded.summary,
        start_time = excluded.start_time,
        end_time = excluded.end_time,
        guests = excluded.guests,
        created_at = excluded.created_at
"#;

const EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM events WHERE id = ?1)";

const SELECT_COLUMNS: &str =
    "SELECT id, calendar_id, summary, start_time, end_time, guests, created_at FROM events";

/// Outcome of an [`EventStore::upsert`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    /// Distinct rows written; always `inserted + updated`.
    pub written: usize,
    /// Rows whose id was not stored before.
    pub inserted: usize,
    /// Rows that replaced a stored row with the same id.
    pub updated: usize,
    /// Input rows superseded by a later row with the same id.
    pub merged: usize,
    /// Rows skipped because their id was empty.
    pub rejected: usize,
    /// Transactions committed.
    pub batches: usize,
}

/// Persistent table of event rows keyed by event id.
pub struct EventStore {
    conn: Connection,
}

impl EventStore {
    /// Opens (or creates) the database at `path`, creating parent
    /// directories as needed.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        debug!("opened event store at {:?}", path);
        Self::bootstrap(conn)
    }

    /// Creates a store that lives only as long as this value.
    pub fn in_memory() -> StoreResult<Self> {
        Self::bootstrap(Connection::open_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Inserts or overwrites `rows` in batches of at most `batch_size`.
    ///
    /// Each batch is one transaction. Rows without an id are skipped and
    /// counted as rejected. When the input holds the same id more than once,
    /// only the last row is written, at the position of the first.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidBatchSize`] if `batch_size` is zero;
    /// [`StoreError::Batch`] when a batch fails, in which case that batch is
    /// rolled back and no further batches are attempted.
    pub fn upsert(&mut self, rows: &[EventRow], batch_size: usize) -> StoreResult<UpsertSummary> {
        if batch_size == 0 {
            return Err(StoreError::InvalidBatchSize);
        }

        let (keyed, rejected): (Vec<&EventRow>, Vec<&EventRow>) =
            rows.iter().partition(|row| row.has_key());
        if !rejected.is_empty() {
            warn!(
                count = rejected.len(),
                "skipping rows without an event id"
            );
        }

        let (keyed, merged) = merge_duplicate_ids(keyed);
        if merged > 0 {
            debug!(merged, "merged rows sharing an event id");
        }

        let mut summary = UpsertSummary {
            rejected: rejected.len(),
            merged,
            ..UpsertSummary::default()
        };

        for (index, batch) in keyed.chunks(batch_size).enumerate() {
            let batch_number = index + 1;
            let wrap = |source| StoreError::Batch {
                batch: batch_number,
                committed_rows: summary.written,
                source,
            };

            let tx = self.conn.transaction().map_err(wrap)?;
            let inserted = write_batch(&tx, batch).map_err(wrap)?;
            tx.commit().map_err(wrap)?;

            summary.written += batch.len();
            summary.inserted += inserted;
            summary.updated += batch.len() - inserted;
            summary.batches += 1;
            debug!(batch = batch_number, rows = batch.len(), "committed batch");
        }

        info!(
            written = summary.written,
            inserted = summary.inserted,
            updated = summary.updated,
            rejected = summary.rejected,
            batches = summary.batches,
            "upsert complete"
        );
        Ok(summary)
    }

    /// Number of stored rows.
    pub fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Fetches one row by event id.
    pub fn get(&self, id: &str) -> StoreResult<Option<EventRow>> {
        let row = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                row_to_event,
            )
            .optional()?;
        Ok(row)
    }

    /// All rows ordered by start time (nulls last), then id.
    pub fn all(&self) -> StoreResult<Vec<EventRow>> {
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_COLUMNS} ORDER BY start_time IS NULL, start_time, id"
        ))?;
        let rows = stmt.query_map([], row_to_event)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

/// Keeps the last row per id, in first-seen order. Returns the rows and how
/// many were dropped.
fn merge_duplicate_ids(rows: Vec<&EventRow>) -> (Vec<&EventRow>, usize) {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(rows.len());
    let mut merged_rows: Vec<&EventRow> = Vec::with_capacity(rows.len());
    let mut merged = 0;

    for row in rows {
        match positions.get(row.id.as_str()) {
            Some(&index) => {
                merged_rows[index] = row;
                merged += 1;
            }
            None => {
                positions.insert(row.id.as_str(), merged_rows.len());
                merged_rows.push(row);
            }
        }
    }
    (merged_rows, merged)
}

/// Writes one batch and returns how many rows were new.
fn write_batch(tx: &Transaction<'_>, batch: &[&EventRow]) -> rusqlite::Result<usize> {
    let mut exists = tx.prepare_cached(EXISTS)?;
    let mut stmt = tx.prepare_cached(UPSERT)?;
    let mut inserted = 0;
    for row in batch {
        let stored: bool = exists.query_row(params![row.id], |r| r.get(0))?;
        if !stored {
            inserted += 1;
        }
        stmt.execute(params![
            row.id,
            row.calendar_id,
            row.summary,
            row.start_time.map(format_timestamp),
            row.end_time.map(format_timestamp),
            row.guests,
            row.created_at.map(format_timestamp),
        ])?;
    }
    Ok(inserted)
}

/// Timestamps are stored as fixed-width RFC 3339 UTC so they sort as text.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
        })
        .transpose()
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get(0)?,
        calendar_id: row.get(1)?,
        summary: row.get(2)?,
        start_time: parse_column(row, 3)?,
        end_time: parse_column(row, 4)?,
        guests: row.get(5)?,
        created_at: parse_column(row, 6)?,
    })
}
