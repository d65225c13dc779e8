//! The flattened event row.
//!
//! [`EventRow`] is the uniform shape every provider event is reduced to,
//! whether it is shown as a table or persisted. Its `id` is the natural key:
//! a row arriving twice with the same id replaces the earlier one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single calendar event flattened into fixed columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRow {
    /// Provider event id; the upsert key.
    pub id: String,
    /// The calendar this row was fetched from.
    pub calendar_id: String,
    /// Event title, if the provider returned one.
    pub summary: Option<String>,
    /// Start instant; all-day events start at midnight UTC.
    pub start_time: Option<DateTime<Utc>>,
    /// End instant; same rule as `start_time`.
    pub end_time: Option<DateTime<Utc>>,
    /// Attendee emails joined with `", "`, empty when there are none.
    pub guests: String,
    /// When the event was created upstream.
    pub created_at: Option<DateTime<Utc>>,
}

impl EventRow {
    /// Creates a row with only the identifying columns set.
    pub fn new(id: impl Into<String>, calendar_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            calendar_id: calendar_id.into(),
            summary: None,
            start_time: None,
            end_time: None,
            guests: String::new(),
            created_at: None,
        }
    }

    /// Returns true when the row carries a usable upsert key.
    pub fn has_key(&self) -> bool {
        !self.id.trim().is_empty()
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_times(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn with_guests(mut self, guests: impl Into<String>) -> Self {
        self.guests = guests.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}
