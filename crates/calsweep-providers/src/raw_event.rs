//! Raw event type from calendar providers.
//!
//! [`RawEvent`] keeps event data in the shape the provider returned it,
//! before it is flattened into an [`EventRow`](calsweep_core::EventRow).
//! Times stay as strings here; parsing them is the normalizer's job so that
//! a malformed value degrades to a null column instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Start or end time of a raw event.
///
/// Timed events carry `date_time`, all-day events carry `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEventTime {
    /// `YYYY-MM-DD` for all-day events.
    pub date: Option<String>,
    /// RFC 3339 timestamp for timed events.
    pub date_time: Option<String>,
    /// IANA timezone the event was scheduled in, if given.
    pub time_zone: Option<String>,
}

impl RawEventTime {
    pub fn from_date_time(value: impl Into<String>) -> Self {
        Self {
            date_time: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn from_date(value: impl Into<String>) -> Self {
        Self {
            date: Some(value.into()),
            ..Self::default()
        }
    }

    fn from_json(value: Option<&Value>) -> Self {
        match value {
            Some(v) => Self {
                date: str_field(v, "date"),
                date_time: str_field(v, "dateTime"),
                time_zone: str_field(v, "timeZone"),
            },
            None => Self::default(),
        }
    }
}

/// An attendee of a calendar event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAttendee {
    pub email: Option<String>,
}

impl RawAttendee {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
        }
    }

    fn from_json(value: &Value) -> Self {
        Self {
            email: str_field(value, "email"),
        }
    }
}

/// A raw calendar event from a provider.
///
/// Every provider field is optional; only `calendar_id` is always known
/// because the caller supplies it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Provider event id.
    pub id: Option<String>,
    /// The calendar this event was fetched from.
    pub calendar_id: String,
    pub summary: Option<String>,
    pub start: RawEventTime,
    pub end: RawEventTime,
    pub attendees: Vec<RawAttendee>,
    /// Creation timestamp as sent by the provider.
    pub created: Option<String>,
}

impl RawEvent {
    /// Creates a raw event with an id and the calendar it came from.
    pub fn new(id: impl Into<String>, calendar_id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            calendar_id: calendar_id.into(),
            ..Self::default()
        }
    }

    /// Extracts a raw event from a Google Calendar API event resource.
    ///
    /// Never fails: fields that are missing or of an unexpected JSON type are
    /// left empty. A non-object value yields an event with only
    /// `calendar_id` set.
    pub fn from_json(value: &Value, calendar_id: impl Into<String>) -> Self {
        let attendees = value
            .get("attendees")
            .and_then(Value::as_array)
            .map(|list| list.iter().map(RawAttendee::from_json).collect())
            .unwrap_or_default();

        Self {
            id: str_field(value, "id"),
            calendar_id: calendar_id.into(),
            summary: str_field(value, "summary"),
            start: RawEventTime::from_json(value.get("start")),
            end: RawEventTime::from_json(value.get("end")),
            attendees,
            created: str_field(value, "created"),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn with_start(mut self, start: RawEventTime) -> Self {
        self.start = start;
        self
    }

    pub fn with_end(mut self, end: RawEventTime) -> Self {
        self.end = end;
        self
    }

    pub fn with_attendee(mut self, attendee: RawAttendee) -> Self {
        self.attendees.push(attendee);
        self
    }

    pub fn with_created(mut self, created: impl Into<String>) -> Self {
        self.created = Some(created.into());
        self
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(String::from)
}
