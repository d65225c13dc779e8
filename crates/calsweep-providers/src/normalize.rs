//! RawEvent to EventRow conversion.
//!
//! Normalization never fails and never drops an event: anything that cannot
//! be interpreted becomes a null column, and a missing id becomes an empty
//! one that the store refuses to persist.

use calsweep_core::{EventRow, date_at_default_time, parse_date, parse_timestamp};
use chrono::{DateTime, Utc};

use crate::raw_event::{RawEvent, RawEventTime};

/// Separator between guest emails in [`EventRow::guests`].
pub const GUEST_SEPARATOR: &str = ", ";

/// Flattens a [`RawEvent`] into an [`EventRow`].
pub fn normalize_event(raw: &RawEvent) -> EventRow {
    EventRow {
        id: raw.id.clone().unwrap_or_default(),
        calendar_id: raw.calendar_id.clone(),
        summary: raw.summary.clone(),
        start_time: convert_time(&raw.start),
        end_time: convert_time(&raw.end),
        guests: join_guests(raw),
        created_at: raw.created.as_deref().and_then(parse_timestamp),
    }
}

/// Flattens a batch of raw events, preserving order.
pub fn normalize_events(raws: &[RawEvent]) -> Vec<EventRow> {
    raws.iter().map(normalize_event).collect()
}

/// Converts a raw start/end to a UTC instant.
///
/// `dateTime` wins over `date`; a date-only value is pinned to midnight UTC.
fn convert_time(raw: &RawEventTime) -> Option<DateTime<Utc>> {
    if let Some(dt) = raw.date_time.as_deref() {
        return parse_timestamp(dt);
    }
    raw.date
        .as_deref()
        .and_then(parse_date)
        .map(date_at_default_time)
}

fn join_guests(raw: &RawEvent) -> String {
    raw.attendees
        .iter()
        .filter_map(|a| a.email.as_deref())
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .collect::<Vec<_>>()
        .join(GUEST_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw_event::RawAttendee;
    use chrono::TimeZone;

    #[test]
    fn normalize_timed_event() {
        let raw = RawEvent::new("evt1", "a@x.com")
            .with_summary("Standup")
            .with_start(RawEventTime::from_date_time("2024-03-15T10:00:00+01:00"))
            .with_end(RawEventTime::from_date_time("2024-03-15T10:15:00+01:00"))
            .with_created("2024-03-01T09:00:00.000Z")
            .with_attendee(RawAttendee::new("bob@x.com"))
            .with_attendee(RawAttendee::new("carol@x.com"));

        let row = normalize_event(&raw);
        assert_eq!(row.id, "evt1");
        assert_eq!(row.calendar_id, "a@x.com");
        assert_eq!(row.summary.as_deref(), Some("Standup"));
        assert_eq!(
            row.start_time,
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap())
        );
        assert_eq!(
            row.end_time,
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 9, 15, 0).unwrap())
        );
        assert_eq!(row.guests, "bob@x.com, carol@x.com");
        assert_eq!(
            row.created_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap())
        );
    }

    #[test]
    fn normalize_all_day_event_pins_midnight_utc() {
        let raw = RawEvent::new("evt2", "a@x.com")
            .with_start(RawEventTime::from_date("2024-03-15"))
            .with_end(RawEventTime::from_date("2024-03-16"));

        let row = normalize_event(&raw);
        assert_eq!(
            row.start_time,
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap())
        );
        assert_eq!(
            row.end_time,
            Some(Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn date_time_wins_over_date() {
        let start = RawEventTime {
            date: Some("2024-03-15".into()),
            date_time: Some("2024-03-15T12:00:00Z".into()),
            time_zone: None,
        };
        let row = normalize_event(&RawEvent::new("evt", "a@x.com").with_start(start));
        assert_eq!(
            row.start_time,
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn no_attendees_gives_empty_guests() {
        let row = normalize_event(&RawEvent::new("evt3", "a@x.com"));
        assert_eq!(row.guests, "");
        assert!(row.summary.is_none());
        assert!(row.start_time.is_none());
        assert!(row.created_at.is_none());
    }

    #[test]
    fn attendees_without_email_are_skipped() {
        let raw = RawEvent::new("evt4", "a@x.com")
            .with_attendee(RawAttendee::default())
            .with_attendee(RawAttendee::new("dave@x.com"))
            .with_attendee(RawAttendee::new("  "));
        assert_eq!(normalize_event(&raw).guests, "dave@x.com");
    }

    #[test]
    fn malformed_values_become_none() {
        let raw = RawEvent::new("evt5", "a@x.com")
            .with_start(RawEventTime::from_date_time("tomorrow at noon"))
            .with_end(RawEventTime::from_date("2024-13-45"))
            .with_created("yesterday");

        let row = normalize_event(&raw);
        assert!(row.start_time.is_none());
        assert!(row.end_time.is_none());
        assert!(row.created_at.is_none());
    }

    #[test]
    fn missing_id_becomes_empty_key() {
        let raw = RawEvent {
            calendar_id: "a@x.com".into(),
            summary: Some("orphan".into()),
            ..RawEvent::default()
        };
        let row = normalize_event(&raw);
        assert_eq!(row.id, "");
        assert!(!row.has_key());
        assert_eq!(row.summary.as_deref(), Some("orphan"));
    }

    #[test]
    fn normalize_events_keeps_order() {
        let raws = vec![
            RawEvent::new("b", "a@x.com"),
            RawEvent::new("a", "a@x.com"),
        ];
        let ids: Vec<_> = normalize_events(&raws).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
