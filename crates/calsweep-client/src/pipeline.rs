//! The fetch and collect pipelines.
//!
//! Both start the same way: page through every calendar and flatten the raw
//! events into rows. `fetch` returns the rows as a table, `collect` upserts
//! them into an [`EventStore`].

use tracing::{info, warn};

use calsweep_core::EventTable;
use calsweep_providers::{EventQuery, EventSource, FetchReport, fetch_calendars, normalize_events};
use calsweep_store::{EventStore, UpsertSummary};

use crate::error::ClientResult;

/// Result of a fetch run.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Flattened rows in retrieval order.
    pub table: EventTable,
    /// Per-calendar outcomes.
    pub report: FetchReport,
}

/// Result of a collect run.
#[derive(Debug)]
pub struct CollectOutcome {
    pub summary: UpsertSummary,
    pub report: FetchReport,
}

/// Retrieves and flattens the events of every calendar.
///
/// A fatal provider error aborts the run; any other failure is recorded in
/// the report and the remaining calendars are still fetched.
pub async fn fetch<S: AsRef<str>>(
    source: &dyn EventSource,
    calendar_ids: &[S],
    query: &EventQuery,
) -> ClientResult<FetchOutcome> {
    let report = fetch_calendars(source, calendar_ids, query).await?;
    let table = EventTable::new(normalize_events(&report.events));

    info!(
        rows = table.len(),
        calendars = report.outcomes.len(),
        failed = report.failures().count(),
        "fetch complete"
    );
    Ok(FetchOutcome { table, report })
}

/// Retrieves, flattens and upserts the events of every calendar.
///
/// Rows from calendars that were fetched successfully are written even when
/// other calendars failed.
pub async fn collect<S: AsRef<str>>(
    source: &dyn EventSource,
    calendar_ids: &[S],
    query: &EventQuery,
    store: &mut EventStore,
    batch_size: usize,
) -> ClientResult<CollectOutcome> {
    let FetchOutcome { table, report } = fetch(source, calendar_ids, query).await?;
    let summary = store.upsert(table.rows(), batch_size).map_err(|e| {
        if let Some(committed) = e.committed_rows().filter(|n| *n > 0) {
            warn!(committed_rows = committed, "upsert stopped; earlier batches were kept");
        }
        e
    })?;

    info!(
        written = summary.written,
        rejected = summary.rejected,
        batches = summary.batches,
        "collect complete"
    );
    Ok(CollectOutcome { summary, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use calsweep_providers::{
        EventPage, MemorySource, ProviderErrorCode, RawAttendee, RawEvent, RawEventTime,
    };

    use crate::error::ClientError;

    fn query() -> EventQuery {
        EventQuery::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    fn timed(id: &str, calendar: &str) -> RawEvent {
        RawEvent::new(id, calendar)
            .with_summary(format!("Meeting {}", id))
            .with_start(RawEventTime::from_date_time("2024-02-01T09:00:00Z"))
            .with_end(RawEventTime::from_date_time("2024-02-01T10:00:00Z"))
    }

    fn two_calendar_source() -> MemorySource {
        MemorySource::new("memory")
            .with_pages(
                "a@x.com",
                vec![EventPage::last(vec![
                    timed("e1", "a@x.com").with_attendee(RawAttendee::new("bob@x.com")),
                    timed("e2", "a@x.com"),
                ])],
            )
            .with_pages("b@x.com", vec![EventPage::last(Vec::new())])
    }

    #[tokio::test]
    async fn fetch_two_calendars_one_empty() {
        let source = two_calendar_source();
        let outcome = fetch(&source, &["a@x.com", "b@x.com"], &query())
            .await
            .unwrap();

        assert_eq!(outcome.table.len(), 2);
        assert!(
            outcome
                .table
                .rows()
                .iter()
                .all(|row| row.calendar_id == "a@x.com")
        );
        assert_eq!(outcome.table.rows()[0].guests, "bob@x.com");
        assert_eq!(outcome.table.rows()[1].guests, "");
        assert!(!outcome.report.has_failures());
    }

    #[tokio::test]
    async fn fetch_keeps_rows_of_healthy_calendars() {
        let source = two_calendar_source().with_failure(
            "broken@x.com",
            ProviderErrorCode::NotFound,
            "calendar not found",
        );

        let outcome = fetch(&source, &["broken@x.com", "a@x.com"], &query())
            .await
            .unwrap();

        assert_eq!(outcome.table.len(), 2);
        let failed: Vec<&str> = outcome
            .report
            .failures()
            .map(|o| o.calendar_id.as_str())
            .collect();
        assert_eq!(failed, vec!["broken@x.com"]);
    }

    #[tokio::test]
    async fn fetch_aborts_on_authentication_failure() {
        let source = two_calendar_source().with_failure(
            "a@x.com",
            ProviderErrorCode::AuthenticationFailed,
            "token revoked",
        );

        let err = fetch(&source, &["a@x.com", "b@x.com"], &query())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Provider(ref e) if e.is_fatal()));
        assert_eq!(source.calls().len(), 1);
    }

    #[tokio::test]
    async fn collect_twice_is_idempotent() {
        let source = MemorySource::new("memory").with_events(
            "a@x.com",
            (0..7).map(|i| timed(&format!("e{}", i), "a@x.com")).collect(),
            3,
        );
        let mut store = EventStore::in_memory().unwrap();

        let first = collect(&source, &["a@x.com"], &query(), &mut store, 2)
            .await
            .unwrap();
        assert_eq!(first.summary.written, 7);
        assert_eq!(first.summary.batches, 4);
        assert_eq!(first.report.outcomes[0].pages, 3);

        let second = collect(&source, &["a@x.com"], &query(), &mut store, 500)
            .await
            .unwrap();
        assert_eq!(second.summary.written, 7);
        assert_eq!(store.count().unwrap(), 7);
    }

    #[tokio::test]
    async fn collect_rejects_rows_without_id() {
        let mut no_id = timed("ignored", "a@x.com");
        no_id.id = None;
        let source = MemorySource::new("memory").with_pages(
            "a@x.com",
            vec![EventPage::last(vec![timed("e1", "a@x.com"), no_id])],
        );
        let mut store = EventStore::in_memory().unwrap();

        let outcome = collect(&source, &["a@x.com"], &query(), &mut store, 10)
            .await
            .unwrap();
        assert_eq!(outcome.summary.written, 1);
        assert_eq!(outcome.summary.rejected, 1);
        assert!(store.get("e1").unwrap().is_some());
    }

    #[tokio::test]
    async fn collect_writes_partial_results() {
        let source = two_calendar_source().with_failure(
            "b@x.com",
            ProviderErrorCode::RateLimited,
            "quota exceeded",
        );
        let mut store = EventStore::in_memory().unwrap();

        let outcome = collect(&source, &["a@x.com", "b@x.com"], &query(), &mut store, 10)
            .await
            .unwrap();
        assert!(outcome.report.has_failures());
        assert_eq!(store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn shared_event_counts_once() {
        let source = MemorySource::new("memory")
            .with_pages("a@x.com", vec![EventPage::last(vec![timed("shared", "a@x.com")])])
            .with_pages(
                "b@x.com",
                vec![EventPage::last(vec![
                    timed("shared", "b@x.com"),
                    timed("own", "b@x.com"),
                ])],
            );
        let mut store = EventStore::in_memory().unwrap();

        let outcome = collect(&source, &["a@x.com", "b@x.com"], &query(), &mut store, 10)
            .await
            .unwrap();
        assert_eq!(outcome.summary.written, 2);
        assert_eq!(outcome.summary.merged, 1);
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get("shared").unwrap().unwrap().calendar_id, "b@x.com");
    }

    #[tokio::test]
    async fn collect_with_zero_batch_size_fails() {
        let source = two_calendar_source();
        let mut store = EventStore::in_memory().unwrap();

        let err = collect(&source, &["a@x.com"], &query(), &mut store, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Store(_)));
    }
}
