//! Paginated retrieval across calendars.
//!
//! [`fetch_calendar`] drains one calendar page by page; [`fetch_calendars`]
//! walks a list of calendars one at a time and merges the results. An
//! authentication failure aborts the run; any other failure is recorded on
//! the calendar's [`CalendarOutcome`] and the remaining calendars proceed.

use std::collections::HashSet;

use tracing::{debug, error, info, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{EventQuery, EventSource};
use crate::raw_event::RawEvent;

/// Events drained from a single calendar.
#[derive(Debug, Clone, Default)]
pub struct CalendarEvents {
    pub events: Vec<RawEvent>,
    /// Number of pages requested.
    pub pages: usize,
    /// Events dropped because their id was already seen in this calendar.
    pub duplicates: usize,
}

/// What happened when fetching one calendar.
#[derive(Debug)]
pub struct CalendarOutcome {
    pub calendar_id: String,
    pub pages: usize,
    pub events: usize,
    pub duplicates: usize,
    /// Set when the calendar was skipped.
    pub error: Option<ProviderError>,
}

impl CalendarOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Merged result of a multi-calendar fetch.
#[derive(Debug, Default)]
pub struct FetchReport {
    /// Events from every calendar that succeeded, in calendar order.
    pub events: Vec<RawEvent>,
    /// One entry per distinct requested calendar, in request order.
    pub outcomes: Vec<CalendarOutcome>,
}

impl FetchReport {
    /// Outcomes of calendars that were skipped because of an error.
    pub fn failures(&self) -> impl Iterator<Item = &CalendarOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Drains every page of events for `calendar_id`.
///
/// Events sharing an id with one already collected are dropped; the first
/// occurrence wins. Events without an id are always kept.
///
/// # Errors
///
/// Returns the first error raised by the source, or an `InvalidResponse`
/// error when the source hands back a continuation token it already gave for
/// this calendar. Events collected before the failure are discarded.
pub async fn fetch_calendar(
    source: &dyn EventSource,
    calendar_id: &str,
    query: &EventQuery,
) -> ProviderResult<CalendarEvents> {
    let mut collected = CalendarEvents::default();
    let mut seen: HashSet<String> = HashSet::new();
    let mut tokens: HashSet<String> = HashSet::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = source
            .list_events_page(calendar_id, query, page_token.as_deref())
            .await
            .map_err(|e| tag_calendar(e, calendar_id))?;
        collected.pages += 1;
        debug!(
            calendar_id,
            page = collected.pages,
            count = page.events.len(),
            "received page"
        );

        for event in page.events {
            let first_seen = match event.id.as_deref() {
                Some(id) => seen.insert(id.to_string()),
                None => true,
            };
            if first_seen {
                collected.events.push(event);
            } else {
                collected.duplicates += 1;
            }
        }

        match page.next_page_token.filter(|t| !t.is_empty()) {
            None => break,
            Some(next) if !tokens.insert(next.clone()) => {
                return Err(ProviderError::invalid_response(format!(
                    "page token '{}' repeated",
                    next
                ))
                .with_provider(source.name())
                .with_calendar(calendar_id));
            }
            Some(next) => page_token = Some(next),
        }
    }

    if collected.duplicates > 0 {
        debug!(
            calendar_id,
            duplicates = collected.duplicates,
            "dropped duplicate events"
        );
    }
    if collected.events.is_empty() {
        info!(calendar_id, "no events found in calendar");
    }

    Ok(collected)
}

/// Fetches every calendar in `calendar_ids`, one after another.
///
/// Calendar ids repeated in the input are fetched once.
///
/// # Errors
///
/// Returns an error only for fatal failures (see
/// [`ProviderError::is_fatal`]); those abort the remaining calendars.
pub async fn fetch_calendars<S: AsRef<str>>(
    source: &dyn EventSource,
    calendar_ids: &[S],
    query: &EventQuery,
) -> ProviderResult<FetchReport> {
    let mut report = FetchReport::default();
    let mut requested: HashSet<&str> = HashSet::new();

    for calendar_id in calendar_ids.iter().map(AsRef::as_ref) {
        if !requested.insert(calendar_id) {
            debug!(calendar_id, "skipping repeated calendar");
            continue;
        }

        match fetch_calendar(source, calendar_id, query).await {
            Ok(fetched) => {
                info!(
                    calendar_id,
                    events = fetched.events.len(),
                    pages = fetched.pages,
                    "fetched calendar"
                );
                report.outcomes.push(CalendarOutcome {
                    calendar_id: calendar_id.to_string(),
                    pages: fetched.pages,
                    events: fetched.events.len(),
                    duplicates: fetched.duplicates,
                    error: None,
                });
                report.events.extend(fetched.events);
            }
            Err(e) if e.is_fatal() => {
                error!(calendar_id, error = %e, "aborting fetch");
                return Err(e);
            }
            Err(e) => {
                warn!(calendar_id, error = %e, "skipping calendar");
                report.outcomes.push(CalendarOutcome {
                    calendar_id: calendar_id.to_string(),
                    pages: 0,
                    events: 0,
                    duplicates: 0,
                    error: Some(e),
                });
            }
        }
    }

    Ok(report)
}

fn tag_calendar(error: ProviderError, calendar_id: &str) -> ProviderError {
    if error.calendar_id().is_some() {
        error
    } else {
        error.with_calendar(calendar_id)
    }
}
