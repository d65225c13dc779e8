//! EventSource trait definition.
//!
//! An [`EventSource`] serves one page of events at a time for a single
//! calendar. Following continuation tokens, deduplicating and merging
//! calendars is done once in [`crate::retrieve`] so every backend gets the
//! same guarantees.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};

use crate::error::ProviderResult;
use crate::raw_event::RawEvent;

/// Largest page size the Google Calendar API accepts.
pub const DEFAULT_PAGE_SIZE: u32 = 2500;

/// Parameters for listing events of a calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    /// Inclusive lower bound on event end time.
    pub time_min: DateTime<Utc>,
    /// Exclusive upper bound on event start time.
    pub time_max: Option<DateTime<Utc>>,
    /// Maximum events per page.
    pub page_size: u32,
    /// Expand recurring events into individual instances.
    pub single_events: bool,
    /// Order results by start time (requires `single_events`).
    pub order_by_start: bool,
}

impl EventQuery {
    /// Creates a query for everything from `time_min` on.
    pub fn new(time_min: DateTime<Utc>) -> Self {
        Self {
            time_min,
            time_max: None,
            page_size: DEFAULT_PAGE_SIZE,
            single_events: true,
            order_by_start: true,
        }
    }

    pub fn with_time_max(mut self, time_max: DateTime<Utc>) -> Self {
        self.time_max = Some(time_max);
        self
    }

    /// Sets the page size, clamped to `1..=DEFAULT_PAGE_SIZE`.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, DEFAULT_PAGE_SIZE);
        self
    }

    pub fn with_single_events(mut self, single_events: bool) -> Self {
        self.single_events = single_events;
        self
    }

    pub fn with_order_by_start(mut self, order_by_start: bool) -> Self {
        self.order_by_start = order_by_start;
        self
    }
}

/// One page of events returned by a source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPage {
    pub events: Vec<RawEvent>,
    /// Continuation token; `None` on the last page.
    pub next_page_token: Option<String>,
}

impl EventPage {
    /// Creates a final page (no continuation).
    pub fn last(events: Vec<RawEvent>) -> Self {
        Self {
            events,
            next_page_token: None,
        }
    }

    /// Creates a page followed by another one.
    pub fn with_next(events: Vec<RawEvent>, token: impl Into<String>) -> Self {
        Self {
            events,
            next_page_token: Some(token.into()),
        }
    }
}

/// A boxed future for async trait methods.
///
/// Boxed futures keep the trait object-safe so sources can be used as
/// `&dyn EventSource`.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A paginated source of calendar events.
///
/// # Example Implementation
///
/// ```ignore
/// impl EventSource for MySource {
///     fn name(&self) -> &str { "mine" }
///
///     fn list_events_page<'a>(
///         &'a self,
///         calendar_id: &'a str,
///         query: &'a EventQuery,
///         page_token: Option<&'a str>,
///     ) -> BoxFuture<'a, ProviderResult<EventPage>> {
///         Box::pin(async move { Ok(EventPage::last(vec![])) })
///     }
/// }
/// ```
pub trait EventSource: Send + Sync {
    /// Returns the name of this source (e.g., "google:service-account").
    fn name(&self) -> &str;

    /// Fetches a single page of events for `calendar_id`.
    ///
    /// `page_token` is `None` for the first page and the previous page's
    /// `next_page_token` afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on network errors, authentication failures,
    /// HTTP error statuses and unparseable responses.
    fn list_events_page<'a>(
        &'a self,
        calendar_id: &'a str,
        query: &'a EventQuery,
        page_token: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<EventPage>>;
}
