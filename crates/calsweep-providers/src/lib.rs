//! Event sources and the retrieval pipeline.
//!
//! - [`EventSource`] - one page of events per call; implemented by
//!   [`google::GoogleProvider`] and [`MemorySource`]
//! - [`fetch_calendar`] / [`fetch_calendars`] - follow continuation tokens,
//!   deduplicate and merge calendars
//! - [`normalize_event`] - flatten a [`RawEvent`] into an [`EventRow`](calsweep_core::EventRow)
//! - [`ProviderError`] - error taxonomy shared by all sources
//!
//! # Architecture
//!
//! ```text
//!  Google API ──► GoogleProvider ─┐
//!                                 ├─ EventSource ─► fetch_calendars ─► RawEvent ─► normalize_event ─► EventRow
//!  scripted pages ► MemorySource ─┘
//! ```

pub mod error;
#[cfg(feature = "google")]
pub mod google;
pub mod memory;
pub mod normalize;
pub mod provider;
pub mod raw_event;
pub mod retrieve;

pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use memory::MemorySource;
pub use normalize::{GUEST_SEPARATOR, normalize_event, normalize_events};
pub use provider::{BoxFuture, DEFAULT_PAGE_SIZE, EventPage, EventQuery, EventSource};
pub use raw_event::{RawAttendee, RawEvent, RawEventTime};
pub use retrieve::{CalendarEvents, CalendarOutcome, FetchReport, fetch_calendar, fetch_calendars};
