//! In-memory event source.
//!
//! [`MemorySource`] serves pre-built pages per calendar. It backs offline
//! runs and tests of the retrieval loop without network access.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{ProviderError, ProviderErrorCode, ProviderResult};
use crate::provider::{BoxFuture, EventPage, EventQuery, EventSource};
use crate::raw_event::RawEvent;

#[derive(Debug, Clone)]
enum Script {
    Pages(Vec<EventPage>),
    Fail(ProviderErrorCode, String),
}

/// A source that answers from scripted pages.
///
/// The first request for a calendar gets its first page. A request with
/// token `t` gets the page following the first page whose
/// `next_page_token` is `t`. Calendars that were never scripted return an
/// empty last page.
#[derive(Debug, Default)]
pub struct MemorySource {
    name: String,
    scripts: HashMap<String, Script>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Scripts the exact pages served for a calendar.
    pub fn with_pages(mut self, calendar_id: impl Into<String>, pages: Vec<EventPage>) -> Self {
        self.scripts
            .insert(calendar_id.into(), Script::Pages(pages));
        self
    }

    /// Splits `events` into pages of `page_size` linked by generated tokens.
    pub fn with_events(
        self,
        calendar_id: impl Into<String>,
        events: Vec<RawEvent>,
        page_size: usize,
    ) -> Self {
        let chunks: Vec<Vec<RawEvent>> = events
            .chunks(page_size.max(1))
            .map(<[RawEvent]>::to_vec)
            .collect();
        let count = chunks.len();
        let pages = chunks
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| {
                if i + 1 < count {
                    EventPage::with_next(chunk, format!("page-{}", i + 1))
                } else {
                    EventPage::last(chunk)
                }
            })
            .collect();
        self.with_pages(calendar_id, pages)
    }

    /// Makes every request for a calendar fail with the given error.
    pub fn with_failure(
        mut self,
        calendar_id: impl Into<String>,
        code: ProviderErrorCode,
        message: impl Into<String>,
    ) -> Self {
        self.scripts
            .insert(calendar_id.into(), Script::Fail(code, message.into()));
        self
    }

    /// Returns the `(calendar_id, page_token)` pairs requested so far.
    pub fn calls(&self) -> Vec<(String, Option<String>)> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn page_for(&self, calendar_id: &str, page_token: Option<&str>) -> ProviderResult<EventPage> {
        let pages = match self.scripts.get(calendar_id) {
            None => return Ok(EventPage::default()),
            Some(Script::Fail(code, message)) => {
                return Err(ProviderError::new(*code, message.clone()).with_provider(&self.name));
            }
            Some(Script::Pages(pages)) => pages,
        };

        let index = match page_token {
            None => 0,
            Some(token) => pages
                .iter()
                .position(|p| p.next_page_token.as_deref() == Some(token))
                .map(|i| i + 1)
                .ok_or_else(|| {
                    ProviderError::bad_request(format!("unknown page token '{}'", token))
                        .with_provider(&self.name)
                })?,
        };

        Ok(pages.get(index).cloned().unwrap_or_default())
    }
}

impl EventSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_events_page<'a>(
        &'a self,
        calendar_id: &'a str,
        _query: &'a EventQuery,
        page_token: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<EventPage>> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((calendar_id.to_string(), page_token.map(String::from)));
        }
        let result = self.page_for(calendar_id, page_token);
        Box::pin(async move { result })
    }
}
