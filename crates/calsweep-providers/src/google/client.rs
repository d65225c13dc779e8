//! Google Calendar API client.
//!
//! A thin HTTP layer over `GET /calendars/{id}/events`: request building,
//! status mapping and response parsing. Pagination is driven by the caller.

use std::time::Duration;

use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{EventPage, EventQuery};
use crate::raw_event::RawEvent;

use super::config::CALENDAR_API_BASE;

/// Error reasons Google reports with a 403 when a quota is exhausted.
const RATE_LIMIT_REASONS: [&str; 2] = ["rateLimitExceeded", "userRateLimitExceeded"];

/// Google Calendar API client.
#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Creates a client against the public Calendar API.
    pub fn new(timeout: Duration, user_agent: &str) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            base_url: CALENDAR_API_BASE.to_string(),
        })
    }

    /// Points the client at another API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the events URL for a calendar; the id is percent-encoded.
    pub fn events_url(&self, calendar_id: &str) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        )
    }

    /// Fetches a single page of events.
    pub async fn list_events_page(
        &self,
        access_token: &str,
        calendar_id: &str,
        query: &EventQuery,
        page_token: Option<&str>,
    ) -> ProviderResult<EventPage> {
        let url = self.events_url(calendar_id);
        debug!(calendar_id, page_token, "requesting events page");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .query(&query_params(query, page_token))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::network("request timeout")
                } else if e.is_connect() {
                    ProviderError::network(format!("connection failed: {}", e))
                } else {
                    ProviderError::network(format!("request failed: {}", e))
                }
            })?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(error_for_status(status.as_u16(), &body, retry_after));
        }

        parse_event_page(&body, calendar_id)
    }
}

/// Builds the query string for an events list request.
pub fn query_params(query: &EventQuery, page_token: Option<&str>) -> Vec<(&'static str, String)> {
    let mut params = vec![
        (
            "timeMin",
            query.time_min.to_rfc3339_opts(SecondsFormat::Secs, true),
        ),
        ("maxResults", query.page_size.to_string()),
        ("singleEvents", query.single_events.to_string()),
    ];

    if let Some(time_max) = query.time_max {
        params.push(("timeMax", time_max.to_rfc3339_opts(SecondsFormat::Secs, true)));
    }

    // orderBy=startTime is only accepted together with singleEvents=true.
    if query.order_by_start && query.single_events {
        params.push(("orderBy", "startTime".to_string()));
    }

    if let Some(token) = page_token {
        params.push(("pageToken", token.to_string()));
    }

    params
}

/// Maps a non-success HTTP status to a provider error.
pub fn error_for_status(status: u16, body: &str, retry_after: Option<u64>) -> ProviderError {
    let detail = api_error_message(body).unwrap_or_else(|| body.trim().to_string());

    match status {
        401 => ProviderError::authentication(format!(
            "access token expired or invalid: {}",
            detail
        )),
        403 if RATE_LIMIT_REASONS.iter().any(|r| body.contains(r)) => {
            ProviderError::rate_limited(format!("quota exceeded: {}", detail))
        }
        403 => ProviderError::authorization(format!("access denied to calendar: {}", detail)),
        404 => ProviderError::not_found(format!("calendar not found: {}", detail)),
        429 => ProviderError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )),
        400..=499 => ProviderError::bad_request(format!("API error ({}): {}", status, detail)),
        _ => ProviderError::server(format!("API error ({}): {}", status, detail)),
    }
}

/// Extracts `error.message` from a Google API error body.
fn api_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(String::from)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Option<Vec<Value>>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// Parses an events list response body into a page.
///
/// Individual items are extracted leniently; only a body that is not a JSON
/// object with an optional `items` array is an error.
pub fn parse_event_page(body: &str, calendar_id: &str) -> ProviderResult<EventPage> {
    let response: EventListResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::invalid_response(format!("failed to parse response: {}", e))
    })?;

    let events = response
        .items
        .unwrap_or_default()
        .iter()
        .map(|item| RawEvent::from_json(item, calendar_id))
        .collect();

    Ok(EventPage {
        events,
        next_page_token: response.next_page_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::{TimeZone, Utc};

    fn query() -> EventQuery {
        EventQuery::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn events_url_encodes_calendar_id() {
        let client = GoogleCalendarClient::new(Duration::from_secs(5), "calsweep-test")
            .unwrap()
            .with_base_url("http://localhost:9000/calendar/v3/");
        assert_eq!(
            client.events_url("a@x.com"),
            "http://localhost:9000/calendar/v3/calendars/a%40x.com/events"
        );
    }

    #[test]
    fn default_query_params() {
        let params = query_params(&query(), None);
        assert_eq!(
            params,
            vec![
                ("timeMin", "2024-01-01T00:00:00Z".to_string()),
                ("maxResults", "2500".to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ]
        );
    }

    #[test]
    fn query_params_with_bounds_and_token() {
        let q = query()
            .with_time_max(Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap())
            .with_single_events(false)
            .with_page_size(100);
        let params = query_params(&q, Some("tok-2"));

        assert!(params.contains(&("timeMax", "2024-06-30T00:00:00Z".to_string())));
        assert!(params.contains(&("maxResults", "100".to_string())));
        assert!(params.contains(&("pageToken", "tok-2".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "orderBy"));
    }

    #[test]
    fn status_mapping() {
        let cases = [
            (401, "", ProviderErrorCode::AuthenticationFailed),
            (403, "", ProviderErrorCode::AuthorizationFailed),
            (404, "", ProviderErrorCode::NotFound),
            (400, "", ProviderErrorCode::BadRequest),
            (410, "", ProviderErrorCode::BadRequest),
            (429, "", ProviderErrorCode::RateLimited),
            (500, "", ProviderErrorCode::ServerError),
            (503, "", ProviderErrorCode::ServerError),
        ];
        for (status, body, code) in cases {
            assert_eq!(error_for_status(status, body, None).code(), code, "{status}");
        }
    }

    #[test]
    fn forbidden_quota_is_rate_limited() {
        let body = r#"{"error": {"code": 403, "message": "Rate Limit Exceeded",
            "errors": [{"reason": "rateLimitExceeded"}]}}"#;
        let err = error_for_status(403, body, None);
        assert_eq!(err.code(), ProviderErrorCode::RateLimited);
        assert_eq!(err.message(), "quota exceeded: Rate Limit Exceeded");
    }

    #[test]
    fn retry_after_is_reported() {
        let err = error_for_status(429, "", Some(30));
        assert_eq!(err.message(), "rate limit exceeded, retry after 30 seconds");
    }

    #[test]
    fn parse_page_with_token() {
        let body = r#"{
            "kind": "calendar#events",
            "items": [
                {"id": "e1", "summary": "One", "start": {"date": "2024-01-05"}},
                {"id": "e2", "start": {"dateTime": "2024-01-06T10:00:00Z"}}
            ],
            "nextPageToken": "CiAKGj"
        }"#;
        let page = parse_event_page(body, "a@x.com").unwrap();
        assert_eq!(page.events.len(), 2);
        assert_eq!(page.events[0].calendar_id, "a@x.com");
        assert_eq!(page.events[1].id.as_deref(), Some("e2"));
        assert_eq!(page.next_page_token.as_deref(), Some("CiAKGj"));
    }

    #[test]
    fn parse_page_without_items() {
        let page = parse_event_page(r#"{"kind": "calendar#events"}"#, "b@x.com").unwrap();
        assert!(page.events.is_empty());
        assert!(page.next_page_token.is_none());

        let page = parse_event_page(r#"{"items": null}"#, "b@x.com").unwrap();
        assert!(page.events.is_empty());
    }

    #[test]
    fn parse_garbage_is_invalid_response() {
        let err = parse_event_page("<html>oops</html>", "a@x.com").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);

        let err = parse_event_page(r#"{"items": "nope"}"#, "a@x.com").unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::InvalidResponse);
    }
}
