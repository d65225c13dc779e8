//! Google Calendar event source.
//!
//! # Authentication
//!
//! Credentials are read from a JSON file whose kind is detected from its
//! content:
//!
//! 1. Service account key: a JWT signed with the key is exchanged for an
//!    access token, optionally impersonating `subject`
//! 2. Authorized user (gcloud style): the embedded refresh token is exchanged
//! 3. OAuth client (`installed`/`web`): a token cached by an earlier consent
//!    flow is reused and refreshed; the refreshed token is written back
//!
//! # Example
//!
//! ```ignore
//! use calsweep_providers::google::{GoogleConfig, GoogleProvider};
//! use calsweep_providers::{EventQuery, fetch_calendars};
//!
//! let provider = GoogleProvider::connect(GoogleConfig::new("service-account.json")).await?;
//! let report = fetch_calendars(&provider, &["team@example.com"], &EventQuery::new(since)).await?;
//! ```

mod auth;
mod client;
mod config;
mod provider;
mod tokens;

pub use auth::{AccessToken, AssertionClaims, Authenticator, JWT_BEARER_GRANT, sign_assertion};
pub use client::{GoogleCalendarClient, error_for_status, parse_event_page, query_params};
pub use config::{
    AuthorizedUser, CALENDAR_API_BASE, CredentialsFile, GOOGLE_TOKEN_URL, GoogleConfig,
    OAuthClientSecrets, ServiceAccountKey,
};
pub use provider::GoogleProvider;
pub use tokens::{TokenInfo, TokenStorage};
