//! Google Calendar event source.

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{BoxFuture, EventPage, EventQuery, EventSource};

use super::auth::{AccessToken, Authenticator};
use super::client::GoogleCalendarClient;
use super::config::GoogleConfig;

/// Event source backed by the Google Calendar API v3.
///
/// Authentication happens once in [`GoogleProvider::connect`]; the token is
/// renewed transparently when it expires during a long run.
pub struct GoogleProvider {
    name: String,
    client: GoogleCalendarClient,
    auth: Authenticator,
    token: Mutex<AccessToken>,
}

impl GoogleProvider {
    /// Validates the configuration, loads credentials and obtains a first
    /// access token.
    ///
    /// # Errors
    ///
    /// `ConfigurationError` for invalid config or credential files,
    /// `AuthenticationFailed` when no token can be obtained.
    pub async fn connect(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let auth = Authenticator::from_config(&config)?;
        Self::with_authenticator(config, auth).await
    }

    /// Like [`connect`](Self::connect) with an already built authenticator.
    pub async fn with_authenticator(config: GoogleConfig, auth: Authenticator) -> ProviderResult<Self> {
        let name = format!("google:{}", auth.method());
        let client = GoogleCalendarClient::new(config.timeout, &config.user_agent)?
            .with_base_url(&config.base_url);

        let token = auth
            .access_token()
            .await
            .map_err(|e| e.with_provider(&name))?;
        info!(provider = %name, "authenticated");

        Ok(Self {
            name,
            client,
            auth,
            token: Mutex::new(token),
        })
    }

    async fn current_token(&self) -> ProviderResult<String> {
        let mut token = self.token.lock().await;
        if token.is_expired() {
            debug!("access token expired, renewing");
            *token = self.auth.access_token().await?;
        }
        Ok(token.token.clone())
    }
}

impl EventSource for GoogleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_events_page<'a>(
        &'a self,
        calendar_id: &'a str,
        query: &'a EventQuery,
        page_token: Option<&'a str>,
    ) -> BoxFuture<'a, ProviderResult<EventPage>> {
        Box::pin(async move {
            let token = self
                .current_token()
                .await
                .map_err(|e| e.with_provider(&self.name))?;
            self.client
                .list_events_page(&token, calendar_id, query, page_token)
                .await
                .map_err(|e| e.with_provider(&self.name))
        })
    }
}
