//! Access token acquisition.
//!
//! Three credential kinds are supported, none of which involve a browser:
//!
//! - service account: a signed JWT assertion exchanged at the token endpoint
//! - authorized user: the embedded refresh token is exchanged
//! - OAuth client: a previously cached token is reused, and refreshed (then
//!   written back) once expired

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::config::{CredentialsFile, GoogleConfig, ServiceAccountKey};
use super::tokens::{TokenInfo, TokenStorage, expiry_from_now};

/// Grant type for the service-account JWT bearer flow.
pub const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for service-account assertions (Google's maximum).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// A bearer token for Calendar API requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    /// `None` when the endpoint gave no lifetime.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

impl From<&TokenInfo> for AccessToken {
    fn from(info: &TokenInfo) -> Self {
        Self {
            token: info.access_token.clone(),
            expires_at: info.expires_at,
        }
    }
}

/// Response from the OAuth token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_access_token(self) -> AccessToken {
        AccessToken {
            token: self.access_token,
            expires_at: self.expires_in.map(expiry_from_now),
        }
    }
}

/// Claims of a service-account assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sub: Option<String>,
}

impl AssertionClaims {
    pub fn new(
        key: &ServiceAccountKey,
        scopes: &[String],
        subject: Option<&str>,
        now: DateTime<Utc>,
    ) -> Self {
        let iat = now.timestamp();
        Self {
            iss: key.client_email.clone(),
            scope: scopes.join(" "),
            aud: key.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
            sub: subject.map(String::from),
        }
    }
}

/// Signs a service-account assertion with the key's RSA private key.
pub fn sign_assertion(key: &ServiceAccountKey, claims: &AssertionClaims) -> ProviderResult<String> {
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
        ProviderError::configuration(format!("invalid service account private key: {}", e))
    })?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    encode(&header, claims, &encoding_key)
        .map_err(|e| ProviderError::internal(format!("failed to sign assertion: {}", e)))
}

#[derive(Debug)]
enum Method {
    ServiceAccount {
        key: ServiceAccountKey,
        subject: Option<String>,
    },
    RefreshToken {
        client_id: String,
        client_secret: String,
        refresh_token: String,
        token_uri: String,
    },
    CachedToken {
        client_id: String,
        client_secret: String,
        token_uri: String,
        storage: TokenStorage,
    },
}

/// Obtains access tokens for one set of credentials.
#[derive(Debug)]
pub struct Authenticator {
    http_client: reqwest::Client,
    method: Method,
    scopes: Vec<String>,
}

impl Authenticator {
    /// Reads the credentials file named by `config`.
    pub fn from_config(config: &GoogleConfig) -> ProviderResult<Self> {
        let credentials = CredentialsFile::from_file(&config.credentials_file)?;
        Self::new(credentials, config)
    }

    pub fn new(credentials: CredentialsFile, config: &GoogleConfig) -> ProviderResult<Self> {
        let method = match credentials {
            CredentialsFile::ServiceAccount(key) => Method::ServiceAccount {
                key,
                subject: config.subject.clone(),
            },
            CredentialsFile::AuthorizedUser(user) => Method::RefreshToken {
                client_id: user.client_id,
                client_secret: user.client_secret,
                refresh_token: user.refresh_token,
                token_uri: user.token_uri,
            },
            CredentialsFile::Client(client) => Method::CachedToken {
                client_id: client.client_id,
                client_secret: client.client_secret,
                token_uri: client.token_uri,
                storage: TokenStorage::new(&config.token_path),
            },
        };

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| {
                ProviderError::internal(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        Ok(Self {
            http_client,
            method,
            scopes: config.scopes.clone(),
        })
    }

    /// Short name of the credential method, e.g. `service-account`.
    pub fn method(&self) -> &'static str {
        match self.method {
            Method::ServiceAccount { .. } => "service-account",
            Method::RefreshToken { .. } => "authorized-user",
            Method::CachedToken { .. } => "oauth-client",
        }
    }

    /// Returns a usable access token, contacting the token endpoint when
    /// needed.
    ///
    /// # Errors
    ///
    /// `AuthenticationFailed` when the endpoint rejects the credentials or no
    /// cached token exists; `ConfigurationError` for unusable key material.
    pub async fn access_token(&self) -> ProviderResult<AccessToken> {
        match &self.method {
            Method::ServiceAccount { key, subject } => {
                let claims = AssertionClaims::new(key, &self.scopes, subject.as_deref(), Utc::now());
                let assertion = sign_assertion(key, &claims)?;
                debug!(client_email = %key.client_email, "requesting service account token");
                let response = self
                    .request_token(
                        &key.token_uri,
                        &[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())],
                    )
                    .await?;
                info!("obtained service account token");
                Ok(response.into_access_token())
            }
            Method::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
                token_uri,
            } => {
                let response = self
                    .refresh(token_uri, client_id, client_secret, refresh_token)
                    .await?;
                Ok(response.into_access_token())
            }
            Method::CachedToken {
                client_id,
                client_secret,
                token_uri,
                storage,
            } => {
                let mut cached = storage.load()?.ok_or_else(|| {
                    ProviderError::authentication(format!(
                        "no cached token at {} - complete the OAuth consent flow first",
                        storage.path().display()
                    ))
                })?;

                if !cached.is_expired() {
                    return Ok(AccessToken::from(&cached));
                }

                let refresh_token = cached.refresh_token.clone().ok_or_else(|| {
                    ProviderError::authentication(
                        "cached token expired and has no refresh token - re-authentication required",
                    )
                })?;

                debug!("refreshing expired access token");
                let response = self
                    .refresh(token_uri, client_id, client_secret, &refresh_token)
                    .await?;
                cached.update_access_token(
                    response.access_token,
                    response.expires_in,
                    response.refresh_token,
                );
                storage.save(&cached)?;
                Ok(AccessToken::from(&cached))
            }
        }
    }

    async fn refresh(
        &self,
        token_uri: &str,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .request_token(
                token_uri,
                &[
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                    ("refresh_token", refresh_token),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await?;
        info!("successfully refreshed access token");
        Ok(response)
    }

    async fn request_token(
        &self,
        token_uri: &str,
        params: &[(&str, &str)],
    ) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(token_uri)
            .form(params)
            .send()
            .await
            .map_err(|e| ProviderError::network(format!("token request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network(format!("failed to read response: {}", e)))?;

        if status.is_server_error() {
            return Err(ProviderError::server(format!(
                "token endpoint error ({}): {}",
                status, body
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::authentication(format!(
                "token request rejected ({}): {}",
                status, body
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::invalid_response(format!("invalid token response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorCode;
    use chrono::TimeZone;
    use jsonwebtoken::{DecodingKey, Validation, decode, decode_header};
    use tempfile::tempdir;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_PRIVATE_KEY: &str = include_str!("../../testdata/test-service-account.pem");
    const TEST_PUBLIC_KEY: &str = include_str!("../../testdata/test-service-account.pub.pem");

    fn test_key() -> ServiceAccountKey {
        ServiceAccountKey {
            client_email: "sweeper@proj.iam.gserviceaccount.com".into(),
            private_key: TEST_PRIVATE_KEY.into(),
            private_key_id: Some("key-1".into()),
            project_id: Some("proj".into()),
            token_uri: "https://oauth2.googleapis.com/token".into(),
        }
    }

    #[test]
    fn assertion_claims() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let scopes = vec![GoogleConfig::DEFAULT_SCOPE.to_string()];
        let claims = AssertionClaims::new(&test_key(), &scopes, Some("admin@x.com"), now);

        assert_eq!(claims.iss, "sweeper@proj.iam.gserviceaccount.com");
        assert_eq!(claims.scope, GoogleConfig::DEFAULT_SCOPE);
        assert_eq!(claims.aud, "https://oauth2.googleapis.com/token");
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(claims.sub.as_deref(), Some("admin@x.com"));
    }

    #[test]
    fn assertion_omits_sub_without_subject() {
        let claims = AssertionClaims::new(&test_key(), &[], None, Utc::now());
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("sub").is_none());
    }

    #[test]
    fn signed_assertion_verifies_with_public_key() {
        let key = test_key();
        let scopes = vec![GoogleConfig::DEFAULT_SCOPE.to_string()];
        let claims = AssertionClaims::new(&key, &scopes, None, Utc::now());
        let jwt = sign_assertion(&key, &claims).unwrap();

        let header = decode_header(&jwt).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("key-1"));

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&["https://oauth2.googleapis.com/token"]);
        let decoded = decode::<AssertionClaims>(
            &jwt,
            &DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap();
        assert_eq!(decoded.claims, claims);
    }

    #[test]
    fn bad_private_key_is_config_error() {
        let mut key = test_key();
        key.private_key = "not a pem".into();
        let claims = AssertionClaims::new(&key, &[], None, Utc::now());
        let err = sign_assertion(&key, &claims).unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ConfigurationError);
    }

    fn client_credentials() -> CredentialsFile {
        CredentialsFile::from_json(
            r#"{"installed": {"client_id": "id.apps.googleusercontent.com", "client_secret": "s"}}"#,
        )
        .unwrap()
    }

    fn client_credentials_for(server: &MockServer) -> CredentialsFile {
        CredentialsFile::from_json(&format!(
            r#"{{"installed": {{"client_id": "id.apps.googleusercontent.com",
                "client_secret": "s", "token_uri": "{}/token"}}}}"#,
            server.uri()
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn cached_token_is_reused_without_network() {
        let dir = tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        TokenStorage::new(&token_path)
            .save(&TokenInfo::new("ya29.cached", Some("1//r".into()), Some(3600), vec![]))
            .unwrap();

        let config = GoogleConfig::new("unused.json").with_token_path(&token_path);
        let auth = Authenticator::new(client_credentials(), &config).unwrap();
        assert_eq!(auth.method(), "oauth-client");

        let token = auth.access_token().await.unwrap();
        assert_eq!(token.token, "ya29.cached");
        assert!(!token.is_expired());
    }

    #[tokio::test]
    async fn missing_cached_token_is_authentication_error() {
        let dir = tempdir().unwrap();
        let config = GoogleConfig::new("unused.json").with_token_path(dir.path().join("none.json"));
        let auth = Authenticator::new(client_credentials(), &config).unwrap();

        let err = auth.access_token().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn expired_token_without_refresh_token_is_authentication_error() {
        let dir = tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        TokenStorage::new(&token_path)
            .save(&TokenInfo::new("ya29.stale", None, Some(0), vec![]))
            .unwrap();

        let config = GoogleConfig::new("unused.json").with_token_path(&token_path);
        let auth = Authenticator::new(client_credentials(), &config).unwrap();

        let err = auth.access_token().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_written_back() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=refresh-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.fresh",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        let storage = TokenStorage::new(&token_path);
        storage
            .save(&TokenInfo::new("ya29.stale", Some("refresh-1".into()), Some(0), vec![]))
            .unwrap();

        let config = GoogleConfig::new("unused.json").with_token_path(&token_path);
        let auth = Authenticator::new(client_credentials_for(&server), &config).unwrap();

        let token = auth.access_token().await.unwrap();
        assert_eq!(token.token, "ya29.fresh");
        assert!(!token.is_expired());

        let saved = storage.load().unwrap().unwrap();
        assert_eq!(saved.access_token, "ya29.fresh");
        assert_eq!(saved.refresh_token.as_deref(), Some("refresh-1"));
        assert!(!saved.is_expired());
    }

    #[tokio::test]
    async fn rejected_refresh_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let token_path = dir.path().join("token.json");
        TokenStorage::new(&token_path)
            .save(&TokenInfo::new("ya29.stale", Some("revoked".into()), Some(0), vec![]))
            .unwrap();

        let config = GoogleConfig::new("unused.json").with_token_path(&token_path);
        let auth = Authenticator::new(client_credentials_for(&server), &config).unwrap();

        let err = auth.access_token().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::AuthenticationFailed);
        assert!(err.message().contains("invalid_grant"));
        // The stale token stays on disk untouched.
        let saved = TokenStorage::new(&token_path).load().unwrap().unwrap();
        assert_eq!(saved.access_token, "ya29.stale");
    }

    #[tokio::test]
    async fn token_endpoint_outage_is_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let user = CredentialsFile::from_json(&format!(
            r#"{{"type": "authorized_user", "client_id": "id", "client_secret": "s",
                "refresh_token": "1//r", "token_uri": "{}/token"}}"#,
            server.uri()
        ))
        .unwrap();
        let auth = Authenticator::new(user, &GoogleConfig::new("unused.json")).unwrap();
        assert_eq!(auth.method(), "authorized-user");

        let err = auth.access_token().await.unwrap_err();
        assert_eq!(err.code(), ProviderErrorCode::ServerError);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn service_account_exchanges_signed_assertion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("jwt-bearer"))
            .and(body_string_contains("assertion="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.sa",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut key = test_key();
        key.token_uri = format!("{}/token", server.uri());
        let auth = Authenticator::new(
            CredentialsFile::ServiceAccount(key),
            &GoogleConfig::new("unused.json"),
        )
        .unwrap();
        assert_eq!(auth.method(), "service-account");

        let token = auth.access_token().await.unwrap();
        assert_eq!(token.token, "ya29.sa");
        assert!(token.expires_at.is_some());
    }

    #[test]
    fn token_response_lifetime() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token": "a", "expires_in": 3599, "token_type": "Bearer"}"#)
                .unwrap();
        let token = response.into_access_token();
        assert_eq!(token.token, "a");
        assert!(!token.is_expired());
    }
}
