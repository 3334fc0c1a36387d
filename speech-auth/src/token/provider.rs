//! Token provider with an expiry-aware cache and single-flight refresh.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::ACCEPT;
use secrecy::ExposeSecret;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use super::tokens::TokenResponse;
use super::{Token, TokenSource};
use crate::credentials::Credentials;
use crate::error::{auth_error, config_error, AuthErrorKind, Error, ErrorKind};
use crate::options::ClientOptions;

/// Timeout applied to the token exchange when no client is supplied.
const TOKEN_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// A cached token with the margin it is checked against.
///
/// The margin is fixed when the token is stored so a margin longer than the issued
/// lifetime cannot make a fresh token look expired on every call.
#[derive(Debug, Clone)]
struct CachedToken {
    token: Token,
    margin: Duration,
}

/// Exchanges client credentials for bearer tokens and caches the result.
///
/// Reads of a valid cached token only take a shared read lock. Refreshes are serialized
/// behind `refresh_lock`: callers that find the cache invalid queue on the lock and re-check
/// the cache once they hold it, so a burst of concurrent callers triggers a single exchange.
/// A failed exchange leaves the cache untouched.
pub struct TokenProvider {
    credentials: Credentials,
    token_url: String,
    http_client: reqwest::Client,
    refresh_margin: Duration,
    cache: RwLock<Option<CachedToken>>,
    refresh_lock: Mutex<()>,
}

impl TokenProvider {
    /// Create a provider from client options, falling back to the environment for credentials.
    pub fn new(options: &ClientOptions) -> Result<Self, Error> {
        Self::with_credentials(Credentials::resolve(options), options.token_url())
    }

    /// Create a provider from already resolved credentials.
    ///
    /// Fails with a configuration error if the client id, client secret or token URL is unset.
    pub fn with_credentials(credentials: Credentials, token_url: &str) -> Result<Self, Error> {
        if credentials.client_id.is_empty() {
            return Err(config_error("RTZR_CLIENT_ID must be provided"));
        }
        if credentials.client_secret.expose_secret().is_empty() {
            return Err(config_error("RTZR_CLIENT_SECRET must be provided"));
        }
        if token_url.is_empty() {
            return Err(config_error("token URL must be provided"));
        }
        url::Url::parse(token_url).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Configuration,
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            credentials,
            token_url: token_url.to_string(),
            http_client,
            refresh_margin: Duration::zero(),
            cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Use a caller supplied HTTP client for the token exchange.
    pub fn with_http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = http_client;
        self
    }

    /// Treat tokens as expired this long before their actual expiry.
    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    pub fn client_id(&self) -> &str {
        &self.credentials.client_id
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// The cached token, valid or not.
    pub async fn cached(&self) -> Option<Token> {
        self.cache.read().await.as_ref().map(|cached| cached.token.clone())
    }

    /// Drop the cached token so the next call performs an exchange.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    async fn cached_valid(&self) -> Option<Token> {
        let now = Utc::now();
        self.cache
            .read()
            .await
            .as_ref()
            .filter(|cached| cached.token.is_valid_at(now, cached.margin))
            .map(|cached| cached.token.clone())
    }

    /// Margin to apply to a token that was just issued.
    ///
    /// Falls back to half the remaining lifetime when the configured margin would
    /// already cover all of it.
    fn margin_for(&self, token: &Token, now: DateTime<Utc>) -> Duration {
        let lifetime = token.expire_at - now;
        if self.refresh_margin < lifetime {
            return self.refresh_margin;
        }
        warn!(
            "Refresh margin of {}s is not shorter than the token lifetime of {}s; using half the lifetime",
            self.refresh_margin.num_seconds(),
            lifetime.num_seconds()
        );
        lifetime / 2
    }

    async fn store(&self, token: Token) {
        let margin = self.margin_for(&token, Utc::now());
        *self.cache.write().await = Some(CachedToken { token, margin });
    }

    /// Perform one credential exchange against the token endpoint.
    async fn exchange(&self) -> Result<Token, Error> {
        let form = [
            ("client_id", self.credentials.client_id.as_str()),
            (
                "client_secret",
                self.credentials.client_secret.expose_secret().as_str(),
            ),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            warn!("Token endpoint responded with {}", status);
            return Err(auth_error(
                AuthErrorKind::Server {
                    status: status.as_u16(),
                    body,
                },
                "error response from authentication server",
            ));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Auth(AuthErrorKind::ResponseInvalid),
        })?;

        validate_response(parsed, Utc::now())
    }
}

fn validate_response(parsed: TokenResponse, now: DateTime<Utc>) -> Result<Token, Error> {
    if parsed.access_token.is_empty() {
        return Err(auth_error(
            AuthErrorKind::ResponseInvalid,
            "response is missing access_token",
        ));
    }

    let expire_at = DateTime::<Utc>::from_timestamp(parsed.expire_at, 0)
        .filter(|expire_at| *expire_at > now)
        .ok_or_else(|| {
            auth_error(
                AuthErrorKind::ResponseExpired,
                "response has invalid expire_at timestamp",
            )
        })?;

    Ok(Token::new(parsed.access_token, expire_at))
}

fn transport_error(err: reqwest::Error) -> Error {
    Error {
        source: Some(Box::new(err)),
        error_kind: ErrorKind::Auth(AuthErrorKind::Transport),
    }
}

#[async_trait]
impl TokenSource for TokenProvider {
    async fn token(&self) -> Result<Token, Error> {
        if let Some(token) = self.cached_valid().await {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited for the lock
        if let Some(token) = self.cached_valid().await {
            debug!("Token was refreshed by another caller");
            return Ok(token);
        }

        debug!("Refreshing bearer token for client {}", self.credentials.client_id);
        let token = self.exchange().await?;
        self.store(token.clone()).await;
        debug!(
            "Token refreshed, valid for {}s",
            token.time_until_expiry().num_seconds()
        );

        Ok(token)
    }
}
