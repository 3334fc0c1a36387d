//! Bearer-authenticated `reqwest` clients.

use std::sync::Arc;
use std::time::Duration;

use reqwest_middleware::ClientBuilder;
use reqwest_retry::RetryTransientMiddleware;

use super::{AuthMiddleware, BackoffPolicy};
use crate::error::Error;
use crate::token::TokenSource;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BUDGET: Duration = Duration::from_secs(120);

/// `reqwest` client wrapped in the configured middleware stack.
pub type AuthenticatedClient = reqwest_middleware::ClientWithMiddleware;

/// Assembles an [`AuthenticatedClient`].
///
/// Retry sits outside bearer injection, so each retried attempt asks the token source
/// again and picks up a refreshed token. Streamed request bodies cannot be replayed;
/// clients sending them should use `with_max_retries(0)`.
pub struct AuthenticatedClientBuilder {
    timeout: Option<Duration>,
    max_retries: u32,
    retry_budget: Duration,
    user_agent: String,
    auth: Option<Arc<dyn TokenSource>>,
}

impl AuthenticatedClientBuilder {
    pub fn new() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_budget: DEFAULT_RETRY_BUDGET,
            user_agent: format!("speech-auth/{}", env!("CARGO_PKG_VERSION")),
            auth: None,
        }
    }

    /// Token source consulted before every dispatch.
    pub fn with_auth(mut self, auth: Arc<dyn TokenSource>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Whole-request timeout. `None` leaves requests bounded only by the caller.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retries for transient failures. Zero leaves the retry layer out.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Time after the first attempt past which no retry is started.
    pub fn with_retry_budget(mut self, budget: Duration) -> Self {
        self.retry_budget = budget;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn build(self) -> Result<AuthenticatedClient, Error> {
        let mut builder = reqwest::Client::builder().user_agent(self.user_agent.as_str());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        Ok(self.build_with(client))
    }

    /// Wrap an existing `reqwest` client; its own timeout and user agent are kept.
    pub fn build_with(self, client: reqwest::Client) -> AuthenticatedClient {
        let mut builder = ClientBuilder::new(client);

        if self.max_retries > 0 {
            let policy = BackoffPolicy::new(self.max_retries).with_max_elapsed(self.retry_budget);
            builder = builder.with(RetryTransientMiddleware::new_with_policy(policy));
        }
        if let Some(auth) = self.auth {
            builder = builder.with(AuthMiddleware::new(auth));
        }

        builder.build()
    }
}

impl Default for AuthenticatedClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
