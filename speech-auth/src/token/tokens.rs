//! Bearer token types.

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Bearer token with its absolute expiry instant.
///
/// Replaced wholesale on refresh, never edited in place.
#[derive(Debug, Clone)]
pub struct Token {
    /// Opaque bearer value presented on each authenticated call.
    pub access_token: SecretString,
    /// When the bearer value stops being accepted.
    pub expire_at: DateTime<Utc>,
}

impl Token {
    pub fn new(access_token: impl Into<String>, expire_at: DateTime<Utc>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            expire_at,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.expose_secret().is_empty()
    }

    /// A token is valid iff it is non-empty and `expire_at` is strictly after `now + margin`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        !self.is_empty() && self.expire_at > now + margin
    }

    /// Validity against the current clock with no safety margin.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now(), Duration::zero())
    }

    /// Get the remaining time until expiration.
    pub fn time_until_expiry(&self) -> Duration {
        self.expire_at - Utc::now()
    }

    /// Value for an `Authorization` header or metadata entry.
    pub fn authorization_value(&self) -> String {
        format!("Bearer {}", self.access_token.expose_secret())
    }
}

/// Body returned by the token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub expire_at: i64,
}
