//! Token source trait shared by the REST and streaming transports.

use std::sync::Arc;

use async_trait::async_trait;

use super::Token;
use crate::error::Error;

/// Anything that can hand out a currently valid bearer token.
///
/// Implementations must be safe to call from many tasks at once and must never
/// return a token that is already invalid.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn token(&self) -> Result<Token, Error>;
}

#[async_trait]
impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    async fn token(&self) -> Result<Token, Error> {
        (**self).token().await
    }
}
