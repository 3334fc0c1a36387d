//! Bearer token injection for outgoing REST requests.

use std::sync::Arc;

use async_trait::async_trait;
use http::Extensions;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use tracing::trace;

use crate::error::{Error, ErrorKind, HttpErrorKind};
use crate::token::TokenSource;

/// Middleware that asks a [`TokenSource`] for a valid token before every dispatch and
/// sets `Authorization: Bearer <token>` on the request it forwards.
///
/// The request passed down the chain is the one handed to this middleware (for retried
/// requests, the retry layer's clone), so the caller's builder is never touched. Token
/// failures abort the call before any bytes are sent and surface unchanged through
/// `Error::from(reqwest_middleware::Error)`.
pub struct AuthMiddleware {
    source: Arc<dyn TokenSource>,
}

impl AuthMiddleware {
    pub fn new(source: Arc<dyn TokenSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let token = self
            .source
            .token()
            .await
            .map_err(|e| reqwest_middleware::Error::Middleware(e.into()))?;

        let mut value = HeaderValue::from_str(&token.authorization_value()).map_err(|e| {
            let err = Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::Http(HttpErrorKind::InvalidHeader),
            };
            reqwest_middleware::Error::Middleware(err.into())
        })?;
        value.set_sensitive(true);

        trace!("Authorizing {} {}", req.method(), req.url());
        req.headers_mut().insert(AUTHORIZATION, value);

        next.run(req, extensions).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{auth_error, AuthErrorKind};
    use crate::token::Token;
    use chrono::{Duration, Utc};
    use reqwest_middleware::ClientBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenSource for StaticSource {
        async fn token(&self) -> Result<Token, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Token::new("static-token", Utc::now() + Duration::hours(1)))
        }
    }

    struct FailingSource;

    #[async_trait]
    impl TokenSource for FailingSource {
        async fn token(&self) -> Result<Token, Error> {
            Err(auth_error(
                AuthErrorKind::Server {
                    status: 500,
                    body: "down".to_string(),
                },
                "token endpoint unavailable",
            ))
        }
    }

    #[tokio::test]
    async fn test_bearer_header_is_injected() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/transcribe/job-1")
            .match_header("authorization", "Bearer static-token")
            .with_status(200)
            .create_async()
            .await;

        let source = Arc::new(StaticSource {
            calls: AtomicUsize::new(0),
        });
        let client = ClientBuilder::new(reqwest::Client::new())
            .with(AuthMiddleware::new(source.clone()))
            .build();

        let response = client
            .get(format!("{}/v1/transcribe/job-1", server.url()))
            .send()
            .await
            .unwrap();

        assert!(response.status().is_success());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_token_failure_propagates_verbatim_without_dispatch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = ClientBuilder::new(reqwest::Client::new())
            .with(AuthMiddleware::new(Arc::new(FailingSource)))
            .build();

        let err: Error = client
            .get(format!("{}/anything", server.url()))
            .send()
            .await
            .unwrap_err()
            .into();

        assert_eq!(
            err.error_kind,
            ErrorKind::Auth(AuthErrorKind::Server {
                status: 500,
                body: "down".to_string(),
            })
        );
        mock.assert_async().await;
    }
}
