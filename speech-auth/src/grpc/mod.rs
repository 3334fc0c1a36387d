//! Bearer token injection for outgoing RPC calls.

use secrecy::ExposeSecret;
use tonic::metadata::AsciiMetadataValue;
use tracing::trace;

use crate::error::{Error, ErrorKind, HttpErrorKind};
use crate::token::TokenSource;

/// Metadata key carrying the bearer token.
pub const AUTHORIZATION_KEY: &str = "authorization";

/// Attach `authorization: bearer <token>` to an outgoing request.
///
/// Asks `source` for a valid token at the moment of the call; token failures are returned
/// unchanged and the request is dropped without being dispatched.
pub async fn authorize<T, S>(
    source: &S,
    mut request: tonic::Request<T>,
) -> Result<tonic::Request<T>, Error>
where
    S: TokenSource + ?Sized,
{
    let token = source.token().await?;

    let mut value: AsciiMetadataValue = format!("bearer {}", token.access_token.expose_secret())
        .parse()
        .map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::Http(HttpErrorKind::InvalidHeader),
        })?;
    value.set_sensitive(true);

    trace!("Authorizing streaming call");
    request.metadata_mut().insert(AUTHORIZATION_KEY, value);
    Ok(request)
}
