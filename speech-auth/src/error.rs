//! Error types for the `speech-auth` crate.
//!
//! Follows a root Error struct holding an error kind tree and an optional source
//! for error chaining.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for speech-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors in speech-auth.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Missing client identifier, secret or endpoint after applying overrides.
    Configuration,
    Auth(AuthErrorKind),
    Http(HttpErrorKind),
}

/// Errors from exchanging credentials for a bearer token.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthErrorKind {
    /// The token endpoint could not be reached or the body could not be read.
    Transport,
    /// The token endpoint answered with a non-success status.
    Server { status: u16, body: String },
    /// The response carried no bearer value or could not be decoded.
    ResponseInvalid,
    /// The response carried an expiry that is not in the future.
    ResponseExpired,
}

/// Errors from HTTP client operations.
#[derive(Debug, Clone, PartialEq)]
pub enum HttpErrorKind {
    BuilderFailed,
    RequestFailed,
    Network,
    InvalidHeader,
}

impl Error {
    /// Returns the auth error kind, if this is a token acquisition failure.
    pub fn auth_kind(&self) -> Option<&AuthErrorKind> {
        match &self.error_kind {
            ErrorKind::Auth(kind) => Some(kind),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Configuration => write!(f, "Configuration error")?,
            ErrorKind::Auth(AuthErrorKind::Server { status, body }) => {
                write!(f, "Auth error: server responded {}: {}", status, body)?
            }
            ErrorKind::Auth(kind) => write!(f, "Auth error: {:?}", kind)?,
            ErrorKind::Http(kind) => write!(f, "HTTP error: {:?}", kind)?,
        }
        if let Some(source) = &self.source {
            write!(f, " ({})", source)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_builder() {
            ErrorKind::Http(HttpErrorKind::BuilderFailed)
        } else if err.is_request() {
            ErrorKind::Http(HttpErrorKind::RequestFailed)
        } else {
            ErrorKind::Http(HttpErrorKind::Network)
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest_middleware::Error> for Error {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            // Errors raised by our own middleware travel as anyhow::Error; recover them intact.
            reqwest_middleware::Error::Middleware(err) => match err.downcast::<Error>() {
                Ok(err) => err,
                Err(err) => Error {
                    source: Some(err.into()),
                    error_kind: ErrorKind::Http(HttpErrorKind::RequestFailed),
                },
            },
            reqwest_middleware::Error::Reqwest(err) => err.into(),
        }
    }
}

/// Helper function to create configuration errors.
pub fn config_error(message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Configuration,
    }
}

/// Helper function to create token acquisition errors.
pub fn auth_error(kind: AuthErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Auth(kind),
    }
}

/// Helper function to create HTTP errors.
pub fn http_error(kind: HttpErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind: ErrorKind::Http(kind),
    }
}
