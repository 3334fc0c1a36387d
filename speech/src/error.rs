//! Error types for speech recognition operations.
//!
//! Same shape as the auth crate: a root `Error` holding an `ErrorKind` and an optional
//! source. Auth failures are mirrored into `ErrorKind::Auth` with the original auth error
//! kept as the source, so callers see the root cause unchanged.

use std::error::Error as StdError;
use std::fmt;

pub use speech_auth::AuthErrorKind;

#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// Missing credentials or endpoints, or an unusable option value.
    Configuration,
    /// Token acquisition failed.
    Auth(AuthErrorKind),
    /// Caller-side contract violation, detected before any I/O.
    InvalidRequest,
    /// The service answered with a non-success status.
    RemoteRejected { status: u16, body: String },
    /// The batch job exists but has not completed yet.
    ResultNotReady,
    /// The streaming channel did not become ready in time.
    ConnectTimeout,
    Stream(StreamErrorKind),
    Network,
    /// A response body could not be decoded.
    Decode,
    Io,
    /// A caller-supplied deadline passed.
    Timeout,
    Cancelled,
}

/// Failures specific to a streaming session.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamErrorKind {
    /// Writing to the call failed; fatal to the producer.
    Send,
    /// Reading from the call failed.
    Receive,
    /// The service flagged a recognition error on an event.
    Recognition,
    /// The session was driven out of order.
    Protocol,
}

impl Error {
    pub fn new(error_kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            source: Some(message.into().into()),
            error_kind,
        }
    }

    pub fn is_not_ready(&self) -> bool {
        self.error_kind == ErrorKind::ResultNotReady
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Configuration => write!(f, "Configuration error")?,
            ErrorKind::Auth(kind) => write!(f, "Auth error: {:?}", kind)?,
            ErrorKind::InvalidRequest => write!(f, "Invalid request")?,
            ErrorKind::RemoteRejected { status, body } => {
                write!(f, "Remote rejected the request with {}: {}", status, body)?
            }
            ErrorKind::ResultNotReady => write!(f, "Result not ready")?,
            ErrorKind::ConnectTimeout => write!(f, "Timed out connecting to streaming endpoint")?,
            ErrorKind::Stream(kind) => write!(f, "Stream error: {:?}", kind)?,
            ErrorKind::Network => write!(f, "Network error")?,
            ErrorKind::Decode => write!(f, "Decode error")?,
            ErrorKind::Io => write!(f, "I/O error")?,
            ErrorKind::Timeout => write!(f, "Timeout")?,
            ErrorKind::Cancelled => write!(f, "Cancelled")?,
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

impl From<speech_auth::Error> for Error {
    fn from(err: speech_auth::Error) -> Self {
        use speech_auth::ErrorKind as AuthKind;

        let error_kind = match &err.error_kind {
            AuthKind::Configuration => ErrorKind::Configuration,
            AuthKind::Auth(kind) => ErrorKind::Auth(kind.clone()),
            AuthKind::Http(_) => ErrorKind::Network,
        };
        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let error_kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_decode() {
            ErrorKind::Decode
        } else {
            ErrorKind::Network
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
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            // The auth crate recovers its own middleware errors (token failures) intact.
            err => speech_auth::Error::from(err).into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Decode,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Io,
        }
    }
}

impl From<tonic::Status> for Error {
    fn from(status: tonic::Status) -> Self {
        let error_kind = match status.code() {
            tonic::Code::Cancelled => ErrorKind::Cancelled,
            tonic::Code::DeadlineExceeded => ErrorKind::Timeout,
            tonic::Code::Unauthenticated => {
                // The server refused the bearer token itself.
                return Error {
                    source: Some(Box::new(status)),
                    error_kind: ErrorKind::RemoteRejected {
                        status: 401,
                        body: String::new(),
                    },
                };
            }
            _ => ErrorKind::Stream(StreamErrorKind::Receive),
        };
        Error {
            source: Some(Box::new(status)),
            error_kind,
        }
    }
}

impl From<tonic::transport::Error> for Error {
    fn from(err: tonic::transport::Error) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Network,
        }
    }
}

/// Helper function to create configuration errors.
pub fn config_error(message: &str) -> Error {
    Error::new(ErrorKind::Configuration, message)
}

/// Helper function to create request validation errors.
pub fn invalid_request(message: &str) -> Error {
    Error::new(ErrorKind::InvalidRequest, message)
}

pub fn not_ready(job_id: &str) -> Error {
    Error::new(
        ErrorKind::ResultNotReady,
        format!("job {} has not completed", job_id),
    )
}

pub fn stream_error(kind: StreamErrorKind, message: &str) -> Error {
    Error::new(ErrorKind::Stream(kind), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use speech_auth::error::auth_error;

    #[test]
    fn test_auth_error_is_mirrored_and_kept_as_source() {
        let err: Error = auth_error(
            AuthErrorKind::Server {
                status: 401,
                body: "bad client".to_string(),
            },
            "token endpoint rejected credentials",
        )
        .into();

        assert_eq!(
            err.error_kind,
            ErrorKind::Auth(AuthErrorKind::Server {
                status: 401,
                body: "bad client".to_string()
            })
        );
        let source = StdError::source(&err).unwrap();
        let auth = source.downcast_ref::<speech_auth::Error>().unwrap();
        assert!(auth.auth_kind().is_some());
    }

    #[test]
    fn test_auth_configuration_maps_to_configuration() {
        let err: Error = speech_auth::error::config_error("client id is not set").into();
        assert_eq!(err.error_kind, ErrorKind::Configuration);
    }

    #[test]
    fn test_display_remote_rejected() {
        let err = Error {
            source: None,
            error_kind: ErrorKind::RemoteRejected {
                status: 400,
                body: "{\"code\":\"H0002\"}".to_string(),
            },
        };
        assert_eq!(
            err.to_string(),
            "Remote rejected the request with 400: {\"code\":\"H0002\"}"
        );
    }

    #[test]
    fn test_not_ready_helper() {
        let err = not_ready("job-1");
        assert!(err.is_not_ready());
        assert!(err.to_string().contains("job-1"));
    }

    #[test]
    fn test_status_cancelled_maps_to_cancelled() {
        let err: Error = tonic::Status::cancelled("client went away").into();
        assert_eq!(err.error_kind, ErrorKind::Cancelled);
    }

    #[test]
    fn test_status_internal_maps_to_receive() {
        let err: Error = tonic::Status::internal("decoder crashed").into();
        assert_eq!(err.error_kind, ErrorKind::Stream(StreamErrorKind::Receive));
    }
}
