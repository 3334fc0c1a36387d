//! # speech-auth
//!
//! Credential and bearer token handling shared by the batch and streaming speech clients:
//! - Client identity resolved from options and the environment
//! - Token exchange with an expiry-aware, concurrency-safe cache
//! - HTTP client building with bearer middleware and retry
//! - Bearer metadata for streaming RPC calls
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use speech_auth::{
//!     http::AuthenticatedClientBuilder,
//!     token::TokenProvider,
//!     ClientOptions,
//! };
//!
//! let provider = Arc::new(TokenProvider::new(&ClientOptions::new())?);
//! let client = AuthenticatedClientBuilder::new().with_auth(provider).build()?;
//! ```

pub mod credentials;
pub mod error;
pub mod grpc;
pub mod http;
pub mod options;
pub mod token;

// Re-export commonly used types
pub use credentials::Credentials;
pub use error::{AuthErrorKind, Error, ErrorKind};
pub use options::ClientOptions;
pub use token::{Token, TokenProvider, TokenSource};
