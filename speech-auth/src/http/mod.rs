//! HTTP client building with middleware.

mod client;
mod middleware;
mod retry;

pub use client::{AuthenticatedClient, AuthenticatedClientBuilder};
pub use middleware::AuthMiddleware;
pub use retry::BackoffPolicy;
