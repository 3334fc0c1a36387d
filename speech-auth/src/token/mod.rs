//! Bearer token acquisition, caching and refresh.

mod provider;
mod source;
mod tokens;

pub use provider::TokenProvider;
pub use source::TokenSource;
pub use tokens::Token;
