//! Credential and endpoint overrides.

mod client;

pub use client::{
    ClientOptions, DEFAULT_REST_ENDPOINT, DEFAULT_STREAMING_ENDPOINT, DEFAULT_TOKEN_URL,
};
