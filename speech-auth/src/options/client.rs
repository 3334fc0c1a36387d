//! Client options with endpoint and credential overrides.

/// Default token exchange endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://openapi.vito.ai/v1/authenticate";

/// Default batch transcription endpoint.
pub const DEFAULT_REST_ENDPOINT: &str = "https://openapi.vito.ai/v1/transcribe";

/// Default streaming RPC endpoint (host:port, TLS).
pub const DEFAULT_STREAMING_ENDPOINT: &str = "grpc-openapi.vito.ai:443";

/// Caller supplied overrides for credentials and endpoints.
///
/// Every field is optional. Accessors fall back to the environment (credentials)
/// or to the hosted service defaults (endpoints) when a field is unset.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_url: Option<String>,
    pub rest_endpoint: Option<String>,
    pub streaming_endpoint: Option<String>,
}

impl ClientOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = Some(token_url.into());
        self
    }

    pub fn with_rest_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.rest_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_streaming_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.streaming_endpoint = Some(endpoint.into());
        self
    }

    /// Token endpoint, or the hosted default.
    pub fn token_url(&self) -> &str {
        non_empty(&self.token_url).unwrap_or(DEFAULT_TOKEN_URL)
    }

    /// Batch endpoint, or the hosted default.
    pub fn rest_endpoint(&self) -> &str {
        non_empty(&self.rest_endpoint).unwrap_or(DEFAULT_REST_ENDPOINT)
    }

    /// Streaming endpoint address, or the hosted default.
    pub fn streaming_endpoint(&self) -> &str {
        non_empty(&self.streaming_endpoint).unwrap_or(DEFAULT_STREAMING_ENDPOINT)
    }

    /// Explicit client id override, `fallback` otherwise.
    pub fn client_id_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        non_empty(&self.client_id).unwrap_or(fallback)
    }

    /// Explicit client secret override, `fallback` otherwise.
    pub fn client_secret_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        non_empty(&self.client_secret).unwrap_or(fallback)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let options = ClientOptions::new();
        assert_eq!(options.token_url(), DEFAULT_TOKEN_URL);
        assert_eq!(options.rest_endpoint(), DEFAULT_REST_ENDPOINT);
        assert_eq!(options.streaming_endpoint(), DEFAULT_STREAMING_ENDPOINT);
    }

    #[test]
    fn test_overrides_win() {
        let options = ClientOptions::new()
            .with_token_url("http://localhost:1234/auth")
            .with_rest_endpoint("http://localhost:1234/transcribe")
            .with_streaming_endpoint("localhost:50051");
        assert_eq!(options.token_url(), "http://localhost:1234/auth");
        assert_eq!(options.rest_endpoint(), "http://localhost:1234/transcribe");
        assert_eq!(options.streaming_endpoint(), "localhost:50051");
    }

    #[test]
    fn test_empty_override_falls_back() {
        let options = ClientOptions::new().with_token_url("").with_client_id("");
        assert_eq!(options.token_url(), DEFAULT_TOKEN_URL);
        assert_eq!(options.client_id_or("from-env"), "from-env");
    }
}
