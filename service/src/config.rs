use std::time::Duration;

use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use speech_auth::ClientOptions;

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Client identifier issued by the speech service
    #[arg(long, env = "RTZR_CLIENT_ID")]
    client_id: Option<String>,

    /// Client secret issued together with the client identifier
    #[arg(long, env = "RTZR_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Override the token endpoint URL
    #[arg(long, env = "RTZR_TOKEN_URL")]
    token_url: Option<String>,

    /// Override the batch transcription endpoint URL
    #[arg(long, env = "RTZR_REST_ENDPOINT")]
    rest_endpoint: Option<String>,

    /// Override the streaming endpoint address (host:port or URL)
    #[arg(long, env = "RTZR_STREAMING_ENDPOINT")]
    streaming_endpoint: Option<String>,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap_or(LevelFilter::Info)),
        )]
    pub log_level_filter: LevelFilter,

    /// Seconds to wait before each batch result poll
    #[arg(long, env, default_value_t = 4)]
    pub poll_interval_secs: u64,

    /// Maximum number of batch result polls; 0 removes the attempt cap
    #[arg(long, env, default_value_t = 10)]
    pub max_poll_attempts: u32,

    /// Give up polling after this many seconds
    #[arg(long, env)]
    pub poll_deadline_secs: Option<u64>,

    /// Seconds allowed for the streaming channel to become ready
    #[arg(long, env, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Sample rate of the audio sent for streaming recognition
    #[arg(long, env, default_value_t = 8000)]
    pub sample_rate: u32,

    /// Bytes of audio per streaming message
    #[arg(long, env, default_value_t = 1024)]
    pub frame_bytes: usize,

    /// Timeout in seconds for batch result requests
    #[arg(long, env, default_value_t = 30)]
    pub http_timeout_secs: u64,

    /// Refresh the bearer token this many seconds before it expires
    #[arg(long, env, default_value_t = 0)]
    pub token_refresh_margin_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        load::<Config>()
    }

    /// Endpoint and credential overrides for the speech clients.
    pub fn client_options(&self) -> ClientOptions {
        let mut options = ClientOptions::new();
        if let Some(client_id) = &self.client_id {
            options = options.with_client_id(client_id);
        }
        if let Some(client_secret) = &self.client_secret {
            options = options.with_client_secret(client_secret);
        }
        if let Some(token_url) = &self.token_url {
            options = options.with_token_url(token_url);
        }
        if let Some(rest_endpoint) = &self.rest_endpoint {
            options = options.with_rest_endpoint(rest_endpoint);
        }
        if let Some(streaming_endpoint) = &self.streaming_endpoint {
            options = options.with_streaming_endpoint(streaming_endpoint);
        }
        options
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_poll_attempts(&self) -> Option<u32> {
        (self.max_poll_attempts > 0).then_some(self.max_poll_attempts)
    }

    pub fn poll_deadline(&self) -> Option<Duration> {
        self.poll_deadline_secs.map(Duration::from_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn token_refresh_margin(&self) -> Duration {
        Duration::from_secs(self.token_refresh_margin_secs)
    }
}

/// Load `.env` first, then parse `P` from the command line and environment.
pub fn load<P: Parser>() -> P {
    dotenv().ok();
    P::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Config {
        let mut argv = vec!["speech_client"];
        argv.extend_from_slice(args);
        Config::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["--client-id", "id", "--client-secret", "secret"]);
        assert_eq!(config.poll_interval(), Duration::from_secs(4));
        assert_eq!(config.max_poll_attempts(), Some(10));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.sample_rate, 8000);
        assert_eq!(config.frame_bytes, 1024);
        assert_eq!(config.log_level_filter, LevelFilter::Info);
    }

    #[test]
    fn test_zero_attempts_removes_cap() {
        let config = parse(&["--max-poll-attempts", "0", "--poll-deadline-secs", "120"]);
        assert_eq!(config.max_poll_attempts(), None);
        assert_eq!(config.poll_deadline(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_client_options_carry_overrides() {
        let config = parse(&[
            "--client-id",
            "id",
            "--rest-endpoint",
            "http://localhost:8080/v1/transcribe",
        ]);
        let options = config.client_options();
        assert_eq!(options.client_id_or("fallback"), "id");
        assert_eq!(options.rest_endpoint(), "http://localhost:8080/v1/transcribe");
    }

    #[test]
    fn test_log_level_parsed() {
        let config = parse(&["--log-level-filter", "DEBUG"]);
        assert_eq!(config.log_level_filter, LevelFilter::Debug);
    }
}
