use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};

/// Transport-stack modules that are silenced unless tracing.
const FILTERED_MODULES: &[&str] = &["hyper", "h2", "tonic", "tower", "reqwest", "rustls"];

pub struct Logger {}

impl Logger {
    /// Install the terminal logger at the configured level.
    ///
    /// At Trace every record is shown; at any other level the transport stack is silenced so
    /// the client's own records stay readable. Records from the auth crate's `tracing`
    /// macros arrive through the `log` bridge.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        let log_config = Self::build_log_config(Self::should_filter_dependencies(
            config.log_level_filter,
        ));

        TermLogger::init(
            config.log_level_filter,
            log_config,
            TerminalMode::Mixed,
            ColorChoice::Auto,
        )
    }

    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filtered_modules_cover_transport_stack() {
        for module in ["hyper", "h2", "tonic", "reqwest", "rustls"] {
            assert!(
                FILTERED_MODULES.contains(&module),
                "{} should be filtered",
                module
            );
        }
    }

    #[test]
    fn test_own_crates_are_not_filtered() {
        for module in ["speech", "speech_auth", "speech_client"] {
            assert!(!FILTERED_MODULES.contains(&module));
        }
    }

    #[test]
    fn test_only_trace_shows_dependencies() {
        assert!(!Logger::should_filter_dependencies(LevelFilter::Trace));
        for level in [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
        ] {
            assert!(Logger::should_filter_dependencies(level));
        }
    }

    #[test]
    fn test_build_log_config_both_ways() {
        let _filtered = Logger::build_log_config(true);
        let _unfiltered = Logger::build_log_config(false);
    }
}
