//! Tracing subscriber setup.
//!
//! Verbosity follows the `-v` count: 1=ERROR, 2=WARN, 3=INFO (default), 4=DEBUG,
//! 5=TRACE. `RUST_LOG` directives override the computed level.

use std::io;

use clap::ValueEnum;
use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_subscriber::{
    EnvFilter, Layer, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Timestamp, level, target and spans.
    #[default]
    Full,
    /// Level and message only.
    Compact,
    /// One JSON object per event.
    Json,
}

/// Resolved logging configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    /// Default level when `RUST_LOG` does not say otherwise.
    pub level: LevelFilter,
    /// Stdout format.
    pub format: LogFormat,
    /// Disable stdout logging.
    pub quiet: bool,
}

impl LogConfig {
    /// Builds a configuration from a `-v` count.
    pub const fn from_verbosity(verbosity: u8, format: LogFormat, quiet: bool) -> Self {
        let level = match verbosity {
            0 => LevelFilter::OFF,
            1 => LevelFilter::ERROR,
            2 => LevelFilter::WARN,
            3 => LevelFilter::INFO,
            4 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        };
        Self { level, format, quiet }
    }

    /// Installs the global tracing subscriber. Fails if one is already set.
    pub fn init_tracing_subscriber(&self) -> eyre::Result<()> {
        let filter =
            EnvFilter::builder().with_default_directive(self.level.into()).from_env_lossy();

        let stdout = (!self.quiet).then(|| build_stdout_layer(self.format));

        tracing_subscriber::registry()
            .with(filter)
            .with(stdout)
            .try_init()
            .map_err(|e| eyre::eyre!("Failed to initialize tracing subscriber: {}", e))
    }
}

fn build_stdout_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + Send + Sync,
{
    let base = tracing_subscriber::fmt::layer().with_writer(io::stdout);
    match format {
        LogFormat::Full => Box::new(base),
        LogFormat::Compact => Box::new(base.compact()),
        LogFormat::Json => Box::new(base.json()),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1, LevelFilter::ERROR)]
    #[case(2, LevelFilter::WARN)]
    #[case(3, LevelFilter::INFO)]
    #[case(4, LevelFilter::DEBUG)]
    #[case(5, LevelFilter::TRACE)]
    #[case(9, LevelFilter::TRACE)]
    fn test_verbosity_levels(#[case] verbosity: u8, #[case] level: LevelFilter) {
        assert_eq!(LogConfig::from_verbosity(verbosity, LogFormat::Full, false).level, level);
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!(LogFormat::from_str("json", true).unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("compact", true).unwrap(), LogFormat::Compact);
        assert!(LogFormat::from_str("logfmt", true).is_err());
    }
}
