//! Logging setup shared by the Mediacast binaries
//!
//! Log lines always go to stderr so stdout stays free for the run outcome.
//!
//! # Examples
//!
//! ```no_run
//! use libmediacast::logging::{LogFormat, LoggingConfig};
//!
//! // Explicit settings
//! LoggingConfig::new(LogFormat::Json, "info".to_string(), false).init();
//!
//! // Or read MEDIACAST_LOG_FORMAT / MEDIACAST_LOG_LEVEL
//! libmediacast::logging::init_default();
//! ```

use std::str::FromStr;
use tracing_subscriber::EnvFilter;

pub const LOG_FORMAT_ENV: &str = "MEDIACAST_LOG_FORMAT";
pub const LOG_LEVEL_ENV: &str = "MEDIACAST_LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Plain text, no colors (cron mail, journald)
    Text,
    /// One JSON object per line
    Json,
    /// Multi-line with colors, for development
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub verbose: bool,
}

impl LoggingConfig {
    /// Create a logging configuration
    ///
    /// * `level` - filter directive such as `info` or `libmediacast=debug`
    /// * `verbose` - raise the default level to `debug`
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
        }
    }

    /// Settings from `MEDIACAST_LOG_FORMAT` and `MEDIACAST_LOG_LEVEL`
    ///
    /// Unset or unparsable values fall back to text at `info`.
    pub fn from_env(verbose: bool) -> Self {
        let format = std::env::var(LOG_FORMAT_ENV)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(LogFormat::Text);

        let level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());

        Self::new(format, level, verbose)
    }

    /// `RUST_LOG` wins over the configured level
    fn filter(&self) -> EnvFilter {
        let fallback = if self.verbose { "debug" } else { self.level.as_str() };
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(fallback))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Install the global subscriber
    ///
    /// Later calls are ignored once a subscriber is installed.
    pub fn init(&self) {
        let filter = self.filter();

        let result = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .flatten_event(true)
                .with_target(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false)
                .try_init(),
        };

        if result.is_err() {
            tracing::debug!("Logging already initialized");
        }
    }
}

/// Initialize logging from the environment
pub fn init_default() {
    LoggingConfig::from_env(false).init();
}
