//! Logging configuration.
//!
//! ```rust,no_run
//! use minnow::telemetry::{LogFormat, init_logging};
//!
//! init_logging(LogFormat::from_env()).expect("Failed to init logging");
//! ```
//!
//! # Environment Variables
//!
//! - `LOG_FORMAT`: Set to `json` or `pretty` (default: `pretty`)
//! - `RUST_LOG`: Control log levels (default: `info`)

use tracing_subscriber::prelude::*;

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty-print format (default).
    #[default]
    Pretty,
    /// One JSON object per line for log aggregators.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        })
    }
}

impl LogFormat {
    /// Read from LOG_FORMAT environment variable.
    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|s| s.parse().unwrap_or_default())
            .unwrap_or_default()
    }
}

/// Initialize logging with the specified format.
///
/// Log levels are controlled via the `RUST_LOG` environment variable and
/// default to `info`. Fails if a global subscriber is already installed.
pub fn init_logging(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()?;
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("anything".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
    }

    #[test]
    fn test_log_format_default() {
        assert_eq!(LogFormat::default(), LogFormat::Pretty);
    }

    #[test]
    fn test_second_init_fails() {
        // Whichever call wins, a later one must report the existing subscriber.
        let _ = init_logging(LogFormat::Pretty);
        assert!(init_logging(LogFormat::Json).is_err());
    }
}
