//! Broker configuration loaded from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `9092` |
//! | `ADVERTISED_HOST` | `localhost` when `HOST` is `0.0.0.0`, else `HOST` |
//! | `BROKER_ID` | `0` |
//! | `DATA_PATH` | `./data` |
//! | `FRAME_READ_TIMEOUT_SECS` | `10` |
//! | `FETCH_COMPRESSION` | `gzip` |
//! | `LOG_FORMAT` | `pretty` |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    CONSUMER_OFFSETS_FILE, DEFAULT_FRAME_READ_TIMEOUT_SECS, DEFAULT_MAX_MESSAGE_SIZE,
    DEFAULT_PORT, PARTITION_LOGS_FILE,
};
use crate::error::{Error, Result};
use crate::protocol::Compression;
use crate::server::ConnectionConfig;
use crate::telemetry::LogFormat;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Address the listener binds to.
    pub host: String,
    pub port: u16,
    /// Host reported to clients in Metadata responses.
    pub advertised_host: String,
    /// Node id reported as controller and as leader of every partition.
    pub broker_id: i32,
    /// Directory holding the two snapshot files.
    pub data_path: PathBuf,
    pub frame_read_timeout: Duration,
    /// Codec applied to fetch batches holding more than one record.
    pub fetch_compression: Compression,
    pub log_format: LogFormat,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            advertised_host: "localhost".to_string(),
            broker_id: 0,
            data_path: PathBuf::from("./data"),
            frame_read_timeout: Duration::from_secs(DEFAULT_FRAME_READ_TIMEOUT_SECS),
            fetch_compression: Compression::Gzip,
            log_format: LogFormat::Pretty,
        }
    }
}

impl BrokerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);

        let advertised_host = lookup("ADVERTISED_HOST").unwrap_or_else(|| {
            if host == "0.0.0.0" {
                "localhost".to_string()
            } else {
                host.clone()
            }
        });

        let port = parse_var(&lookup, "PORT", defaults.port)?;
        let broker_id = parse_var(&lookup, "BROKER_ID", defaults.broker_id)?;
        let data_path = lookup("DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_path);
        let frame_read_timeout = Duration::from_secs(parse_var(
            &lookup,
            "FRAME_READ_TIMEOUT_SECS",
            defaults.frame_read_timeout.as_secs(),
        )?);
        let fetch_compression =
            parse_var(&lookup, "FETCH_COMPRESSION", defaults.fetch_compression)?;
        let log_format = lookup("LOG_FORMAT")
            .map(|s| s.parse().unwrap_or_default())
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            advertised_host,
            broker_id,
            data_path,
            frame_read_timeout,
            fetch_compression,
            log_format,
        })
    }

    /// Validate the configuration and return every problem found.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.advertised_host.trim().is_empty() {
            errors.push("advertised_host must not be empty".to_string());
        }
        if self.data_path.as_os_str().is_empty() {
            errors.push("data_path must not be empty".to_string());
        }
        if self.frame_read_timeout.is_zero() {
            errors.push("frame_read_timeout must be greater than zero".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn partition_logs_path(&self) -> PathBuf {
        self.data_path.join(PARTITION_LOGS_FILE)
    }

    pub fn consumer_offsets_path(&self) -> PathBuf {
        self.data_path.join(CONSUMER_OFFSETS_FILE)
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            frame_read_timeout: self.frame_read_timeout,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid {}: {}", key, e))),
        None => Ok(default),
    }
}
