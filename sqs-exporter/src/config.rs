//! Exporter configuration loaded from environment variables.
//!
//! Supported env vars:
//! - `SQS_QUEUE_URLS` (required, comma-separated)
//! - `SQS_MONITOR_INTERVAL_SECONDS` (default 30)
//! - `SQS_FETCH_TIMEOUT_SECONDS` (default 10)
//! - `PORT` (default 8080)
//! - `BIND_ADDRESS` (default "0.0.0.0")
//! - `LOG_DIR`, `LOG_FORMAT`

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::logging::LogFormat;
use crate::monitor::{DEFAULT_FETCH_TIMEOUT, DEFAULT_POLL_INTERVAL, QueueMonitorConfig};
use crate::{Error, Result};

pub const QUEUE_URLS_VAR: &str = "SQS_QUEUE_URLS";
pub const MONITOR_INTERVAL_VAR: &str = "SQS_MONITOR_INTERVAL_SECONDS";
pub const FETCH_TIMEOUT_VAR: &str = "SQS_FETCH_TIMEOUT_SECONDS";
pub const PORT_VAR: &str = "PORT";
pub const BIND_ADDRESS_VAR: &str = "BIND_ADDRESS";
pub const LOG_DIR_VAR: &str = "LOG_DIR";
pub const LOG_FORMAT_VAR: &str = "LOG_FORMAT";

/// Default listen port for the scrape and health endpoints.
pub const DEFAULT_PORT: u16 = 8080;

/// Exporter configuration.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Queue addresses, in configured order. Never empty.
    pub queue_urls: Vec<String>,
    /// Time between poll cycles.
    pub poll_interval: Duration,
    /// Per-call fetch timeout.
    pub fetch_timeout: Duration,
    /// Server bind address.
    pub bind_address: String,
    /// Server port.
    pub port: u16,
    /// Directory for rolling log files.
    pub log_dir: Option<PathBuf>,
    /// Console log format.
    pub log_format: LogFormat,
}

impl ExporterConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the value of a variable if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let queue_urls = parse_queue_urls(lookup(QUEUE_URLS_VAR).as_deref())?;
        let poll_interval = parse_interval(lookup(MONITOR_INTERVAL_VAR).as_deref());
        let fetch_timeout = match lookup(FETCH_TIMEOUT_VAR) {
            Some(raw) => parse_seconds(FETCH_TIMEOUT_VAR, Some(&raw), DEFAULT_FETCH_TIMEOUT),
            None => DEFAULT_FETCH_TIMEOUT,
        };
        let port = parse_port(lookup(PORT_VAR).as_deref());

        let bind_address = lookup(BIND_ADDRESS_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "0.0.0.0".to_string());

        let (log_format, log_dir) = logging_from_lookup(&lookup);

        Ok(Self {
            queue_urls,
            poll_interval,
            fetch_timeout,
            bind_address,
            port,
            log_dir,
            log_format,
        })
    }

    /// Monitor settings derived from this configuration.
    pub fn monitor_config(&self) -> QueueMonitorConfig {
        QueueMonitorConfig {
            poll_interval: self.poll_interval,
            fetch_timeout: self.fetch_timeout,
        }
    }
}

/// Logging settings from the process environment.
///
/// Read before the subscriber is installed, so invalid values silently fall
/// back to text output.
pub fn logging_from_env() -> (LogFormat, Option<PathBuf>) {
    logging_from_lookup(&|key: &str| std::env::var(key).ok())
}

fn logging_from_lookup<F>(lookup: &F) -> (LogFormat, Option<PathBuf>)
where
    F: Fn(&str) -> Option<String>,
{
    let log_format = lookup(LOG_FORMAT_VAR)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_default();

    let log_dir = lookup(LOG_DIR_VAR)
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);

    (log_format, log_dir)
}

/// Split the queue list on commas, trimming entries and dropping empty ones.
///
/// An absent or effectively empty list is a configuration error.
pub fn parse_queue_urls(raw: Option<&str>) -> Result<Vec<String>> {
    let urls: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        return Err(Error::config(format!("No URLs supplied in {}", QUEUE_URLS_VAR)));
    }

    Ok(urls)
}

/// Parse the poll interval in whole seconds.
///
/// Unset, empty, non-numeric or zero values fall back to 30 seconds with a
/// warning.
pub fn parse_interval(raw: Option<&str>) -> Duration {
    parse_seconds(MONITOR_INTERVAL_VAR, raw, DEFAULT_POLL_INTERVAL)
}

fn parse_seconds(var: &str, raw: Option<&str>, default: Duration) -> Duration {
    let raw = match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            warn!("{} not set, defaulting to {:?}", var, default);
            return default;
        }
    };

    match raw.parse::<u64>() {
        Ok(0) => {
            warn!("{} must be positive, using default {:?}", var, default);
            default
        }
        Ok(secs) => Duration::from_secs(secs),
        Err(e) => {
            warn!(error = %e, value = %raw, "Invalid value for {}, using default {:?}", var, default);
            default
        }
    }
}

fn parse_port(raw: Option<&str>) -> u16 {
    match raw.map(str::trim) {
        Some(raw) if !raw.is_empty() => raw.parse().unwrap_or_else(|e| {
            warn!(error = %e, value = %raw, "Invalid value for {}, using {}", PORT_VAR, DEFAULT_PORT);
            DEFAULT_PORT
        }),
        _ => DEFAULT_PORT,
    }
}
