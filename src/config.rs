//! Layered configuration
//!
//! Built-in defaults, then `config.toml` (from the user config directory or
//! `--config`), then environment variables and command-line flags.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use estail_logs::{DEFAULT_PAGE_SIZE, DEFAULT_STATS_INTERVAL};

pub const DEFAULT_URL: &str = "http://localhost:9200";
pub const DEFAULT_INDEX: &str = "logs";

const DEFAULT_INTERVAL_SECS: f64 = 1.0;
const DEFAULT_RETRY_DELAY_SECS: f64 = 1.0;
const DEFAULT_REQUEST_TIMEOUT_SECS: f64 = 30.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Contents of `config.toml`; every key is optional
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub url: Option<String>,
    pub index: Option<String>,
    pub interval: Option<f64>,
    pub page_size: Option<usize>,
    pub stats_interval: Option<f64>,
    pub retry_delay: Option<f64>,
    pub request_timeout: Option<f64>,
}

impl FileConfig {
    /// `<config dir>/estail/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        let dir = dirs::config_dir()?;
        Some(dir.join("estail").join("config.toml"))
    }

    /// Load one file; a missing file is an error
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the explicit file if given, else the default file if it exists
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}

/// Values from the command line or its environment variables
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overrides {
    pub url: Option<String>,
    pub index: Option<String>,
    pub interval: Option<f64>,
}

/// Fully resolved settings for a run
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub url: String,
    pub index: String,
    pub interval: Duration,
    pub page_size: usize,
    pub stats_interval: Duration,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl Settings {
    /// Merge file values under the overrides and fill the gaps with defaults
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self, ConfigError> {
        let page_size = file.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "page_size",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            url: overrides
                .url
                .or(file.url)
                .unwrap_or_else(|| DEFAULT_URL.to_string()),
            index: overrides
                .index
                .or(file.index)
                .unwrap_or_else(|| DEFAULT_INDEX.to_string()),
            interval: seconds(
                "interval",
                overrides.interval.or(file.interval).unwrap_or(DEFAULT_INTERVAL_SECS),
            )?,
            page_size,
            stats_interval: match file.stats_interval {
                Some(secs) => seconds("stats_interval", secs)?,
                None => DEFAULT_STATS_INTERVAL,
            },
            retry_delay: seconds(
                "retry_delay",
                file.retry_delay.unwrap_or(DEFAULT_RETRY_DELAY_SECS),
            )?,
            request_timeout: seconds(
                "request_timeout",
                file.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            )?,
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            index: DEFAULT_INDEX.to_string(),
            interval: Duration::from_secs_f64(DEFAULT_INTERVAL_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            stats_interval: DEFAULT_STATS_INTERVAL,
            retry_delay: Duration::from_secs_f64(DEFAULT_RETRY_DELAY_SECS),
            request_timeout: Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

fn seconds(key: &'static str, value: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(value).map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("{} ({})", value, e),
    })
}
