//! Configuration management for the anime catalog client.
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all settings.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory settings
    #[serde(default)]
    pub data: DataConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Upstream API settings
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Rate limiting settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Data directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Root data directory path
    pub root_dir: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log directory path (relative to data directory or absolute)
    pub log_dir: String,

    /// Default log level (trace, debug, info, warn, error)
    pub default_level: String,

    /// Enable console output
    pub console: bool,

    /// Enable file output
    pub file: bool,

    /// Enable JSON formatting for file logs
    pub json_format: bool,
}

/// Which upstream anime API the catalog talks to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Generic REST anime database (`{ data, pagination }` envelopes)
    Jikan,
    /// Custom aggregator (`{ success, data }` envelopes)
    #[default]
    Aniwatch,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Jikan => "jikan",
            Backend::Aniwatch => "aniwatch",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jikan" => Ok(Backend::Jikan),
            "aniwatch" => Ok(Backend::Aniwatch),
            _ => Err(anyhow::anyhow!("Invalid backend: {}", s)),
        }
    }
}

/// Upstream API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Active backend
    pub backend: Backend,

    /// Jikan API base URL
    pub jikan_base_url: String,

    /// Aniwatch API base URL
    pub aniwatch_base_url: String,

    /// User agent sent with every request
    pub user_agent: String,

    /// Request timeout in seconds (None = no timeout)
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable caching
    pub enabled: bool,

    /// Age after which a cached response is no longer served
    pub freshness_seconds: u64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Token refill rate
    pub requests_per_second: f64,

    /// Bucket capacity (requests allowed back to back)
    pub burst: u32,

    /// Optional second bucket for per-minute quotas
    #[serde(default)]
    pub requests_per_minute: Option<u32>,

    /// Fixed pause after every successful network fetch
    ///
    /// Off by default. Set to 350 (with a high `requests_per_second`) for the
    /// legacy fixed-delay throttle.
    #[serde(default)]
    pub post_fetch_pause_ms: Option<u64>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root_dir: "data".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            default_level: "info".to_string(),
            console: true,
            file: false,
            json_format: false,
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            jikan_base_url: "https://api.jikan.moe/v4".to_string(),
            aniwatch_base_url: "https://aniwatch-v2-18-0.onrender.com/api/v2/hianime".to_string(),
            user_agent: format!("anime-client/{}", env!("CARGO_PKG_VERSION")),
            timeout_seconds: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            freshness_seconds: 300,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 3.0,
            burst: 1,
            requests_per_minute: None,
            post_fetch_pause_ms: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            logging: LoggingConfig::default(),
            upstream: UpstreamConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// If the file doesn't exist, returns the default configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            backend = %config.upstream.backend,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Check values that parse but cannot be used
    pub fn validate(&self) -> Result<()> {
        let rate = self.rate_limit.requests_per_second;
        if !rate.is_finite() || rate <= 0.0 {
            bail!("rate_limit.requests_per_second must be a positive number, got {}", rate);
        }
        if self.rate_limit.requests_per_minute == Some(0) {
            bail!("rate_limit.requests_per_minute must be at least 1");
        }
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            "Configuration saved successfully"
        );

        Ok(())
    }

    /// Get the absolute path for the data directory
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data.root_dir)
    }

    /// Get the absolute path for the log directory
    pub fn log_dir(&self) -> PathBuf {
        let log_path = Path::new(&self.logging.log_dir);
        if log_path.is_absolute() {
            log_path.to_path_buf()
        } else {
            self.data_dir().join(log_path)
        }
    }

    /// Base URL of the active backend
    pub fn base_url(&self) -> &str {
        match self.upstream.backend {
            Backend::Jikan => &self.upstream.jikan_base_url,
            Backend::Aniwatch => &self.upstream.aniwatch_base_url,
        }
    }

    /// Freshness window for cached responses
    pub fn cache_freshness(&self) -> Duration {
        Duration::from_secs(self.cache.freshness_seconds)
    }

    /// Network timeout, if one is configured
    pub fn request_timeout(&self) -> Option<Duration> {
        self.upstream.timeout_seconds.map(Duration::from_secs)
    }

    /// Fixed post-fetch pause, if enabled
    pub fn post_fetch_pause(&self) -> Option<Duration> {
        self.rate_limit.post_fetch_pause_ms.map(Duration::from_millis)
    }
}
