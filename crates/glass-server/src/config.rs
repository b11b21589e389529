//! Relay configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Feed visibility and eviction settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Network configuration for the listener.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Longest wait for a single read before the connection is dropped.
    /// Zero disables the timeout.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// How long events stay on screen and how often expired ones are swept.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Visibility window measured from local arrival.
    #[serde(default = "default_visibility_window_ms")]
    pub visibility_window_ms: u64,

    /// Interval between eviction sweeps.
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "glass_server=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    glass_types::DEFAULT_PORT
}

fn default_read_timeout_ms() -> u64 {
    5_000
}

fn default_visibility_window_ms() -> u64 {
    glass_types::VISIBILITY_WINDOW.as_millis() as u64
}

fn default_sweep_interval_ms() -> u64 {
    glass_types::SWEEP_INTERVAL.as_millis() as u64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            visibility_window_ms: default_visibility_window_ms(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl ServerConfig {
    /// The address the listener binds to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Per-read timeout, or `None` when disabled.
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }
}

impl FeedConfig {
    /// Visibility window as a duration.
    pub fn visibility_window(&self) -> Duration {
        Duration::from_millis(self.visibility_window_ms)
    }

    /// Sweep interval as a duration, never shorter than one millisecond.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `GLASS_HOST` overrides `server.host`
/// - `GLASS_PORT` overrides `server.port`
/// - `GLASS_READ_TIMEOUT_MS` overrides `server.read_timeout_ms`
/// - `GLASS_LOG_LEVEL` overrides `logging.level`
/// - `GLASS_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies `GLASS_*` overrides read through `lookup`.
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(parsed) = lookup("GLASS_HOST").and_then(|v| v.parse().ok()) {
        config.server.host = parsed;
    }
    if let Some(parsed) = lookup("GLASS_PORT").and_then(|v| v.parse().ok()) {
        config.server.port = parsed;
    }
    if let Some(parsed) = lookup("GLASS_READ_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.server.read_timeout_ms = parsed;
    }
    if let Some(level) = lookup("GLASS_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("GLASS_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
