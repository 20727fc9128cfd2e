//! TOML-based configuration for the camlink host.
//!
//! Reads and writes [`AppConfig`] at the platform-appropriate location:
//! - Windows:  `%APPDATA%\Camlink\config.toml`
//! - Linux:    `~/.config/camlink/config.toml` (or `$XDG_CONFIG_HOME`)
//! - macOS:    `~/Library/Application Support/Camlink/config.toml`
//!
//! A missing file means "all defaults", so camlink runs with no setup:
//!
//! ```toml
//! [output]
//! width = 1920
//! height = 1080
//! fps = 30
//! device = "/dev/video10"
//! pixel_format = "yuyv"
//!
//! [network]
//! port = 6000
//! subnets = ["192.168.1.", "192.168.0.", "192.168.8.", "10.0.0."]
//! static_addresses = ["172.16.4.20"]
//!
//! [logging]
//! log_level = "info"
//! ```
//!
//! Every field carries `#[serde(default = "...")]`, so a file that sets only
//! `device` is valid.
//!
//! Durations are stored as integer seconds or milliseconds (the unit is in
//! the field name) and converted to [`Duration`] by [`AppConfig::scan_config`],
//! [`AppConfig::receiver_config`] and [`AppConfig::output_settings`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use camlink_core::EndpointId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::infrastructure::network::receiver::ReceiverConfig;
use crate::infrastructure::network::scanner::{default_subnets, ScanConfig};
use crate::infrastructure::output::{OutputFormat, OutputSettings};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The config parsed but a value is out of range.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Virtual camera output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    /// Canvas width in pixels.
    #[serde(default = "default_width")]
    pub width: u32,
    /// Canvas height in pixels.
    #[serde(default = "default_height")]
    pub height: u32,
    /// Output frame rate.
    #[serde(default = "default_fps")]
    pub fps: u32,
    /// v4l2loopback device node.  Absent means headless (frames are
    /// composed and paced but not written anywhere).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Pixel format written to the device: `"yuyv"` or `"rgb24"`.
    #[serde(default)]
    pub pixel_format: OutputFormat,
    /// Seconds to wait before reopening a failed device.
    #[serde(default = "default_reopen_backoff_secs")]
    pub reopen_backoff_secs: u64,
}

/// Discovery and receiver settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// TCP port the phones stream on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Subnet prefixes swept each scan pass.
    #[serde(default = "default_subnets")]
    pub subnets: Vec<String>,
    /// Addresses connected to at startup regardless of discovery.
    #[serde(default)]
    pub static_addresses: Vec<String>,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Maximum concurrent discovery probes.
    #[serde(default = "default_probe_concurrency")]
    pub probe_concurrency: usize,
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Wait after a scan pass that failed unexpectedly.
    #[serde(default = "default_scan_retry_secs")]
    pub scan_retry_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Fixed wait between a disconnect and the next connect attempt.
    #[serde(default = "default_reconnect_backoff_secs")]
    pub reconnect_backoff_secs: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset, e.g. `"info"` or
    /// `"camlink_host=debug"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_width() -> u32 {
    1920
}
fn default_height() -> u32 {
    1080
}
fn default_fps() -> u32 {
    30
}
fn default_reopen_backoff_secs() -> u64 {
    2
}
fn default_port() -> u16 {
    6000
}
fn default_probe_timeout_ms() -> u64 {
    100
}
fn default_probe_concurrency() -> usize {
    50
}
fn default_scan_interval_secs() -> u64 {
    15
}
fn default_scan_retry_secs() -> u64 {
    5
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_reconnect_backoff_secs() -> u64 {
    2
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            device: None,
            pixel_format: OutputFormat::default(),
            reopen_backoff_secs: default_reopen_backoff_secs(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            subnets: default_subnets(),
            static_addresses: Vec::new(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_concurrency: default_probe_concurrency(),
            scan_interval_secs: default_scan_interval_secs(),
            scan_retry_secs: default_scan_retry_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            reconnect_backoff_secs: default_reconnect_backoff_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ── Validation and conversion ─────────────────────────────────────────────────

impl AppConfig {
    /// Rejects values the runtime cannot work with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, reason: &str| {
            Err(ConfigError::Invalid {
                field,
                reason: reason.to_string(),
            })
        };

        if self.output.width == 0 || self.output.height == 0 {
            return invalid("output.width/height", "resolution must be non-zero");
        }
        if self.output.fps == 0 {
            return invalid("output.fps", "frame rate must be at least 1");
        }
        if self.output.pixel_format == OutputFormat::Yuyv && self.output.width % 2 != 0 {
            return invalid("output.width", "YUYV output requires an even width");
        }
        if self.network.port == 0 {
            return invalid("network.port", "port must be non-zero");
        }
        if self.network.probe_concurrency == 0 {
            return invalid("network.probe_concurrency", "must be at least 1");
        }
        if self.network.probe_timeout_ms == 0 {
            return invalid("network.probe_timeout_ms", "must be at least 1");
        }
        if self.network.connect_timeout_secs == 0 {
            return invalid("network.connect_timeout_secs", "must be at least 1");
        }
        if self.network.reconnect_backoff_secs == 0 {
            return invalid("network.reconnect_backoff_secs", "must be at least 1");
        }
        Ok(())
    }

    /// Discovery settings.
    pub fn scan_config(&self) -> ScanConfig {
        let net = &self.network;
        ScanConfig {
            port: net.port,
            subnets: net.subnets.clone(),
            static_addresses: net
                .static_addresses
                .iter()
                .filter(|addr| !addr.trim().is_empty())
                .map(|addr| EndpointId::new(addr.as_str()))
                .collect(),
            probe_timeout: Duration::from_millis(net.probe_timeout_ms),
            concurrency: net.probe_concurrency,
            scan_interval: Duration::from_secs(net.scan_interval_secs),
            retry_backoff: Duration::from_secs(net.scan_retry_secs),
        }
    }

    /// Per-endpoint receiver settings.
    pub fn receiver_config(&self) -> ReceiverConfig {
        ReceiverConfig {
            port: self.network.port,
            connect_timeout: Duration::from_secs(self.network.connect_timeout_secs),
            reconnect_backoff: Duration::from_secs(self.network.reconnect_backoff_secs),
        }
    }

    /// Output sink settings.
    pub fn output_settings(&self) -> OutputSettings {
        let out = &self.output;
        OutputSettings {
            width: out.width,
            height: out.height,
            fps: out.fps,
            device: out.device.as_deref().map(PathBuf::from),
            format: out.pixel_format,
            reopen_backoff: Duration::from_secs(out.reopen_backoff_secs),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads the config from the default location.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads and validates `AppConfig` from `path`, returning
/// `AppConfig::default()` if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Invalid`] if a value is out of range.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let cfg = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str::<AppConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

/// Persists `config` to the default location.
///
/// # Errors
///
/// See [`save_config_to`].
pub fn save_config(config: &AppConfig) -> Result<PathBuf, ConfigError> {
    let path = config_file_path()?;
    save_config_to(config, &path)?;
    Ok(path)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config base directory including the `camlink`
/// subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Camlink"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("camlink"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support").join("Camlink"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
