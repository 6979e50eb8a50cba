//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order by the service binary:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`SOLO_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing config file is not an error: a warning is logged and the compiled
//! defaults are used.

use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default HTTP port for solo-ap
pub const DEFAULT_PORT: u16 = 5790;

/// Default EventBus capacity
pub const DEFAULT_EVENT_CAPACITY: usize = 100;

/// Duration assumed by the silent backend when a track's length cannot be probed
pub const DEFAULT_SILENT_FALLBACK_SECS: u64 = 30;

/// Media backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Decode and play through an audio output device
    Device,
    /// No audio output; playback is timed by track duration
    Silent,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Device => write!(f, "device"),
            BackendKind::Silent => write!(f, "silent"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "device" => Ok(BackendKind::Device),
            "silent" => Ok(BackendKind::Silent),
            other => Err(Error::Config(format!(
                "Unknown backend '{}', expected 'device' or 'silent'",
                other
            ))),
        }
    }
}

/// Bootstrap configuration loaded from TOML file
///
/// Read once at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Folder that track ids are resolved against
    #[serde(default)]
    pub library_root: Option<PathBuf>,

    /// Media backend
    #[serde(default)]
    pub backend: Option<BackendKind>,

    /// EventBus capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            library_root: None,
            backend: None,
            event_capacity: default_event_capacity(),
            audio: AudioConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Audio backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Output device name (None = default device)
    #[serde(default)]
    pub device: Option<String>,

    /// Silent backend fallback duration in seconds
    #[serde(default = "default_silent_fallback_secs")]
    pub silent_fallback_secs: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            silent_fallback_secs: default_silent_fallback_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); unset uses the compiled default
    #[serde(default)]
    pub level: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

fn default_silent_fallback_secs() -> u64 {
    DEFAULT_SILENT_FALLBACK_SECS
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Compiled defaults for the current platform
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub library_root: PathBuf,
    pub backend: BackendKind,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let library_root = dirs::audio_dir()
            .or_else(|| dirs::home_dir().map(|h| h.join("Music")))
            .unwrap_or_else(|| PathBuf::from("./music"));

        Self {
            library_root,
            backend: BackendKind::Device,
            log_level: default_log_level(),
        }
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Parse TOML config text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
}

/// Locate the config file
///
/// An explicit path must exist. Without one, `<config_dir>/solo/config.toml`
/// is tried, then `/etc/solo/config.toml` on Linux.
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(Some(path.to_path_buf()));
        }
        return Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )));
    }

    if let Some(user_config) = dirs::config_dir().map(|d| d.join("solo").join("config.toml")) {
        if user_config.exists() {
            return Ok(Some(user_config));
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/solo/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }
    }

    Ok(None)
}

/// Load the bootstrap config, degrading to defaults when no file exists
///
/// Returns the path the config came from, if any. A file that exists but
/// fails to parse is still an error. Nothing is logged here since callers
/// load config before logging is initialized.
pub fn load_or_default(explicit: Option<&Path>) -> Result<(TomlConfig, Option<PathBuf>)> {
    match find_config_file(explicit)? {
        Some(path) => Ok((load_toml_config(&path)?, Some(path))),
        None => Ok((TomlConfig::default(), None)),
    }
}
