//! solo-ap configuration
//!
//! Settings are merged in priority order:
//! 1. Command-line arguments
//! 2. Environment variables (`SOLO_PORT`, `SOLO_LIBRARY`, ...; clap merges
//!    these with the arguments)
//! 3. TOML config file
//! 4. Compiled defaults

use clap::Parser;
use solo_common::config::{BackendKind, CompiledDefaults, TomlConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for solo-ap
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "solo-ap")]
#[command(about = "Single-active-track audio playback service")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "SOLO_PORT")]
    pub port: Option<u16>,

    /// Folder that track ids are resolved against
    #[arg(short, long, env = "SOLO_LIBRARY")]
    pub library: Option<PathBuf>,

    /// Config file (default: <config dir>/solo/config.toml)
    #[arg(short, long, env = "SOLO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Media backend: device or silent
    #[arg(short, long, env = "SOLO_BACKEND")]
    pub backend: Option<BackendKind>,

    /// Audio output device name
    #[arg(short, long, env = "SOLO_DEVICE")]
    pub device: Option<String>,
}

/// Resolved solo-ap configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub library_root: PathBuf,
    pub backend: BackendKind,
    pub device: Option<String>,
    pub silent_fallback: Duration,
    pub event_capacity: usize,
    pub log_level: String,
}

impl Config {
    pub fn resolve(args: &Args, toml: &TomlConfig, defaults: &CompiledDefaults) -> Self {
        Self {
            port: args.port.unwrap_or(toml.port),
            library_root: args
                .library
                .clone()
                .or_else(|| toml.library_root.clone())
                .unwrap_or_else(|| defaults.library_root.clone()),
            backend: args.backend.or(toml.backend).unwrap_or(defaults.backend),
            device: args.device.clone().or_else(|| toml.audio.device.clone()),
            silent_fallback: Duration::from_secs(toml.audio.silent_fallback_secs),
            event_capacity: toml.event_capacity.max(1),
            log_level: toml
                .logging
                .level
                .clone()
                .unwrap_or_else(|| defaults.log_level.clone()),
        }
    }
}
