//! Configuration for a Code Awareness session.
//!
//! Loads `config.toml` from the nearest `.caw/` directory (see [`discover`]),
//! with optional CLI override.
//!
//! 1. The host calls [`discover`] with the workspace folder
//! 2. [`Config::load_with_overrides`] picks the path: CLI override > discovered > embedded defaults
//! 3. The [`Config`] is handed to [`Session::new`](crate::Session::new)

use anyhow::{Context, Result};
use caw_tracker::LineEnding;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

/// Session configuration, loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Milliseconds between background diff syncs of the active file.
    ///
    /// Defaults to 100 seconds; peers rarely change faster than that.
    #[serde(default = "default_sync_interval_ms")]
    pub sync_interval_ms: u64,

    /// Minimum milliseconds between two diff requests for the same file.
    #[serde(default = "default_sync_threshold_ms")]
    pub sync_threshold_ms: u64,

    /// Which sequences count as line breaks when reducing host changes.
    pub line_endings: LineEnding,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync_interval_ms: default_sync_interval_ms(),
            sync_threshold_ms: default_sync_threshold_ms(),
            line_endings: LineEnding::default(),
        }
    }
}

fn default_sync_interval_ms() -> u64 {
    100_000
}

fn default_sync_threshold_ms() -> u64 {
    1_000
}

impl Config {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn sync_threshold(&self) -> Duration {
        Duration::from_millis(self.sync_threshold_ms)
    }

    /// Read and deserialize a TOML config file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration with priority: CLI override > discovered path > defaults.
    pub fn load_with_overrides(
        cli_override: Option<&Path>,
        discovered_path: Option<&Path>,
    ) -> Result<Self> {
        if let Some(path) = cli_override.or(discovered_path) {
            return Self::load(path);
        }
        Self::load_embedded()
    }

    fn load_embedded() -> Result<Self> {
        let source = include_str!("../config.toml");
        toml::from_str(source).context("Failed to parse embedded config.toml")
    }
}

/// Find the `config.toml` that applies to `start_dir`.
///
/// Walks up from `start_dir` looking for `.caw/config.toml`, then falls back
/// to `<config_dir>/caw/config.toml`.
pub fn discover(start_dir: &Path) -> Option<PathBuf> {
    let found = start_dir
        .ancestors()
        .map(|dir| dir.join(".caw").join("config.toml"))
        .find(|candidate| candidate.is_file());

    if let Some(path) = found {
        tracing::info!("found project config: {}", path.display());
        return Some(path);
    }

    let system = dirs::config_dir()?.join("caw").join("config.toml");
    if system.is_file() {
        tracing::info!("using system config: {}", system.display());
        Some(system)
    } else {
        tracing::debug!("no config.toml found for {}", start_dir.display());
        None
    }
}
