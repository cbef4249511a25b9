//! Settings file for the candlesync CLI.
//!
//! Settings are read from `--config <path>` or, if absent, from
//! `settings.json` in the platform config directory. Command-line flags
//! override file values.

use anyhow::{Context, Result};
use candlesync_lib::prelude::*;
use candlesync_lib::{BandParams, ClientConfig};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_FILE: &str = "settings.json";

/// Persistent CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    /// REST base URL of the data service.
    pub(crate) base_url: String,
    /// WebSocket URL of the push channel.
    pub(crate) push_url: String,
    /// Request timeout in seconds.
    pub(crate) timeout_secs: u64,
    /// Bars per page.
    pub(crate) page_size: usize,
    /// Retention bound of the series.
    pub(crate) max_retained: usize,
    /// Fast band period.
    pub(crate) fast_period: usize,
    /// Fast band multiplier.
    pub(crate) fast_multiplier: f64,
    /// Slow band period.
    pub(crate) slow_period: usize,
    /// Slow band multiplier.
    pub(crate) slow_multiplier: f64,
}

impl Default for Settings {
    fn default() -> Self {
        let engine = EngineConfig::default();
        let bands = BandSettings::default();
        Self {
            base_url: ClientConfig::default().base_url,
            push_url: PushConfig::default().url,
            timeout_secs: 30,
            page_size: engine.initial_page_size,
            max_retained: engine.max_retained,
            fast_period: bands.fast.period(),
            fast_multiplier: bands.fast.std_dev_multiplier(),
            slow_period: bands.slow.period(),
            slow_multiplier: bands.slow.std_dev_multiplier(),
        }
    }
}

impl Settings {
    /// Returns the default settings path, if the platform has one.
    pub(crate) fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "candlesync").map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
    }

    /// Loads settings from `path`, or from the default location.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        let settings: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file: {}", path.display()))?;
        settings.band_settings()?;
        Ok(settings)
    }

    /// Builds validated band settings.
    pub(crate) fn band_settings(&self) -> Result<BandSettings> {
        Ok(BandSettings {
            fast: BandParams::new(self.fast_period, self.fast_multiplier)
                .context("Invalid fast band")?,
            slow: BandParams::new(self.slow_period, self.slow_multiplier)
                .context("Invalid slow band")?,
        })
    }

    /// REST client configuration.
    pub(crate) fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.base_url).with_timeout(Duration::from_secs(self.timeout_secs))
    }

    /// Push channel configuration.
    pub(crate) fn push_config(&self) -> PushConfig {
        PushConfig::new(&self.push_url)
    }

    /// Engine configuration.
    pub(crate) fn engine_config(&self) -> Result<EngineConfig> {
        Ok(EngineConfig::default()
            .with_max_retained(self.max_retained)
            .with_page_size(self.page_size)
            .with_bands(self.band_settings()?))
    }
}
