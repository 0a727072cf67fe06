// Settings management and persistence
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::assets::DEFAULT_EXTENSION;
use crate::audio::ManagerOptions;
use crate::sound::SoundId;

/// Alert sound settings chosen in the settings dialog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    pub version: i32, // Settings schema version for future migrations
    pub sound: SoundId,
    pub volume: u8, // 0-100
    /// Directory or http(s) origin holding `sounds/`
    pub assets: String,
    pub extension: String,
    pub progress_interval_ms: u64,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            version: 1,
            sound: SoundId::AscendingChime,
            volume: 70,
            assets: "./public".to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            progress_interval_ms: 50,
        }
    }
}

impl AlertSettings {
    /// Get the settings file path
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = Self::get_settings_path(app_dir);

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;

        let settings: AlertSettings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings {:?}", path))?;

        info!(path = ?path, "Loaded settings");
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        fs::create_dir_all(app_dir).context("Failed to create settings directory")?;

        let path = Self::get_settings_path(app_dir);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write settings file {:?}", path))?;

        info!(path = ?path, "Saved settings");
        Ok(())
    }

    /// Volume limited to the 0-100 range the manager expects
    pub fn volume(&self) -> i32 {
        i32::from(self.volume.min(100))
    }

    pub fn manager_options(&self) -> ManagerOptions {
        ManagerOptions {
            progress_interval: Duration::from_millis(self.progress_interval_ms.max(1)),
        }
    }
}
