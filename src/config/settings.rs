//! Application settings
//!
//! Settings are separate from the play configuration: they carry the config
//! version this build accepts and an optional development block that
//! supplies default file paths for `play`.
//!
//! ## Lookup order
//!
//! 1. An explicit `--settings` path (must exist)
//! 2. `midi-sender.yaml` in the current working directory
//! 3. `<config dir>/midi-sender/settings.yaml` (`%APPDATA%`, `~/.config`, ...)
//! 4. Built-in defaults

use crate::error::{PlayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Application name used for the per-user config directory
const APP_DIR: &str = "midi-sender";
/// Settings file name looked up in the working directory
const CWD_SETTINGS_FILE: &str = "midi-sender.yaml";

/// Root settings structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppSettings {
    #[serde(default)]
    pub play: PlaySettings,
    #[serde(default)]
    pub dev: DevSettings,
}

/// Play command settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaySettings {
    /// Config document version accepted by this build
    #[serde(default = "default_config_version")]
    pub config_version: String,
}

/// Development defaults for the `play` command
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DevSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midi_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

impl Default for PlaySettings {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
        }
    }
}

impl AppSettings {
    /// Resolve and load settings, falling back to defaults
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !fs::try_exists(path).await.unwrap_or(false) {
                    return Err(PlayError::SettingsError(format!(
                        "Settings file not found: {}",
                        path.display()
                    )));
                }
                Some(path.to_path_buf())
            }
            None => Self::detect_path(),
        };

        let Some(path) = path else {
            debug!("No settings file found, using defaults");
            return Ok(Self::default());
        };

        let contents = fs::read_to_string(&path).await.map_err(|e| {
            PlayError::SettingsError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let settings = Self::from_yaml(&contents).map_err(|e| {
            PlayError::SettingsError(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        info!("Settings loaded from {}", path.display());
        Ok(settings)
    }

    pub fn from_yaml(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// First existing settings file in the lookup order
    fn detect_path() -> Option<PathBuf> {
        let cwd_settings = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(CWD_SETTINGS_FILE);
        if cwd_settings.exists() {
            return Some(cwd_settings);
        }

        let user_settings = dirs::config_dir()?.join(APP_DIR).join("settings.yaml");
        user_settings.exists().then_some(user_settings)
    }

    /// Development default for the MIDI file, if the dev block is enabled
    pub fn dev_midi_file(&self) -> Option<&Path> {
        self.dev
            .enabled
            .then_some(self.dev.midi_file.as_deref())
            .flatten()
    }

    /// Development default for the config file, if the dev block is enabled
    pub fn dev_config_file(&self) -> Option<&Path> {
        self.dev
            .enabled
            .then_some(self.dev.config_file.as_deref())
            .flatten()
    }
}

// Default value functions
fn default_config_version() -> String { "1.0".to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = AppSettings::default();
        assert_eq!(settings.play.config_version, "1.0");
        assert!(!settings.dev.enabled);
        assert_eq!(settings.dev_midi_file(), None);
    }

    #[test]
    fn test_partial_document_uses_defaults() {
        let settings = AppSettings::from_yaml("dev:\n  enabled: true\n  midi_file: song.mid\n").unwrap();
        assert_eq!(settings.play.config_version, "1.0");
        assert_eq!(settings.dev_midi_file(), Some(Path::new("song.mid")));
        assert_eq!(settings.dev_config_file(), None);
    }

    #[test]
    fn test_dev_paths_ignored_when_disabled() {
        let yaml = "play:\n  config_version: \"2.0\"\ndev:\n  enabled: false\n  midi_file: song.mid\n  config_file: show.yaml\n";
        let settings = AppSettings::from_yaml(yaml).unwrap();
        assert_eq!(settings.play.config_version, "2.0");
        assert_eq!(settings.dev_midi_file(), None);
        assert_eq!(settings.dev_config_file(), None);
    }

    #[tokio::test]
    async fn test_explicit_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppSettings::load(Some(&dir.path().join("missing.yaml"))).await;
        assert!(matches!(result, Err(PlayError::SettingsError(_))));
    }

    #[tokio::test]
    async fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, "play:\n  config_version: \"1.1\"\n").unwrap();

        let settings = AppSettings::load(Some(&path)).await.unwrap();
        assert_eq!(settings.play.config_version, "1.1");
    }
}
