//! Configuration management for MIDI Sender
//!
//! Handles loading and parsing of the YAML play configuration (devices and
//! note-to-endpoint mappings) and the application settings.

pub mod settings;

use crate::error::{PlayError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::debug;

pub use settings::{AppSettings, DevSettings, PlaySettings};

/// Root play configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlayConfig {
    pub version: String,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
    #[serde(default)]
    pub mappings: Vec<MappingConfig>,
}

/// Output device declaration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DeviceConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// Note-to-endpoint mapping
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MappingConfig {
    pub device: String,
    pub endpoint: String,
    pub channel: i32,
    pub note: String,
    pub octave: i32,
}

impl PlayConfig {
    /// Load the play configuration from a YAML file
    pub async fn load(path: &Path) -> Result<Self> {
        let exists = fs::try_exists(path)
            .await
            .map_err(|e| PlayError::ConfigParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if !exists {
            return Err(PlayError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let contents = fs::read_to_string(path)
            .await
            .map_err(|e| PlayError::ConfigParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let config = Self::from_yaml(&contents).map_err(|e| PlayError::ConfigParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        debug!(
            version = %config.version,
            devices = config.devices.len(),
            mappings = config.mappings.len(),
            "Parsed play config"
        );
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(contents)
    }

    /// The document version must equal the required version exactly
    pub fn check_version(&self, required: &str) -> Result<()> {
        if self.version != required {
            return Err(PlayError::ConfigVersionMismatch {
                required: required.to_string(),
                presented: self.version.clone(),
            });
        }
        Ok(())
    }
}
