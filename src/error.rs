//! Error kinds for setup and playback
//!
//! Every setup-phase error is fatal and surfaces before any device is started.
//! Each kind maps to a distinct process exit code.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, PlayError>;

#[derive(Error, Debug)]
pub enum PlayError {
    #[error("Config file not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("Config file error in {}: {message}", path.display())]
    ConfigParseError { path: PathBuf, message: String },

    #[error("Config file has incompatible version! Required: {required}, presented: {presented}")]
    ConfigVersionMismatch { required: String, presented: String },

    #[error("MIDI file not found: {}", path.display())]
    TimelineFileNotFound { path: PathBuf },

    #[error("Failed to parse MIDI file {}: {message}", path.display())]
    TimelineParseError { path: PathBuf, message: String },

    #[error("Unknown device type '{device_type}' for device '{device}'")]
    UnknownDeviceType { device: String, device_type: String },

    #[error("No devices were created, check your config")]
    NoDevicesConfigured,

    #[error("Device name '{0}' is configured more than once")]
    DuplicateDeviceName(String),

    #[error("No device found with name '{0}'")]
    UnknownDeviceReference(String),

    #[error("Invalid note identity: {0}")]
    InvalidNoteIdentity(String),

    #[error("Invalid endpoint '{endpoint}' for device '{device}': {reason}")]
    InvalidEndpointSyntax {
        device: String,
        endpoint: String,
        reason: String,
    },

    #[error("Schedule compensation interrupted at tick {tick} of track {track}")]
    SchedulingInterrupted { track: usize, tick: u64 },

    #[error("Failed to start device '{device}': {message}")]
    DeviceStartFailed { device: String, message: String },

    #[error("Failed to stop {} device(s): {}", .0.len(), .0.join(", "))]
    DeviceStopFailed(Vec<String>),

    #[error("Settings error: {0}")]
    SettingsError(String),
}

impl PlayError {
    /// Process exit code for this error kind
    pub fn exit_code(&self) -> u8 {
        match self {
            PlayError::ConfigNotFound { .. } => 10,
            PlayError::ConfigParseError { .. } => 11,
            PlayError::ConfigVersionMismatch { .. } => 12,
            PlayError::TimelineFileNotFound { .. } => 20,
            PlayError::TimelineParseError { .. } => 21,
            PlayError::UnknownDeviceType { .. } => 30,
            PlayError::NoDevicesConfigured => 31,
            PlayError::UnknownDeviceReference(_) => 32,
            PlayError::DuplicateDeviceName(_) => 33,
            PlayError::InvalidNoteIdentity(_) => 40,
            PlayError::InvalidEndpointSyntax { .. } => 41,
            PlayError::SchedulingInterrupted { .. } => 50,
            PlayError::DeviceStartFailed { .. } => 60,
            PlayError::DeviceStopFailed(_) => 61,
            PlayError::SettingsError(_) => 70,
        }
    }
}
