//! Output devices (relay boards, ...)
//!
//! Devices are created from their config by a type-tag factory table and
//! kept in a per-session registry. New device kinds register a constructor
//! with `DeviceFactory::register`; nothing else needs to change.

use crate::config::DeviceConfig;
use crate::error::{PlayError, Result};
use crate::note::NoteCommand;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod board;
#[cfg(test)]
pub(crate) mod recording;

pub use board::BoardDevice;

/// Device trait - all output device backends implement this
///
/// All methods take &self so devices can be shared as `Arc<dyn Device>`.
/// Backends use interior mutability for state.
#[async_trait]
pub trait Device: Send + Sync {
    /// Configuration the device was created from
    fn config(&self) -> &DeviceConfig;

    /// Device name (unique within a session)
    fn name(&self) -> &str {
        &self.config().name
    }

    /// Open the device (connect, open ports, ...)
    async fn start(&self) -> anyhow::Result<()>;

    /// Close the device
    async fn stop(&self) -> anyhow::Result<()>;

    /// Validate an endpoint name for this device
    ///
    /// Fails with `PlayError::InvalidEndpointSyntax`.
    fn check_endpoint(&self, endpoint: &str) -> Result<()>;

    /// Trigger an endpoint
    ///
    /// Errors are reported to the caller for logging only; they never stop
    /// playback.
    async fn call_endpoint(&self, endpoint: &str, command: NoteCommand) -> anyhow::Result<()>;
}

/// Constructor registered for a device type tag
pub type DeviceConstructor = Box<dyn Fn(DeviceConfig) -> Arc<dyn Device> + Send + Sync>;

/// Type tag → constructor table
pub struct DeviceFactory {
    constructors: HashMap<String, DeviceConstructor>,
}

impl DeviceFactory {
    /// Factory with no registered device types
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register a constructor for a type tag, replacing any previous one
    pub fn register<F>(&mut self, device_type: impl Into<String>, constructor: F)
    where
        F: Fn(DeviceConfig) -> Arc<dyn Device> + Send + Sync + 'static,
    {
        self.constructors
            .insert(device_type.into(), Box::new(constructor));
    }

    /// Create a device from its config (exact type tag match)
    pub fn create(&self, config: DeviceConfig) -> Result<Arc<dyn Device>> {
        let constructor = self.constructors.get(&config.device_type).ok_or_else(|| {
            PlayError::UnknownDeviceType {
                device: config.name.clone(),
                device_type: config.device_type.clone(),
            }
        })?;
        Ok(constructor(config))
    }
}

/// Factory with the built-in device types
impl Default for DeviceFactory {
    fn default() -> Self {
        let mut factory = Self::empty();
        factory.register(board::TYPE_TAG, |config| -> Arc<dyn Device> {
            Arc::new(BoardDevice::new(config))
        });
        factory.register(board::LEGACY_TYPE_TAG, |config| -> Arc<dyn Device> {
            Arc::new(BoardDevice::new(config))
        });
        factory
    }
}

/// Devices of one session, by name, in configuration order
pub struct DeviceRegistry {
    devices: Vec<Arc<dyn Device>>,
    by_name: HashMap<String, usize>,
}

impl DeviceRegistry {
    /// Create every configured device
    ///
    /// Fails on the first unknown type or duplicate name, and when no device
    /// was created at all.
    pub fn from_config(configs: &[DeviceConfig], factory: &DeviceFactory) -> Result<Self> {
        let mut devices: Vec<Arc<dyn Device>> = Vec::with_capacity(configs.len());
        let mut by_name = HashMap::with_capacity(configs.len());

        for config in configs {
            if by_name.contains_key(&config.name) {
                return Err(PlayError::DuplicateDeviceName(config.name.clone()));
            }

            let device = factory.create(config.clone())?;
            info!(
                "Created {} device '{}'",
                config.device_type, config.name
            );
            by_name.insert(config.name.clone(), devices.len());
            devices.push(device);
        }

        info!("Created {} devices", devices.len());
        if devices.is_empty() {
            return Err(PlayError::NoDevicesConfigured);
        }

        Ok(Self { devices, by_name })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Device>> {
        self.by_name.get(name).map(|&idx| &self.devices[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Device>> {
        self.devices.iter()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Start all devices in configuration order
    ///
    /// If a device fails to start, the devices already started are stopped
    /// again before the error is returned.
    pub async fn start_all(&self) -> Result<()> {
        for (idx, device) in self.devices.iter().enumerate() {
            debug!("Starting device '{}'...", device.name());
            if let Err(e) = device.start().await {
                warn!("Failed to start device '{}': {}", device.name(), e);
                if let Err(stop_err) = Self::stop_devices(&self.devices[..idx]).await {
                    warn!("{}", stop_err);
                }
                return Err(PlayError::DeviceStartFailed {
                    device: device.name().to_string(),
                    message: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Stop all devices, attempting every device even if some fail
    pub async fn stop_all(&self) -> Result<()> {
        Self::stop_devices(&self.devices).await
    }

    async fn stop_devices(devices: &[Arc<dyn Device>]) -> Result<()> {
        let mut errors = Vec::new();
        for device in devices {
            debug!("Stopping device '{}'...", device.name());
            if let Err(e) = device.stop().await {
                warn!("Failed to stop device '{}': {}", device.name(), e);
                errors.push(format!("{}: {}", device.name(), e));
            }
        }

        if !errors.is_empty() {
            return Err(PlayError::DeviceStopFailed(errors));
        }
        Ok(())
    }
}
