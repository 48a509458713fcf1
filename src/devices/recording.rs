//! Recording device for tests

use crate::config::DeviceConfig;
use crate::devices::{Device, DeviceFactory};
use crate::error::{PlayError, Result};
use crate::note::NoteCommand;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const TYPE_TAG: &str = "recording";

/// One recorded endpoint call
#[derive(Debug, Clone)]
pub struct Call {
    pub device: String,
    pub endpoint: String,
    pub command: NoteCommand,
    pub at: Instant,
}

/// Shared log of calls and lifecycle events across devices
#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: Mutex<Vec<Call>>,
    pub starts: Mutex<Vec<String>>,
    pub stops: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn stops(&self) -> Vec<String> {
        self.stops.lock().clone()
    }

    pub fn starts(&self) -> Vec<String> {
        self.starts.lock().clone()
    }
}

/// Device that records everything; endpoints must start with `E`
pub struct RecordingDevice {
    config: DeviceConfig,
    recorder: Arc<Recorder>,
    /// Simulated processing time per call (advances a paused clock)
    lag: Option<Duration>,
}

impl RecordingDevice {
    pub fn new(config: DeviceConfig, recorder: Arc<Recorder>) -> Self {
        Self {
            config,
            recorder,
            lag: None,
        }
    }

    pub fn with_lag(mut self, lag: Duration) -> Self {
        self.lag = Some(lag);
        self
    }
}

#[async_trait]
impl Device for RecordingDevice {
    fn config(&self) -> &DeviceConfig {
        &self.config
    }

    async fn start(&self) -> anyhow::Result<()> {
        self.recorder.starts.lock().push(self.config.name.clone());
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.recorder.stops.lock().push(self.config.name.clone());
        Ok(())
    }

    fn check_endpoint(&self, endpoint: &str) -> Result<()> {
        if !endpoint.starts_with('E') {
            return Err(PlayError::InvalidEndpointSyntax {
                device: self.config.name.clone(),
                endpoint: endpoint.to_string(),
                reason: "must start with 'E'".to_string(),
            });
        }
        Ok(())
    }

    async fn call_endpoint(&self, endpoint: &str, command: NoteCommand) -> anyhow::Result<()> {
        self.recorder.calls.lock().push(Call {
            device: self.config.name.clone(),
            endpoint: endpoint.to_string(),
            command,
            at: Instant::now(),
        });
        if let Some(lag) = self.lag {
            tokio::time::advance(lag).await;
        }
        Ok(())
    }
}

pub fn device_config(name: &str, device_type: &str) -> DeviceConfig {
    DeviceConfig {
        name: name.to_string(),
        device_type: device_type.to_string(),
        options: BTreeMap::new(),
    }
}

/// Built-in factory plus the `recording` type, all sharing one recorder
pub fn recording_factory(recorder: Arc<Recorder>) -> DeviceFactory {
    let mut factory = DeviceFactory::default();
    factory.register(TYPE_TAG, move |config| -> Arc<dyn Device> {
        Arc::new(RecordingDevice::new(config, recorder.clone()))
    });
    factory
}
