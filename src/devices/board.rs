//! Board device - relay board backend that logs endpoint calls
//!
//! There is no hardware transport yet: every call is written to the log,
//! which makes the device useful for rehearsing a show without a board.

use crate::config::DeviceConfig;
use crate::devices::Device;
use crate::error::{PlayError, Result};
use crate::note::NoteCommand;
use anyhow::Result as AnyResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Type tag of the board device
pub const TYPE_TAG: &str = "board";
/// Older configs name the board after its microcontroller
pub const LEGACY_TYPE_TAG: &str = "Arduino";

/// Relay board addressed by endpoints such as `R1`..`R16`
pub struct BoardDevice {
    config: DeviceConfig,
    /// Track if the board is started
    started: Arc<RwLock<bool>>,
    /// Endpoint call counter
    call_count: Arc<RwLock<u64>>,
}

impl BoardDevice {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            config,
            started: Arc::new(RwLock::new(false)),
            call_count: Arc::new(RwLock::new(0)),
        }
    }

    pub async fn call_count(&self) -> u64 {
        *self.call_count.read().await
    }
}

#[async_trait]
impl Device for BoardDevice {
    fn config(&self) -> &DeviceConfig {
        &self.config
    }

    async fn start(&self) -> AnyResult<()> {
        info!("Starting board device '{}'", self.config.name);
        if !self.config.options.is_empty() {
            debug!(device = %self.config.name, options = ?self.config.options, "Board options");
        }

        *self.started.write().await = true;
        *self.call_count.write().await = 0;
        Ok(())
    }

    async fn stop(&self) -> AnyResult<()> {
        let was_started = *self.started.read().await;
        if was_started {
            info!(
                "Stopping board device '{}' ({} endpoint calls)",
                self.config.name,
                self.call_count().await
            );
        }

        *self.started.write().await = false;
        Ok(())
    }

    /// Endpoints must contain an `R` (e.g. `R1`, `R16`)
    fn check_endpoint(&self, endpoint: &str) -> Result<()> {
        if !endpoint.contains('R') {
            return Err(PlayError::InvalidEndpointSyntax {
                device: self.config.name.clone(),
                endpoint: endpoint.to_string(),
                reason: "board endpoints must contain 'R' (examples: R1, R2, R16)".to_string(),
            });
        }
        Ok(())
    }

    async fn call_endpoint(&self, endpoint: &str, command: NoteCommand) -> AnyResult<()> {
        if !*self.started.read().await {
            warn!(
                "Board '{}' not started, skipping endpoint {}",
                self.config.name, endpoint
            );
            return Ok(());
        }

        let mut count = self.call_count.write().await;
        *count += 1;
        let call_num = *count;
        drop(count);

        info!(
            "[{}] Board '{}' endpoint {} emitted {} [call #{}]",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            self.config.name,
            endpoint,
            command,
            call_num
        );

        Ok(())
    }
}
