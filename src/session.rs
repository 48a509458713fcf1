//! Play session - one playback invocation from config to device shutdown
//!
//! A session owns everything a run needs (settings, device factory, and the
//! registry and router it builds), so nothing leaks from one run into the
//! next. Setup happens in a fixed order and every failure aborts before a
//! single device is started:
//!
//! 1. load the play config and check its version
//! 2. load the MIDI file
//! 3. create devices
//! 4. build note bindings
//!
//! Devices are then started, the timeline is played, and every device is
//! stopped again whatever the playback result.

use crate::config::{AppSettings, PlayConfig};
use crate::devices::{DeviceFactory, DeviceRegistry};
use crate::error::Result;
use crate::router::NoteRouter;
use crate::scheduler::{PlaybackReport, PlaybackScheduler, StopSignal};
use crate::timeline::Timeline;
use std::path::Path;
use tracing::{info, warn};

/// Devices and bindings built from a validated config
pub struct SessionSetup {
    pub devices: DeviceRegistry,
    pub router: NoteRouter,
}

/// Per-invocation playback session
pub struct PlaySession {
    settings: AppSettings,
    factory: DeviceFactory,
}

impl PlaySession {
    /// Session with the built-in device types
    pub fn new(settings: AppSettings) -> Self {
        Self::with_factory(settings, DeviceFactory::default())
    }

    pub fn with_factory(settings: AppSettings, factory: DeviceFactory) -> Self {
        Self { settings, factory }
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Load the play config and reject incompatible versions
    pub async fn load_config(&self, config_path: &Path) -> Result<PlayConfig> {
        info!("Checking config file {}", config_path.display());
        let config = PlayConfig::load(config_path).await?;
        config.check_version(&self.settings.play.config_version)?;
        info!("Config file found (version {})", config.version);
        Ok(config)
    }

    /// Create devices and bindings without starting anything
    pub fn build(&self, config: &PlayConfig) -> Result<SessionSetup> {
        let devices = DeviceRegistry::from_config(&config.devices, &self.factory)?;
        let router = NoteRouter::from_mappings(&config.mappings, &devices)?;
        Ok(SessionSetup { devices, router })
    }

    /// Validate a config end to end without playing
    pub async fn check(&self, config_path: &Path) -> Result<SessionSetup> {
        let config = self.load_config(config_path).await?;
        self.build(&config)
    }

    /// Run a full playback
    pub async fn play(
        &self,
        config_path: &Path,
        midi_path: &Path,
        stop: StopSignal,
    ) -> Result<PlaybackReport> {
        let config = self.load_config(config_path).await?;

        info!("Checking MIDI file {}", midi_path.display());
        let timeline = Timeline::load(midi_path).await?;
        info!(
            "Found MIDI file ({} tracks, {} events)",
            timeline.tracks.len(),
            timeline.event_count()
        );

        let setup = self.build(&config)?;
        Self::run(&setup, &timeline, stop).await
    }

    /// Start devices, play, and stop devices on every exit path
    pub async fn run(
        setup: &SessionSetup,
        timeline: &Timeline,
        stop: StopSignal,
    ) -> Result<PlaybackReport> {
        setup.devices.start_all().await?;

        let result = PlaybackScheduler::new(&setup.router, stop)
            .play(timeline)
            .await;
        let stopped = setup.devices.stop_all().await;

        match (result, stopped) {
            (Ok(report), Ok(())) => {
                info!(
                    tracks = report.tracks_played,
                    batches = report.batches,
                    events = report.events,
                    dispatches = report.dispatches,
                    late_ticks = report.late_ticks,
                    max_lag_ms = report.max_lag.as_millis() as u64,
                    outcome = ?report.outcome,
                    "Playback finished"
                );
                Ok(report)
            }
            (Ok(_), Err(stop_err)) => Err(stop_err),
            (Err(play_err), Err(stop_err)) => {
                warn!("{}", stop_err);
                Err(play_err)
            }
            (Err(play_err), Ok(())) => Err(play_err),
        }
    }
}
