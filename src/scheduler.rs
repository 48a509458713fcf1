//! Playback scheduler
//!
//! Replays a timeline against the note router in real time. Tracks are played
//! one after another. Within a track, events sharing a tick are collected into
//! a batch; when a later tick shows up the batch is executed and the scheduler
//! waits until the wall clock catches up with the new tick:
//!
//! ```text
//! estimated    = tick * ms_per_tick
//! actual       = now - track_start
//! compensation = estimated - actual   (> 0: sleep, <= 0: warn and go on)
//! ```
//!
//! Lag is never corrected by skipping events. The last batch of a track is
//! executed when the track ends.
//!
//! A stop request is checked between batches and ends playback cleanly. A
//! stop that arrives while the scheduler is sleeping interrupts the delay,
//! which fails playback with `PlayError::SchedulingInterrupted`.

use crate::error::{PlayError, Result};
use crate::note::NoteIdentity;
use crate::router::NoteRouter;
use crate::timeline::{EventKind, TimedEvent, Timeline, Track};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Create a connected stop handle and signal
pub fn stop_channel() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle(tx), StopSignal(rx))
}

/// Requests playback to stop
#[derive(Debug)]
pub struct StopHandle(watch::Sender<bool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.send_replace(true);
    }
}

/// Observed by the scheduler between batches and during delays
#[derive(Debug, Clone)]
pub struct StopSignal(watch::Receiver<bool>);

impl StopSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self(rx)
    }

    pub fn is_stopped(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once a stop is requested; pends forever if the handle is gone
    pub async fn stopped(&mut self) {
        let result = self.0.wait_for(|stopped| *stopped).await.map(|_| ());
        if result.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Wall-clock correction at a tick boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// Ahead of schedule: wait this long
    Wait(Duration),
    /// On time or late by this much: do not wait
    Behind(Duration),
}

/// Compensation for reaching `tick` after `elapsed` since track start
pub fn compensation(tick: u64, ms_per_tick: f64, elapsed: Duration) -> Compensation {
    let estimated_ns = (tick as f64 * ms_per_tick * 1_000_000.0).round() as i128;
    let actual_ns = elapsed.as_nanos() as i128;
    let compensation_ns = estimated_ns - actual_ns;

    if compensation_ns > 0 {
        Compensation::Wait(Duration::from_nanos(compensation_ns as u64))
    } else {
        Compensation::Behind(Duration::from_nanos(compensation_ns.unsigned_abs() as u64))
    }
}

/// How playback ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackOutcome {
    #[default]
    Completed,
    /// Stop requested between batches
    Stopped,
}

/// Summary of one playback run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackReport {
    pub tracks_played: usize,
    pub batches: usize,
    pub events: usize,
    pub dispatches: usize,
    pub late_ticks: usize,
    pub max_lag: Duration,
    pub outcome: PlaybackOutcome,
}

/// Events of one tick, executed together
struct TickBatch<'t> {
    tick: u64,
    events: Vec<&'t TimedEvent>,
}

enum TrackEnd {
    Done,
    Stopped,
}

/// Drives tick-by-tick execution of a timeline
pub struct PlaybackScheduler<'r> {
    router: &'r NoteRouter,
    stop: StopSignal,
}

impl<'r> PlaybackScheduler<'r> {
    pub fn new(router: &'r NoteRouter, stop: StopSignal) -> Self {
        Self { router, stop }
    }

    /// Play all tracks sequentially
    pub async fn play(&mut self, timeline: &Timeline) -> Result<PlaybackReport> {
        let ms_per_tick = timeline.ms_per_tick();
        info!(
            "Playing {} tracks ({} ticks, {} us, {:.3} ms per tick)",
            timeline.tracks.len(),
            timeline.total_ticks,
            timeline.total_micros,
            ms_per_tick
        );

        let mut report = PlaybackReport::default();
        for (idx, track) in timeline.tracks.iter().enumerate() {
            let track_number = idx + 1;
            if self.stop.is_stopped() {
                report.outcome = PlaybackOutcome::Stopped;
                break;
            }

            info!(
                "Track {}{}: size = {}",
                track_number,
                track
                    .name
                    .as_deref()
                    .map(|n| format!(" ({})", n))
                    .unwrap_or_default(),
                track.events.len()
            );

            match self
                .play_track(track_number, track, ms_per_tick, &mut report)
                .await?
            {
                TrackEnd::Done => report.tracks_played += 1,
                TrackEnd::Stopped => {
                    report.outcome = PlaybackOutcome::Stopped;
                    break;
                }
            }
        }

        if report.outcome == PlaybackOutcome::Stopped {
            info!("Playback stopped on request");
        }
        Ok(report)
    }

    async fn play_track<'t>(
        &mut self,
        track_number: usize,
        track: &'t Track,
        ms_per_tick: f64,
        report: &mut PlaybackReport,
    ) -> Result<TrackEnd> {
        let track_start = Instant::now();
        let mut batch = TickBatch {
            tick: 0,
            events: Vec::new(),
        };

        for event in &track.events {
            if event.tick > batch.tick {
                self.flush(&mut batch, report).await;

                if self.stop.is_stopped() {
                    return Ok(TrackEnd::Stopped);
                }

                match compensation(event.tick, ms_per_tick, track_start.elapsed()) {
                    Compensation::Wait(delay) => {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = self.stop.stopped() => {
                                return Err(PlayError::SchedulingInterrupted {
                                    track: track_number,
                                    tick: event.tick,
                                });
                            }
                        }
                    }
                    Compensation::Behind(lag) => {
                        warn!(
                            "Tick execution too slow! {} ms behind schedule (track {}, tick {})",
                            lag.as_millis(),
                            track_number,
                            event.tick
                        );
                        report.late_ticks += 1;
                        report.max_lag = report.max_lag.max(lag);
                    }
                }

                batch.tick = event.tick;
            }
            batch.events.push(event);
        }

        // Trailing batch: no later tick will flush it
        self.flush(&mut batch, report).await;
        Ok(TrackEnd::Done)
    }

    /// Execute and clear a batch
    async fn flush(&self, batch: &mut TickBatch<'_>, report: &mut PlaybackReport) {
        if batch.events.is_empty() {
            return;
        }
        debug!("Tick {} ({} events)", batch.tick, batch.events.len());

        for event in batch.events.drain(..) {
            report.events += 1;
            report.dispatches += self.execute(event).await;
        }
        report.batches += 1;
    }

    /// Dispatch one event, returning the number of endpoint calls
    async fn execute(&self, event: &TimedEvent) -> usize {
        let EventKind::Midi(message) = &event.kind else {
            debug!("Other message: {}", event.kind);
            return 0;
        };
        let Some((command, key)) = message.note_command() else {
            debug!("Command: {}", message);
            return 0;
        };

        let identity = match NoteIdentity::from_key(message.channel(), key) {
            Ok(identity) => identity,
            Err(e) => {
                warn!("Skipping {}: {}", message, e);
                return 0;
            }
        };

        debug!(
            "Channel: {} {} {}{} key={}",
            message.channel(),
            command,
            identity.note(),
            identity.octave(),
            key
        );
        self.router.dispatch(&identity, command).await
    }
}
