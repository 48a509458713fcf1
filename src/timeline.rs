//! Timeline model and Standard MIDI File loading
//!
//! Converts a `midly` file into per-track sequences of events with absolute
//! tick positions, plus the summary timing used by the scheduler.

use crate::error::{PlayError, Result};
use crate::midi::MidiMessage;
use midly::{MetaMessage, Smf, Timing, TrackEventKind};
use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Tempo assumed until the first set-tempo event (120 BPM)
pub const DEFAULT_TEMPO_US_PER_QUARTER: u32 = 500_000;

/// Payload of a timeline event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Channel message
    Midi(MidiMessage),
    /// System exclusive data (length only)
    SysEx { len: usize },
    /// Meta event, described for logging
    Meta(String),
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Midi(msg) => write!(f, "{}", msg),
            EventKind::SysEx { len } => write!(f, "SysEx {} bytes", len),
            EventKind::Meta(desc) => write!(f, "Meta {}", desc),
        }
    }
}

/// Event at an absolute tick position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimedEvent {
    pub tick: u64,
    pub kind: EventKind,
}

impl TimedEvent {
    pub fn midi(tick: u64, message: MidiMessage) -> Self {
        Self {
            tick,
            kind: EventKind::Midi(message),
        }
    }
}

/// One track: events ordered by tick
#[derive(Debug, Clone, Default)]
pub struct Track {
    pub name: Option<String>,
    pub events: Vec<TimedEvent>,
}

impl Track {
    pub fn new(events: Vec<TimedEvent>) -> Self {
        Self { name: None, events }
    }

    /// Tick of the last event (the track's length)
    pub fn end_tick(&self) -> u64 {
        self.events.last().map(|e| e.tick).unwrap_or(0)
    }
}

/// Decoded timeline with summary timing
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    pub tracks: Vec<Track>,
    pub total_ticks: u64,
    pub total_micros: u64,
}

impl Timeline {
    /// Build a timeline from tracks and a known duration
    pub fn new(tracks: Vec<Track>, total_micros: u64) -> Self {
        let total_ticks = tracks.iter().map(Track::end_tick).max().unwrap_or(0);
        Self {
            tracks,
            total_ticks,
            total_micros,
        }
    }

    /// Load and decode a MIDI file
    pub async fn load(path: &Path) -> Result<Self> {
        let exists = fs::try_exists(path)
            .await
            .map_err(|e| PlayError::TimelineParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if !exists {
            return Err(PlayError::TimelineFileNotFound {
                path: path.to_path_buf(),
            });
        }

        let bytes = fs::read(path)
            .await
            .map_err(|e| PlayError::TimelineParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Self::from_bytes(&bytes).map_err(|e| PlayError::TimelineParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Decode a MIDI file held in memory
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, midly::Error> {
        let smf = Smf::parse(bytes)?;
        Ok(Self::from_smf(&smf))
    }

    pub fn from_smf(smf: &Smf) -> Self {
        let mut tempo_changes: Vec<(u64, u32)> = Vec::new();
        let mut tracks = Vec::with_capacity(smf.tracks.len());

        for raw in &smf.tracks {
            let mut track = Track::default();
            let mut tick: u64 = 0;

            for event in raw {
                tick += event.delta.as_int() as u64;
                let kind = match event.kind {
                    TrackEventKind::Midi { channel, message } => {
                        EventKind::Midi(MidiMessage::from_midly(channel, message))
                    }
                    TrackEventKind::SysEx(data) | TrackEventKind::Escape(data) => {
                        EventKind::SysEx { len: data.len() }
                    }
                    TrackEventKind::Meta(meta) => {
                        match meta {
                            MetaMessage::Tempo(tempo) => tempo_changes.push((tick, tempo.as_int())),
                            MetaMessage::TrackName(name) if track.name.is_none() => {
                                track.name = Some(String::from_utf8_lossy(name).into_owned());
                            }
                            _ => {}
                        }
                        EventKind::Meta(describe_meta(&meta))
                    }
                };
                track.events.push(TimedEvent { tick, kind });
            }

            tracks.push(track);
        }

        let total_ticks = tracks.iter().map(Track::end_tick).max().unwrap_or(0);
        let total_micros = match smf.header.timing {
            Timing::Metrical(tpq) => {
                tempo_changes.sort_by_key(|(tick, _)| *tick);
                metrical_micros(total_ticks, tpq.as_int(), &tempo_changes)
            }
            Timing::Timecode(fps, ticks_per_frame) => {
                let ticks_per_second = fps.as_f32() as f64 * ticks_per_frame as f64;
                if ticks_per_second > 0.0 {
                    (total_ticks as f64 * 1_000_000.0 / ticks_per_second).round() as u64
                } else {
                    0
                }
            }
        };

        debug!(
            tracks = tracks.len(),
            total_ticks, total_micros, "Decoded MIDI file"
        );

        Self {
            tracks,
            total_ticks,
            total_micros,
        }
    }

    /// Averaged wall-clock length of one tick in milliseconds
    ///
    /// `(total_micros / 1000) / total_ticks`; an empty timeline has rate 0.
    pub fn ms_per_tick(&self) -> f64 {
        if self.total_ticks == 0 {
            return 0.0;
        }
        (self.total_micros as f64 / 1000.0) / self.total_ticks as f64
    }

    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(|t| t.events.len()).sum()
    }
}

/// Duration of `[0, total_ticks]` under a tempo map sorted by tick
fn metrical_micros(total_ticks: u64, ticks_per_quarter: u16, tempo_changes: &[(u64, u32)]) -> u64 {
    if ticks_per_quarter == 0 {
        return 0;
    }
    let tpq = ticks_per_quarter as f64;

    let mut micros = 0.0;
    let mut last_tick = 0u64;
    let mut tempo = DEFAULT_TEMPO_US_PER_QUARTER;

    for &(tick, new_tempo) in tempo_changes {
        if tick >= total_ticks {
            break;
        }
        micros += (tick - last_tick) as f64 * tempo as f64 / tpq;
        last_tick = tick;
        tempo = new_tempo;
    }
    micros += (total_ticks - last_tick) as f64 * tempo as f64 / tpq;

    micros.round() as u64
}

fn describe_meta(meta: &MetaMessage) -> String {
    match meta {
        MetaMessage::Tempo(t) => format!("Tempo {}us/quarter", t.as_int()),
        MetaMessage::TrackName(name) => format!("TrackName {}", String::from_utf8_lossy(name)),
        MetaMessage::EndOfTrack => "EndOfTrack".to_string(),
        // The denominator is a power-of-two exponent taken straight from the file
        MetaMessage::TimeSignature(num, den, _, _) => match 1u32.checked_shl(*den as u32) {
            Some(den) => format!("TimeSignature {}/{}", num, den),
            None => format!("TimeSignature {}/2^{}", num, den),
        },
        other => format!("{:?}", other),
    }
}
