//! Note identities shared by bindings and timeline events
//!
//! A `NoteIdentity` is the key that correlates a configured mapping with a
//! note event from the timeline. Both sides go through `NoteIdentity::new`,
//! so the validation rules can never drift apart.

use crate::error::{PlayError, Result};
use std::fmt;
use std::str::FromStr;

/// Lowest valid octave (MIDI key 0 is C-1)
pub const MIN_OCTAVE: i32 = -1;
/// Highest valid octave (MIDI key 127 is G9)
pub const MAX_OCTAVE: i32 = 9;
/// Number of MIDI channels (0-15 internally)
pub const CHANNEL_COUNT: i32 = 16;

/// The twelve pitch classes, in key order starting at C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NoteName {
    C,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl NoteName {
    pub const ALL: [NoteName; 12] = [
        NoteName::C,
        NoteName::CSharp,
        NoteName::D,
        NoteName::DSharp,
        NoteName::E,
        NoteName::F,
        NoteName::FSharp,
        NoteName::G,
        NoteName::GSharp,
        NoteName::A,
        NoteName::ASharp,
        NoteName::B,
    ];

    /// Pitch class of a MIDI key (`key mod 12`)
    pub fn from_key(key: u8) -> Self {
        Self::ALL[(key % 12) as usize]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteName::C => "C",
            NoteName::CSharp => "C#",
            NoteName::D => "D",
            NoteName::DSharp => "D#",
            NoteName::E => "E",
            NoteName::F => "F",
            NoteName::FSharp => "F#",
            NoteName::G => "G",
            NoteName::GSharp => "G#",
            NoteName::A => "A",
            NoteName::ASharp => "A#",
            NoteName::B => "B",
        }
    }
}

impl fmt::Display for NoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteName {
    type Err = PlayError;

    /// Exact, case-sensitive match against the sharp spelling
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| PlayError::InvalidNoteIdentity(format!("Unknown note '{}'", s)))
    }
}

/// Canonical (channel, pitch class, octave) key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteIdentity {
    channel: u8,
    note: NoteName,
    octave: i8,
}

impl NoteIdentity {
    /// Build a validated identity
    ///
    /// Channel must be within 0-15, octave within -1..=9 and the note one of
    /// the twelve sharp-spelled names.
    pub fn new(channel: i32, note: &str, octave: i32) -> Result<Self> {
        if !(0..CHANNEL_COUNT).contains(&channel) {
            return Err(PlayError::InvalidNoteIdentity(format!(
                "Channel {} out of range (must be 0-15)",
                channel
            )));
        }
        if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
            return Err(PlayError::InvalidNoteIdentity(format!(
                "Octave {} out of range (must be -1 to 9)",
                octave
            )));
        }
        let note = note.parse::<NoteName>()?;

        Ok(Self {
            channel: channel as u8,
            note,
            octave: octave as i8,
        })
    }

    /// Identity of a MIDI key on a channel: `octave = key / 12 - 1`
    pub fn from_key(channel: u8, key: u8) -> Result<Self> {
        let octave = (key / 12) as i32 - 1;
        Self::new(channel as i32, NoteName::from_key(key).as_str(), octave)
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn note(&self) -> NoteName {
        self.note
    }

    pub fn octave(&self) -> i8 {
        self.octave
    }
}

/// Canonical form `"{channel}-{note}-{octave}"`, e.g. `0-C#-4`
impl fmt::Display for NoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.channel, self.note, self.octave)
    }
}

/// Command forwarded to a device endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteCommand {
    NoteOn,
    NoteOff,
}

impl fmt::Display for NoteCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteCommand::NoteOn => f.write_str("NOTE_ON"),
            NoteCommand::NoteOff => f.write_str("NOTE_OFF"),
        }
    }
}
