//! MIDI channel messages carried by the timeline
//!
//! Provides the channel message model and the conversion from `midly`
//! track events.

use crate::note::NoteCommand;
use std::fmt;

/// MIDI channel message types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On: channel (0-15), note (0-127), velocity (1-127)
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Polyphonic Key Pressure: channel (0-15), note (0-127), pressure (0-127)
    PolyPressure { channel: u8, note: u8, pressure: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Program Change: channel (0-15), program (0-127)
    ProgramChange { channel: u8, program: u8 },

    /// Channel Pressure: channel (0-15), pressure (0-127)
    ChannelPressure { channel: u8, pressure: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },
}

impl MidiMessage {
    /// Convert a `midly` channel event
    pub fn from_midly(channel: midly::num::u4, message: midly::MidiMessage) -> Self {
        let channel = channel.as_int();
        match message {
            midly::MidiMessage::NoteOff { key, vel } => MidiMessage::NoteOff {
                channel,
                note: key.as_int(),
                velocity: vel.as_int(),
            },
            midly::MidiMessage::NoteOn { key, vel } => {
                Self::note_on(channel, key.as_int(), vel.as_int())
            }
            midly::MidiMessage::Aftertouch { key, vel } => MidiMessage::PolyPressure {
                channel,
                note: key.as_int(),
                pressure: vel.as_int(),
            },
            midly::MidiMessage::Controller { controller, value } => MidiMessage::ControlChange {
                channel,
                cc: controller.as_int(),
                value: value.as_int(),
            },
            midly::MidiMessage::ProgramChange { program } => MidiMessage::ProgramChange {
                channel,
                program: program.as_int(),
            },
            midly::MidiMessage::ChannelAftertouch { vel } => MidiMessage::ChannelPressure {
                channel,
                pressure: vel.as_int(),
            },
            midly::MidiMessage::PitchBend { bend } => MidiMessage::PitchBend {
                channel,
                value: bend.0.as_int(),
            },
        }
    }

    /// Note On with velocity 0 is a Note Off
    fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        if velocity == 0 {
            MidiMessage::NoteOff {
                channel,
                note,
                velocity: 0,
            }
        } else {
            MidiMessage::NoteOn {
                channel,
                note,
                velocity,
            }
        }
    }

    /// Get the channel (0-15)
    pub fn channel(&self) -> u8 {
        match *self {
            MidiMessage::NoteOff { channel, .. }
            | MidiMessage::NoteOn { channel, .. }
            | MidiMessage::PolyPressure { channel, .. }
            | MidiMessage::ControlChange { channel, .. }
            | MidiMessage::ProgramChange { channel, .. }
            | MidiMessage::ChannelPressure { channel, .. }
            | MidiMessage::PitchBend { channel, .. } => channel,
        }
    }

    /// Device command and key for note messages, `None` for everything else
    pub fn note_command(&self) -> Option<(NoteCommand, u8)> {
        match *self {
            MidiMessage::NoteOn { note, .. } => Some((NoteCommand::NoteOn, note)),
            MidiMessage::NoteOff { note, .. } => Some((NoteCommand::NoteOff, note)),
            _ => None,
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::PolyPressure { channel, note, pressure } => {
                write!(f, "PolyPressure ch:{} n:{} p:{}", channel + 1, note, pressure)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::ProgramChange { channel, program } => {
                write!(f, "ProgramChange ch:{} p:{}", channel + 1, program)
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                write!(f, "ChannelPressure ch:{} p:{}", channel + 1, pressure)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel + 1, value)
            }
        }
    }
}
