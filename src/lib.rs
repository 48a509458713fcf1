//! MIDI Sender
//!
//! Replays a MIDI file in real time and, for every mapped note, triggers
//! endpoints on output devices such as relay boards.

pub mod cli;
pub mod config;
pub mod devices;
pub mod error;
pub mod midi;
pub mod note;
pub mod router;
pub mod scheduler;
pub mod session;
pub mod timeline;

pub use error::{PlayError, Result};
