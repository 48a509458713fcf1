//! Command-line interface

use crate::config::AppSettings;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// MIDI Sender - drive relay boards and other devices from a MIDI file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    pub log_format: LogFormat,

    /// Path to the settings file
    #[arg(long, env = "MIDI_SENDER_SETTINGS", global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play a MIDI file through the configured devices
    Play(PlayArgs),

    /// Validate a config file without starting devices
    Check {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
pub struct PlayArgs {
    /// Path to the configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the MIDI file
    #[arg(short, long)]
    pub midi: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl PlayArgs {
    /// Config and MIDI paths, falling back to the settings' dev block
    pub fn resolve(&self, settings: &AppSettings) -> Result<(PathBuf, PathBuf)> {
        let config = self
            .config
            .clone()
            .or_else(|| settings.dev_config_file().map(PathBuf::from))
            .ok_or_else(|| anyhow!("Missing --config (no development default configured)"))?;
        let midi = self
            .midi
            .clone()
            .or_else(|| settings.dev_midi_file().map(PathBuf::from))
            .ok_or_else(|| anyhow!("Missing --midi (no development default configured)"))?;
        Ok((config, midi))
    }
}
