//! MIDI Sender - drive relay boards from a MIDI timeline

use anyhow::Result;
use clap::Parser;
use midi_sender::cli::{Args, Command, LogFormat};
use midi_sender::config::AppSettings;
use midi_sender::scheduler::stop_channel;
use midi_sender::session::PlaySession;
use midi_sender::PlayError;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    if let Err(e) = init_logging(&args.log_level, args.log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Starting MIDI Sender v{}...", env!("CARGO_PKG_VERSION"));

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            let code = e
                .downcast_ref::<PlayError>()
                .map(PlayError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = AppSettings::load(args.settings.as_deref()).await?;
    let session = PlaySession::new(settings);

    match args.command {
        Command::Play(play) => {
            let (config_path, midi_path) = play.resolve(session.settings())?;

            // Ctrl+C requests a stop; the scheduler decides how to end
            let (stop_handle, stop_signal) = stop_channel();
            tokio::spawn(async move {
                shutdown_signal().await;
                stop_handle.stop();
            });

            session.play(&config_path, &midi_path, stop_signal).await?;
            info!("MIDI Sender finished");
        }
        Command::Check { config } => {
            let setup = session.check(&config).await?;
            for binding in setup.router.bindings() {
                info!(
                    "  {} → {}.{}",
                    binding.identity,
                    binding.device.name(),
                    binding.endpoint
                );
            }
            info!(
                "Config OK: {} devices, {} bindings",
                setup.devices.len(),
                setup.router.len()
            );
        }
    }

    Ok(())
}

fn init_logging(level: &str, format: LogFormat) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?,
    }

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}
