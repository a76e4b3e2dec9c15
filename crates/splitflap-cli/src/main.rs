//! `flapctl`: drive a splitflap display from the terminal.
//!
//! Runs against the simulated display, so every command works without
//! hardware attached.

mod commands;
mod logger;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use splitflap_control::{ControllerConfig, DisplayController};
use splitflap_core::constants::{DEFAULT_ALPHABET, DEFAULT_MODULE_COUNT};
use splitflap_hardware::mock::MockConnector;
use tokio::io::BufReader;
use tracing::info;

use crate::commands::WalkthroughOutcome;

#[derive(Parser)]
#[command(name = "flapctl")]
#[command(about = "Control a splitflap display", version)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the serial port from the configuration
    #[arg(long)]
    port: Option<String>,

    /// Number of modules on the simulated display
    #[arg(long, default_value_t = DEFAULT_MODULE_COUNT)]
    modules: usize,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show a message
    Send {
        text: String,

        /// Rotate every module even if its character is unchanged
        #[arg(long)]
        force: bool,
    },

    /// Print connection status as JSON
    Status,

    /// Walk through the modules and calibrate each one
    Calibrate,

    /// Cycle through a fixed set of test strings
    Demo {
        /// Pause after each string
        #[arg(long, default_value_t = 3000)]
        pause_ms: u64,
    },

    /// Send messages typed on stdin
    Console,
}

fn load_config(args: &Args) -> Result<ControllerConfig> {
    let mut config = match &args.config {
        Some(path) => ControllerConfig::load(path)
            .with_context(|| format!("Failed to load config file '{}'", path.display()))?,
        None => ControllerConfig::default(),
    };

    if let Some(port) = &args.port {
        config.serial_port = port.clone();
        config.validate().context("Invalid --port")?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = load_config(&args)?;
    info!(port = %config.serial_port, modules = args.modules, "Using simulated display");

    let (connector, _display) = MockConnector::with_config(args.modules, DEFAULT_ALPHABET.to_vec());
    let controller = DisplayController::new(connector, config)?;

    let snapshot = controller
        .connect()
        .await
        .context("Failed to connect to display")?;
    println!("Connected to splitflap with {} modules", snapshot.module_count);
    println!("Available characters: {}", snapshot.alphabet.as_string());

    let result = match args.command {
        Command::Send { text, force } => commands::send(&controller, &text, force).await,
        Command::Status => commands::status(&controller),
        Command::Calibrate => {
            let stdin = BufReader::new(tokio::io::stdin());
            match commands::calibrate(&controller, stdin).await {
                Ok(WalkthroughOutcome::Aborted) => {
                    println!("Calibration aborted, offsets not saved");
                    Ok(())
                }
                Ok(WalkthroughOutcome::Saved(_)) => Ok(()),
                Err(e) => Err(e),
            }
        }
        Command::Demo { pause_ms } => {
            commands::demo(&controller, Duration::from_millis(pause_ms)).await
        }
        Command::Console => {
            let stdin = BufReader::new(tokio::io::stdin());
            commands::console(&controller, stdin)
                .await
                .map(|shown| info!(shown, "Console closed"))
        }
    };

    controller.disconnect().await?;
    result
}
