//! Subcommand implementations.
//!
//! Every command takes an already connected controller. Interactive commands
//! read from any async line source so they can be driven from a test.

use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use splitflap_control::{
    CalibrationResponse, DisplayController, ModuleSaveResult, SaveCalibrationResponse,
    SetTextResponse,
};
use splitflap_core::constants::{HALF_STEP, TENTH_STEP};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

/// Texts cycled by `demo`.
pub const DEMO_TEXTS: [&str; 3] = ["01234", "56789", "     "];

const WALKTHROUGH_HELP: &str = "\
Commands:
  [1] Fine adjust +1/10 step
  [2] Fine adjust +1/2 step
  [3] Fine adjust -1/10 step
  [4] Fine adjust -1/2 step
  [s] Set current position as offset
  [n] Next module
  [q] Quit calibration";

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn send(controller: &DisplayController, text: &str, force: bool) -> Result<()> {
    let result = controller.set_text(text, force).await;
    print_json(&SetTextResponse::from_result(&result))?;
    result?;
    Ok(())
}

pub fn status(controller: &DisplayController) -> Result<()> {
    print_json(&controller.get_status())
}

/// Show each demo text in turn, pausing between them.
pub async fn demo(controller: &DisplayController, pause: Duration) -> Result<()> {
    for text in DEMO_TEXTS {
        println!("Displaying: '{text}'");
        controller.set_text(text, false).await?;
        tokio::time::sleep(pause).await;
    }
    info!("Demo sequence finished");
    Ok(())
}

/// Send every input line as a message until `quit`, `exit`, `q` or end of
/// input. Returns how many messages were shown.
pub async fn console<R>(controller: &DisplayController, input: R) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    println!("Enter messages to display (or 'quit' to exit):");
    let mut lines = input.lines();
    let mut shown = 0;

    while let Some(line) = lines.next_line().await? {
        let message = line.trim();
        if matches!(message.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }
        if message.is_empty() {
            println!("Empty message, skipping...");
            continue;
        }

        match controller.set_text(message, false).await {
            Ok(normalized) => {
                println!("Sent: '{}'", normalized.message);
                shown += 1;
            }
            Err(e) => {
                warn!(error = %e, "Message not shown");
                println!("Not shown: {e}");
            }
        }
    }
    Ok(shown)
}

/// One keypress of the calibration walkthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkthroughKey {
    /// Nudge the current module by this many tenth-steps.
    Adjust(i32),
    Commit,
    Next,
    Quit,
}

impl WalkthroughKey {
    pub fn parse(input: &str) -> Option<Self> {
        let key = match input.trim().to_lowercase().as_str() {
            "1" => Self::Adjust(TENTH_STEP),
            "2" => Self::Adjust(HALF_STEP),
            "3" => Self::Adjust(-TENTH_STEP),
            "4" => Self::Adjust(-HALF_STEP),
            "s" => Self::Commit,
            "n" => Self::Next,
            "q" => Self::Quit,
            _ => return None,
        };
        Some(key)
    }
}

/// How a walkthrough ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkthroughOutcome {
    /// Every module was visited and the offsets were saved.
    Saved(Vec<ModuleSaveResult>),
    /// Operator quit before the end; nothing was saved.
    Aborted,
}

/// Step through the modules one at a time, taking adjustment keys for each,
/// then save every offset.
///
/// End of input counts as quitting.
pub async fn calibrate<R>(controller: &DisplayController, input: R) -> Result<WalkthroughOutcome>
where
    R: AsyncBufRead + Unpin,
{
    let module_count = controller.get_status().module_count;
    println!("\n=== CALIBRATION MODE ===");
    controller.set_text(" ", false).await?;

    let mut lines = input.lines();
    for module_id in 0..module_count {
        println!("\n--- Testing Module {module_id} ---");
        let marker = controller.show_module_marker(module_id).await?;
        println!("Module {module_id} should show '{}'", module_id % 10);
        println!("Display: '{marker}'");
        println!("{WALKTHROUGH_HELP}");

        loop {
            let Some(line) = lines.next_line().await? else {
                info!(module_id, "Input closed, leaving calibration");
                return Ok(WalkthroughOutcome::Aborted);
            };
            let Some(key) = WalkthroughKey::parse(&line) else {
                println!("Invalid command");
                continue;
            };

            match key {
                WalkthroughKey::Adjust(delta) => {
                    let result = controller.adjust_calibration(module_id, delta).await;
                    match &result {
                        Ok(offset) => println!("Adjusted {delta:+}/10 step (offset {offset})"),
                        Err(e) => println!("Adjustment failed: {e}"),
                    }
                    if result.is_err() {
                        print_json(&CalibrationResponse::from_result(&result))?;
                    }
                }
                WalkthroughKey::Commit => {
                    let result = controller.commit_calibration(module_id).await;
                    if result.is_ok() {
                        println!("Set current position as offset for module {module_id}");
                        break;
                    }
                    print_json(&CalibrationResponse::from_commit(&result))?;
                }
                WalkthroughKey::Next => break,
                WalkthroughKey::Quit => return Ok(WalkthroughOutcome::Aborted),
            }
        }
    }

    println!("\nSaving all offsets...");
    let result = controller.save_calibration().await;
    let response = SaveCalibrationResponse::from_result(&result);
    print_json(&response)?;
    if response.success {
        println!("Calibration complete!");
    }
    Ok(WalkthroughOutcome::Saved(response.per_module_results))
}
