//! Display transport abstraction for the splitflap controller.
//!
//! This crate defines what the device session needs from a transport: open a
//! link, ask the device about its configuration, and send text, calibration,
//! persist and reset commands. It ships one implementation, a scriptable mock
//! display, used by tests and by the console's simulated mode.
//!
//! # Design Philosophy
//!
//! - **Async-first**: All I/O operations are asynchronous using native `async fn`
//!   in traits (Rust 1.90 + Edition 2024 RPITIT).
//! - **Thread-safe**: All traits require `Send + Sync` for use with Tokio.
//! - **Explicit warm-up**: configuration queries return [`Probe::NotYetKnown`]
//!   instead of failing while the device is still starting up.
//! - **Error-aware**: All commands return `Result<T>` with detailed error information.
//!
//! # Examples
//!
//! ```no_run
//! use splitflap_hardware::traits::DisplayLink;
//! use splitflap_hardware::types::{CalibrationCommand, ForceMovement};
//! use splitflap_hardware::error::Result;
//!
//! async fn nudge_and_show<L: DisplayLink>(link: &mut L) -> Result<()> {
//!     link.write_calibration(0, CalibrationCommand::Adjust { tenths: 1 }).await?;
//!     link.write_text(&['0', ' ', ' ', ' ', ' ', ' '], ForceMovement::All).await
//! }
//! ```
//!
//! # Error Handling
//!
//! All commands return [`Result<T>`][error::Result] which uses the
//! [`TransportError`] error type.

pub mod devices;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export commonly used types for convenience
pub use devices::{AnyDisplayConnector, AnyDisplayLink};
pub use error::{Result, TransportError};
pub use traits::{DisplayConnector, DisplayLink};
pub use types::{CalibrationCommand, ForceMovement, PersistOutcome, Probe};
