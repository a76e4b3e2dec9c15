//! Core types for the splitflap display controller.
//!
//! This crate holds the pure, synchronous half of the controller: the
//! device alphabet, the fixed-width display message, and the normalizer that
//! turns arbitrary caller text into something the display can legally show.
//!
//! Nothing in here performs I/O. The session and calibration workflow live in
//! `splitflap-control`; the transport contract lives in `splitflap-hardware`.
//!
//! # Examples
//!
//! ```
//! use splitflap_core::{DeviceAlphabet, normalize};
//!
//! let alphabet = DeviceAlphabet::default();
//! let normalized = normalize("hello", 6, &alphabet).unwrap();
//!
//! assert_eq!(normalized.message.as_string(), "HELLO ");
//! assert!(!normalized.truncated);
//! ```

pub mod alphabet;
pub mod constants;
pub mod error;
pub mod message;

pub use alphabet::DeviceAlphabet;
pub use error::{Error, Result};
pub use message::{DisplayMessage, NormalizedMessage, module_marker_text, normalize};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
