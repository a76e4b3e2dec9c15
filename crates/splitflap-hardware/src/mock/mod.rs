//! Mock device implementations for testing and development.
//!
//! This module provides a simulated display that can be controlled
//! programmatically without requiring physical hardware.

pub mod display;

// Re-export commonly used types
pub use display::{FRAME_TERMINATOR, MockConnector, MockDisplay, MockDisplayHandle, TextWrite};
