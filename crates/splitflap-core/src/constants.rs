//! Core constants for the splitflap controller.
//!
//! Fallback values used while the device has not yet announced its own
//! configuration, the calibration step units, and the default timing bounds
//! for the command lock.
//!
//! # Usage
//!
//! ```
//! use splitflap_core::constants::*;
//!
//! assert_eq!(DEFAULT_MODULE_COUNT, 6);
//! assert_eq!(TENTHS_PER_STEP, 10);
//! assert_eq!(DEFAULT_ALPHABET[0], BLANK);
//! ```

// ============================================================================
// Display Defaults
// ============================================================================

/// The blank flap. Used for right-padding short messages.
pub const BLANK: char = ' ';

/// Module count assumed while the device has not reported one.
///
/// The device announces its configuration asynchronously after power-on, so
/// the first few seconds of a session may run on this value.
///
/// # Value: 6 modules
pub const DEFAULT_MODULE_COUNT: usize = 6;

/// Built-in flap alphabet used when the device has not reported its own.
///
/// Matches the stock 40-flap character set: blank, `A`-`Z`, `0`-`9`, and
/// the three punctuation flaps.
pub const DEFAULT_ALPHABET: [char; 40] = [
    ' ', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.',
    ',', '\'',
];

// ============================================================================
// Calibration Units
// ============================================================================

/// Number of tenth-steps in one full physical character advance.
pub const TENTHS_PER_STEP: i32 = 10;

/// A fine calibration adjustment (1/10 step).
pub const TENTH_STEP: i32 = 1;

/// A coarse calibration adjustment (1/2 step).
pub const HALF_STEP: i32 = 5;

// ============================================================================
// Timeout Configuration
// ============================================================================

/// Default bound on waiting for the command lock (milliseconds).
///
/// A caller that cannot acquire the lock within this window fails with
/// `Busy` instead of hanging.
///
/// # Value: 2000ms
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2000;

/// Default bound on one device round trip (milliseconds).
///
/// Applies to the connect handshake and to every command written to the
/// device.
///
/// # Value: 5000ms
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5000;
