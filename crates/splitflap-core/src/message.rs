//! Fixed-width display messages and the normalizer that produces them.
//!
//! A [`DisplayMessage`] is exactly one character per module, each one a
//! flap in the current [`DeviceAlphabet`]. The only way to build one from
//! caller text is [`normalize`], so holding a `DisplayMessage` is proof that
//! the text is safe to put on the wire.
//!
//! # Normalization rules
//!
//! 1. Empty input is rejected with [`Error::EmptyMessage`].
//! 2. Input longer than the display is truncated to the first
//!    `module_count` characters and the result is flagged as truncated.
//! 3. Input shorter than the display is right-padded with the blank flap.
//! 4. Every character of the resulting window is resolved against the
//!    alphabet (with uppercase folding). Anything left over is reported in
//!    [`Error::InvalidCharacters`].

use std::fmt;

use serde::Serialize;

use crate::alphabet::DeviceAlphabet;
use crate::constants::BLANK;
use crate::error::{Error, Result};

/// One character per module, all legal flaps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayMessage {
    chars: Vec<char>,
}

impl DisplayMessage {
    /// An all-blank message for a display of `module_count` modules.
    pub fn blank(module_count: usize) -> Self {
        Self {
            chars: vec![BLANK; module_count],
        }
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Number of modules this message addresses.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }
}

impl fmt::Display for DisplayMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in &self.chars {
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl Serialize for DisplayMessage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of a successful [`normalize`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedMessage {
    pub message: DisplayMessage,
    /// Input characters beyond the display width were dropped.
    pub truncated: bool,
}

/// Turn caller text into a message the display can show.
///
/// Pure: no I/O, no logging, and the same inputs always give the same
/// result.
///
/// # Errors
///
/// - [`Error::EmptyMessage`] if `raw` is empty
/// - [`Error::InvalidCharacters`] if the visible window contains characters
///   with no flap; carries the offending characters (first-seen order, no
///   repeats) and the full alphabet
///
/// # Examples
///
/// ```
/// use splitflap_core::{DeviceAlphabet, Error, normalize};
///
/// let alphabet = DeviceAlphabet::default();
///
/// let n = normalize("1234567", 6, &alphabet).unwrap();
/// assert_eq!(n.message.as_string(), "123456");
/// assert!(n.truncated);
///
/// assert_eq!(normalize("", 6, &alphabet), Err(Error::EmptyMessage));
/// ```
pub fn normalize(
    raw: &str,
    module_count: usize,
    alphabet: &DeviceAlphabet,
) -> Result<NormalizedMessage> {
    if raw.is_empty() {
        return Err(Error::EmptyMessage);
    }

    let mut window: Vec<char> = raw.chars().take(module_count.saturating_add(1)).collect();
    let truncated = window.len() > module_count;
    window.truncate(module_count);
    window.resize(module_count, BLANK);

    let mut invalid = Vec::new();
    for c in window.iter_mut() {
        match alphabet.resolve(*c) {
            Some(flap) => *c = flap,
            None if !invalid.contains(c) => invalid.push(*c),
            None => {}
        }
    }

    if !invalid.is_empty() {
        return Err(Error::InvalidCharacters {
            invalid,
            alphabet: alphabet.chars().to_vec(),
        });
    }

    Ok(NormalizedMessage {
        message: DisplayMessage { chars: window },
        truncated,
    })
}

/// Text that identifies one module during a calibration walkthrough.
///
/// Blank everywhere except at `module_id`, which shows the last digit of the
/// module's index.
///
/// # Errors
///
/// - [`Error::ModuleOutOfRange`] if `module_id >= module_count`
/// - [`Error::InvalidCharacters`] if the alphabet has no digit flaps
pub fn module_marker_text(
    module_id: usize,
    module_count: usize,
    alphabet: &DeviceAlphabet,
) -> Result<DisplayMessage> {
    if module_id >= module_count {
        return Err(Error::module_out_of_range(module_id, module_count));
    }

    let digit = char::from_digit((module_id % 10) as u32, 10).unwrap_or('0');
    let mut chars = vec![BLANK; module_count];
    chars[module_id] = digit;
    let raw: String = chars.into_iter().collect();

    normalize(&raw, module_count, alphabet).map(|n| n.message)
}
