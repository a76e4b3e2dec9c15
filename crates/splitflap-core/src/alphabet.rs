//! The set of characters a display can physically show.
//!
//! Every module carries the same flap set. The device reports it after
//! power-on; until then the built-in [`DEFAULT_ALPHABET`] is assumed.

use serde::{Deserialize, Serialize};

use crate::constants::{BLANK, DEFAULT_ALPHABET};
use crate::error::{Error, Result};

/// Ordered, duplicate-free flap alphabet that always contains the blank.
///
/// Order is the physical flap order on the drum. It matters for display
/// purposes (status reports list it as-is) but not for membership checks.
///
/// # Examples
///
/// ```
/// use splitflap_core::DeviceAlphabet;
///
/// let alphabet = DeviceAlphabet::new(vec![' ', 'A', 'B']).unwrap();
/// assert!(alphabet.contains('A'));
/// assert_eq!(alphabet.resolve('b'), Some('B'));
/// assert_eq!(alphabet.resolve('$'), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<char>", into = "Vec<char>")]
pub struct DeviceAlphabet {
    chars: Vec<char>,
}

impl DeviceAlphabet {
    /// Build an alphabet from the device's reported flap order.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyAlphabet`] if `chars` is empty
    /// - [`Error::DuplicateCharacter`] if any flap appears twice
    /// - [`Error::MissingBlank`] if there is no blank flap to pad with
    pub fn new(chars: Vec<char>) -> Result<Self> {
        if chars.is_empty() {
            return Err(Error::EmptyAlphabet);
        }

        for (i, c) in chars.iter().enumerate() {
            if chars[..i].contains(c) {
                return Err(Error::DuplicateCharacter(*c));
            }
        }

        if !chars.contains(&BLANK) {
            return Err(Error::MissingBlank);
        }

        Ok(Self { chars })
    }

    /// Whether `c` is exactly one of the flaps.
    pub fn contains(&self, c: char) -> bool {
        self.chars.contains(&c)
    }

    /// Map a caller character onto a flap.
    ///
    /// Exact matches win. Otherwise a character whose uppercase form is a
    /// single flap resolves to that flap, so `'a'` shows as `'A'` on a stock
    /// display. Returns `None` for characters with no flap.
    pub fn resolve(&self, c: char) -> Option<char> {
        if self.contains(c) {
            return Some(c);
        }

        let mut upper = c.to_uppercase();
        match (upper.next(), upper.next()) {
            (Some(u), None) if self.contains(u) => Some(u),
            _ => None,
        }
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Always false for a constructed alphabet; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Render the alphabet as a string in flap order.
    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }
}

impl Default for DeviceAlphabet {
    fn default() -> Self {
        Self {
            chars: DEFAULT_ALPHABET.to_vec(),
        }
    }
}

impl TryFrom<Vec<char>> for DeviceAlphabet {
    type Error = Error;

    fn try_from(chars: Vec<char>) -> Result<Self> {
        Self::new(chars)
    }
}

impl From<DeviceAlphabet> for Vec<char> {
    fn from(alphabet: DeviceAlphabet) -> Self {
        alphabet.chars
    }
}
