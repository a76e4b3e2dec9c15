//! Validation errors for display text and calibration targets.
//!
//! These are caller mistakes. They are never retried and always carry enough
//! detail for the caller to correct the request.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Message errors
    #[error("Message is empty")]
    EmptyMessage,

    #[error("Invalid characters: {invalid:?}. Available: {alphabet:?}")]
    InvalidCharacters {
        invalid: Vec<char>,
        alphabet: Vec<char>,
    },

    // Calibration errors
    #[error("Module {module_id} out of range (valid: 0..{module_count})")]
    ModuleOutOfRange {
        module_id: usize,
        module_count: usize,
    },

    // Alphabet errors
    #[error("Alphabet is empty")]
    EmptyAlphabet,

    #[error("Alphabet contains duplicate character {0:?}")]
    DuplicateCharacter(char),

    #[error("Alphabet has no blank flap")]
    MissingBlank,
}

impl Error {
    /// Create a module range error.
    pub fn module_out_of_range(module_id: usize, module_count: usize) -> Self {
        Self::ModuleOutOfRange {
            module_id,
            module_count,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
