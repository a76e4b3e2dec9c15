//! Errors surfaced by the display controller.
//!
//! [`ControlError`] is the single failure type of every public controller
//! operation. [`ErrorKind`] is its wire-level classification, the value
//! callers branch on.

use serde::{Deserialize, Serialize};
use splitflap_core::Error as ValidationError;
use splitflap_hardware::TransportError;

use crate::api::ModuleSaveResult;

/// Result type alias for controller operations.
pub type Result<T> = std::result::Result<T, ControlError>;

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// Caller supplied text or a module id the display cannot accept.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Connect handshake or device round trip failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Display is not connected")]
    NotConnected,

    /// Command lock could not be acquired in time.
    #[error("Display busy: command lock not acquired within {waited_ms}ms")]
    Busy { waited_ms: u64 },

    /// One or more modules did not store their offsets.
    #[error("Failed to persist offsets for modules {failed:?}")]
    Persistence {
        failed: Vec<usize>,
        results: Vec<ModuleSaveResult>,
    },

    #[error("Display is disabled")]
    DisplayDisabled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ControlError {
    /// Create a new busy error.
    pub fn busy(waited_ms: u64) -> Self {
        Self::Busy { waited_ms }
    }

    /// Create a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Classify this error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(ValidationError::EmptyMessage) => ErrorKind::EmptyMessage,
            Self::Validation(ValidationError::InvalidCharacters { .. }) => {
                ErrorKind::InvalidCharacters
            }
            Self::Validation(ValidationError::ModuleOutOfRange { .. }) => {
                ErrorKind::ModuleOutOfRange
            }
            Self::Validation(_) => ErrorKind::ConfigError,
            Self::Transport(TransportError::ConnectionFailed { .. }) => ErrorKind::ConnectionError,
            Self::Transport(_) => ErrorKind::TransportError,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::Busy { .. } => ErrorKind::Busy,
            Self::Persistence { .. } => ErrorKind::PersistenceError,
            Self::DisplayDisabled => ErrorKind::DisplayDisabled,
            Self::Config(_) => ErrorKind::ConfigError,
        }
    }
}

/// Serializable error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyMessage,
    InvalidCharacters,
    ModuleOutOfRange,
    ConnectionError,
    TransportError,
    Busy,
    PersistenceError,
    NotConnected,
    DisplayDisabled,
    ConfigError,
}

impl ErrorKind {
    /// Whether trying the same request again later can succeed.
    ///
    /// Validation failures never become valid by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError | Self::TransportError | Self::Busy
        )
    }
}
