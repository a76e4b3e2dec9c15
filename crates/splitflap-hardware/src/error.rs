//! Error types for display transport operations.
//!
//! This module defines the failures a transport can report: the link could
//! not be opened, it dropped, a round trip timed out, or the device rejected
//! a command.

/// Result type alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur while talking to the display.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connect handshake failed.
    #[error("Connection to {port} failed: {reason}")]
    ConnectionFailed { port: String, reason: String },

    /// Link is not open or has dropped.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Operation timed out after specified duration.
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Device rejected or garbled a command.
    #[error("Communication error: {message}")]
    Communication { message: String },

    /// Operation is not supported by this device.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Create a new connection failed error.
    pub fn connection_failed(port: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            port: port.into(),
            reason: reason.into(),
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::Timeout { duration_ms }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Whether the link can no longer be trusted after this error.
    ///
    /// A dropped link, a timed-out round trip and an I/O failure all leave
    /// the wire in an unknown state. A rejected command does not.
    pub fn is_link_lost(&self) -> bool {
        matches!(
            self,
            Self::Disconnected { .. } | Self::Timeout { .. } | Self::Io(_)
        )
    }
}
