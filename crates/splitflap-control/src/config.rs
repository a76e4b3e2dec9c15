//! Controller configuration.
//!
//! Loaded from TOML; every field has a default so an empty file is a valid
//! configuration.
//!
//! ```toml
//! serial_port = "/dev/ttyACM0"
//! lock_timeout_ms = 1500
//! negative_deltas = "forward_wrap"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use splitflap_core::constants::{
    DEFAULT_COMMAND_TIMEOUT_MS, DEFAULT_LOCK_TIMEOUT_MS, DEFAULT_MODULE_COUNT,
};

use crate::error::{ControlError, Result};

/// How negative calibration deltas are sent to the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativeDeltaMode {
    /// Forward the signed delta in a single command.
    #[default]
    Native,

    /// Step forward around a full character instead, for firmware that only
    /// moves one way. `-1` becomes `+9` tenths, sent as `+5` and four `+1`.
    ForwardWrap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Transport identifier handed to the connector.
    pub serial_port: String,

    /// Bound on waiting for the command lock.
    pub lock_timeout_ms: u64,

    /// Bound on one device round trip, including the connect handshake.
    pub command_timeout_ms: u64,

    /// Module count assumed until the device reports one.
    pub fallback_module_count: usize,

    /// Reconnect once and retry a failed display command.
    pub retry_after_reconnect: bool,

    pub negative_deltas: NegativeDeltaMode,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            serial_port: "/dev/ttyUSB0".to_string(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            fallback_module_count: DEFAULT_MODULE_COUNT,
            retry_after_reconnect: true,
            negative_deltas: NegativeDeltaMode::Native,
        }
    }
}

impl ControllerConfig {
    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Config`] if the file cannot be read, is not
    /// valid TOML, or fails [`validate`](Self::validate).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ControlError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ControlError::config(format!("TOML parsing error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values can actually drive a session.
    pub fn validate(&self) -> Result<()> {
        if self.serial_port.trim().is_empty() {
            return Err(ControlError::config("serial_port must not be empty"));
        }
        if self.lock_timeout_ms == 0 {
            return Err(ControlError::config("lock_timeout_ms must be greater than 0"));
        }
        if self.command_timeout_ms == 0 {
            return Err(ControlError::config(
                "command_timeout_ms must be greater than 0",
            ));
        }
        if self.fallback_module_count == 0 {
            return Err(ControlError::config(
                "fallback_module_count must be at least 1",
            ));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}
