//! Serializable request outcomes for the HTTP facade and the console.
//!
//! The controller's methods return `Result`s. These types flatten a result
//! into the `{success, ..., error}` shape external callers consume, so every
//! transport renders failures the same way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use splitflap_core::NormalizedMessage;

use crate::error::{ControlError, ErrorKind, Result};
use crate::session::SessionSnapshot;

/// Outcome of saving one module's offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSaveResult {
    pub module_id: usize,
    pub ok: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTextResponse {
    pub success: bool,
    pub final_text: Option<String>,
    pub truncated: bool,
    pub error: Option<ErrorKind>,
    /// Human-readable detail, e.g. the offending characters.
    pub message: Option<String>,
}

impl SetTextResponse {
    pub fn from_result(result: &Result<NormalizedMessage>) -> Self {
        match result {
            Ok(normalized) => Self {
                success: true,
                final_text: Some(normalized.message.as_string()),
                truncated: normalized.truncated,
                error: None,
                message: None,
            },
            Err(e) => Self {
                success: false,
                final_text: None,
                truncated: false,
                error: Some(e.kind()),
                message: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub connected: bool,
    pub module_count: usize,
    pub alphabet: Vec<char>,
    pub transport_identifier: Option<String>,
    /// Module count or alphabet is a fallback, not what the device reported.
    pub degraded: bool,
    pub display_enabled: bool,
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn from_snapshot(snapshot: &SessionSnapshot, display_enabled: bool) -> Self {
        Self {
            connected: snapshot.connected,
            module_count: snapshot.module_count,
            alphabet: snapshot.alphabet.chars().to_vec(),
            transport_identifier: snapshot.transport_identifier.clone(),
            degraded: snapshot.degraded,
            display_enabled,
            error: (!snapshot.connected).then(|| ControlError::NotConnected.to_string()),
        }
    }
}

/// Outcome of an adjust or commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationResponse {
    pub success: bool,
    /// Module's tracked offset after the operation.
    pub offset_tenths: Option<i32>,
    pub error: Option<ErrorKind>,
}

impl CalibrationResponse {
    pub fn from_result(result: &Result<i32>) -> Self {
        match result {
            Ok(offset) => Self {
                success: true,
                offset_tenths: Some(*offset),
                error: None,
            },
            Err(e) => Self {
                success: false,
                offset_tenths: None,
                error: Some(e.kind()),
            },
        }
    }

    /// A successful commit always leaves the module at offset zero.
    pub fn from_commit(result: &Result<()>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                offset_tenths: Some(0),
                error: None,
            },
            Err(e) => Self {
                success: false,
                offset_tenths: None,
                error: Some(e.kind()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveCalibrationResponse {
    pub success: bool,
    pub per_module_results: Vec<ModuleSaveResult>,
    pub error: Option<ErrorKind>,
}

impl SaveCalibrationResponse {
    /// Partial failures keep their per-module detail.
    pub fn from_result(result: &Result<Vec<ModuleSaveResult>>) -> Self {
        match result {
            Ok(results) => Self {
                success: true,
                per_module_results: results.clone(),
                error: None,
            },
            Err(e @ ControlError::Persistence { results, .. }) => Self {
                success: false,
                per_module_results: results.clone(),
                error: Some(e.kind()),
            },
            Err(e) => Self {
                success: false,
                per_module_results: Vec::new(),
                error: Some(e.kind()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
        }
    }
}
