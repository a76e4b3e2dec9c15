//! Common types exchanged between the session and a display transport.

use serde::{Deserialize, Serialize};

/// Answer to a configuration query that may not be available yet.
///
/// The device announces its module count and alphabet asynchronously after
/// power-on. Until it has, queries return [`Probe::NotYetKnown`]. This is a
/// normal state, not a failure.
///
/// # Examples
///
/// ```
/// use splitflap_hardware::Probe;
///
/// let count: Probe<usize> = Probe::NotYetKnown;
/// assert_eq!(count.known(), None);
/// assert_eq!(Probe::Known(12).unwrap_or(6), 12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe<T> {
    Known(T),
    NotYetKnown,
}

impl<T> Probe<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Convert into an `Option`.
    pub fn known(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            Self::NotYetKnown => None,
        }
    }

    pub fn unwrap_or(self, fallback: T) -> T {
        self.known().unwrap_or(fallback)
    }
}

/// Movement policy for a text write.
///
/// With [`ForceMovement::All`] every module does a full rotation even if it
/// already shows the target character. Useful to check the mechanics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForceMovement {
    /// Only modules whose character changes move.
    #[default]
    None,

    /// Every module moves.
    All,
}

impl From<bool> for ForceMovement {
    fn from(force: bool) -> Self {
        if force { Self::All } else { Self::None }
    }
}

/// One calibration instruction for a single module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum CalibrationCommand {
    /// Nudge the module by a signed number of tenth-steps.
    Adjust { tenths: i32 },

    /// Record the module's current physical position as its origin.
    CommitZero,
}

/// Device reply for one module after a persist request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistOutcome {
    pub module_id: usize,
    pub ok: bool,
    pub error: Option<String>,
}

impl PersistOutcome {
    pub fn saved(module_id: usize) -> Self {
        Self {
            module_id,
            ok: true,
            error: None,
        }
    }

    pub fn failed(module_id: usize, error: impl Into<String>) -> Self {
        Self {
            module_id,
            ok: false,
            error: Some(error.into()),
        }
    }
}
