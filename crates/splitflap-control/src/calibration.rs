//! Per-module calibration offsets and their workflow state.
//!
//! Offsets are tracked in tenth-steps. Each module moves through
//! `Uncalibrated → Adjusting → Committed`. `adjust` always lands in
//! `Adjusting` (also from `Committed`) and `commit_as_zero` always lands in
//! `Committed` (also straight from `Uncalibrated`). Nothing returns a module
//! to `Uncalibrated`.
//!
//! [`CalibrationState`] is plain data with no I/O and no locking. The device
//! session owns it behind the command lock, so overlapping adjustments to the
//! same module are serialized there.
//!
//! Saving an `Adjusting` module persists its accumulated offset as-is. That
//! matches how the device has always behaved, but it means an unfinished
//! adjustment can end up stored.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use splitflap_core::constants::{HALF_STEP, TENTH_STEP, TENTHS_PER_STEP};
use splitflap_core::{Error, Result};
use splitflap_hardware::PersistOutcome;

use crate::api::ModuleSaveResult;
use crate::config::NegativeDeltaMode;

/// Maximum number of phase transitions kept for diagnostics.
const MAX_HISTORY_SIZE: usize = 256;

/// Calibration workflow phase of one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationPhase {
    /// No adjustment since the controller started.
    #[default]
    Uncalibrated,

    /// Offset has been nudged but the new origin is not committed.
    Adjusting,

    /// Current physical position was recorded as the origin.
    Committed,
}

impl fmt::Display for CalibrationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            Self::Uncalibrated => "Uncalibrated",
            Self::Adjusting => "Adjusting",
            Self::Committed => "Committed",
        };
        write!(f, "{phase}")
    }
}

impl CalibrationPhase {
    /// Check if transition to `target` is valid from this phase.
    ///
    /// # Examples
    ///
    /// ```
    /// use splitflap_control::CalibrationPhase;
    ///
    /// assert!(CalibrationPhase::Uncalibrated.can_transition_to(&CalibrationPhase::Adjusting));
    /// assert!(CalibrationPhase::Committed.can_transition_to(&CalibrationPhase::Adjusting));
    /// assert!(!CalibrationPhase::Committed.can_transition_to(&CalibrationPhase::Uncalibrated));
    /// ```
    pub fn can_transition_to(&self, target: &CalibrationPhase) -> bool {
        matches!(
            (self, target),
            (_, CalibrationPhase::Adjusting) | (_, CalibrationPhase::Committed)
        )
    }
}

/// A recorded phase change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationTransition {
    pub module_id: usize,
    pub from: CalibrationPhase,
    pub to: CalibrationPhase,
    pub timestamp: DateTime<Utc>,
}

/// Tracked calibration of one module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModuleCalibration {
    pub offset_tenths: i32,
    pub phase: CalibrationPhase,
}

/// Calibration ledger for every module of the display.
///
/// # Examples
///
/// ```
/// use splitflap_control::{CalibrationPhase, CalibrationState};
///
/// let mut state = CalibrationState::new(6);
/// state.adjust(2, 1).unwrap();
/// state.adjust(2, 5).unwrap();
/// assert_eq!(state.offset(2).unwrap(), 6);
/// assert_eq!(state.phase(2).unwrap(), CalibrationPhase::Adjusting);
///
/// state.commit_as_zero(2).unwrap();
/// assert_eq!(state.offset(2).unwrap(), 0);
/// assert_eq!(state.phase(2).unwrap(), CalibrationPhase::Committed);
///
/// assert!(state.adjust(6, 1).is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CalibrationState {
    modules: Vec<ModuleCalibration>,
    history: VecDeque<CalibrationTransition>,
}

impl CalibrationState {
    pub fn new(module_count: usize) -> Self {
        Self {
            modules: vec![ModuleCalibration::default(); module_count],
            history: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Fail with [`Error::ModuleOutOfRange`] unless `module_id` exists.
    pub fn check_module(&self, module_id: usize) -> Result<()> {
        if module_id < self.modules.len() {
            Ok(())
        } else {
            Err(Error::module_out_of_range(module_id, self.modules.len()))
        }
    }

    pub fn module(&self, module_id: usize) -> Result<ModuleCalibration> {
        self.check_module(module_id)?;
        Ok(self.modules[module_id])
    }

    pub fn offset(&self, module_id: usize) -> Result<i32> {
        self.module(module_id).map(|m| m.offset_tenths)
    }

    pub fn phase(&self, module_id: usize) -> Result<CalibrationPhase> {
        self.module(module_id).map(|m| m.phase)
    }

    /// Accumulated offsets, indexed by module id.
    pub fn offsets(&self) -> Vec<i32> {
        self.modules.iter().map(|m| m.offset_tenths).collect()
    }

    pub fn modules(&self) -> &[ModuleCalibration] {
        &self.modules
    }

    /// Add `delta_tenths` to a module's offset and return the new offset.
    ///
    /// Saturates at the `i32` bounds.
    pub fn adjust(&mut self, module_id: usize, delta_tenths: i32) -> Result<i32> {
        self.check_module(module_id)?;
        let module = &mut self.modules[module_id];
        module.offset_tenths = module.offset_tenths.saturating_add(delta_tenths);
        let offset = module.offset_tenths;
        self.set_phase(module_id, CalibrationPhase::Adjusting);
        Ok(offset)
    }

    /// Declare the module's current position its origin.
    pub fn commit_as_zero(&mut self, module_id: usize) -> Result<()> {
        self.check_module(module_id)?;
        self.modules[module_id].offset_tenths = 0;
        self.set_phase(module_id, CalibrationPhase::Committed);
        Ok(())
    }

    /// Whether any module has reached `Committed`.
    pub fn any_committed(&self) -> bool {
        self.modules
            .iter()
            .any(|m| m.phase == CalibrationPhase::Committed)
    }

    /// Match the ledger to a new module count.
    ///
    /// Existing modules keep their state; new ones start `Uncalibrated`.
    pub fn resize(&mut self, module_count: usize) {
        self.modules
            .resize(module_count, ModuleCalibration::default());
    }

    /// Recorded phase changes, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &CalibrationTransition> {
        self.history.iter()
    }

    fn set_phase(&mut self, module_id: usize, to: CalibrationPhase) {
        let from = self.modules[module_id].phase;
        debug_assert!(from.can_transition_to(&to));
        self.modules[module_id].phase = to;

        if from != to {
            if self.history.len() >= MAX_HISTORY_SIZE {
                self.history.pop_front();
            }
            self.history.push_back(CalibrationTransition {
                module_id,
                from,
                to,
                timestamp: Utc::now(),
            });
        }
    }
}

/// Split a caller delta into the deltas actually sent to the device.
///
/// In [`NegativeDeltaMode::Native`] this is the delta itself. In
/// [`NegativeDeltaMode::ForwardWrap`] a negative delta becomes forward
/// movement of `delta mod 10` tenths, as half steps first and then tenths.
/// Zero, and negative multiples of a full step, need no commands at all.
///
/// # Examples
///
/// ```
/// use splitflap_control::calibration::device_steps;
/// use splitflap_control::NegativeDeltaMode;
///
/// assert_eq!(device_steps(-1, NegativeDeltaMode::Native), vec![-1]);
/// assert_eq!(device_steps(-1, NegativeDeltaMode::ForwardWrap), vec![5, 1, 1, 1, 1]);
/// assert_eq!(device_steps(-5, NegativeDeltaMode::ForwardWrap), vec![5]);
/// assert!(device_steps(0, NegativeDeltaMode::Native).is_empty());
/// ```
pub fn device_steps(delta_tenths: i32, mode: NegativeDeltaMode) -> Vec<i32> {
    if delta_tenths == 0 {
        return Vec::new();
    }
    if delta_tenths > 0 || mode == NegativeDeltaMode::Native {
        return vec![delta_tenths];
    }

    let mut remaining = delta_tenths.rem_euclid(TENTHS_PER_STEP);
    let mut steps = Vec::new();
    while remaining >= HALF_STEP {
        steps.push(HALF_STEP);
        remaining -= HALF_STEP;
    }
    while remaining > 0 {
        steps.push(TENTH_STEP);
        remaining -= TENTH_STEP;
    }
    steps
}

/// Turn the device's persist reply into one result per module.
///
/// The report covers `0..module_count` in ascending order. Modules the device
/// did not mention are reported failed; entries for unknown modules and
/// repeated entries are ignored (first one wins).
pub fn save_report(module_count: usize, outcomes: Vec<PersistOutcome>) -> Vec<ModuleSaveResult> {
    let mut slots: Vec<Option<PersistOutcome>> = vec![None; module_count];
    for outcome in outcomes {
        if let Some(slot) = slots.get_mut(outcome.module_id) {
            slot.get_or_insert(outcome);
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(module_id, outcome)| match outcome {
            Some(o) => ModuleSaveResult {
                module_id,
                ok: o.ok,
                error: if o.ok {
                    None
                } else {
                    Some(o.error.unwrap_or_else(|| "save failed".to_string()))
                },
            },
            None => ModuleSaveResult {
                module_id,
                ok: false,
                error: Some("no acknowledgement".to_string()),
            },
        })
        .collect()
}
