//! Property-based tests for the calibration ledger.
//!
//! These cover offset additivity, commit resets, the forward-wrap step
//! decomposition and the shape of save reports.

use proptest::prelude::*;
use splitflap_control::calibration::{device_steps, save_report};
use splitflap_control::{CalibrationPhase, CalibrationState, NegativeDeltaMode};
use splitflap_hardware::PersistOutcome;

/// Strategy for display widths seen on real hardware (1-72 modules).
fn module_count() -> impl Strategy<Value = usize> {
    1usize..=72
}

/// Strategy for deltas an operator could plausibly enter.
fn delta() -> impl Strategy<Value = i32> {
    -10_000i32..=10_000
}

/// Strategy for a persist reply: arbitrary module ids, some out of range,
/// possibly repeated, each saved or failed.
fn outcomes() -> impl Strategy<Value = Vec<PersistOutcome>> {
    prop::collection::vec((0usize..100, any::<bool>()), 0..120).prop_map(|entries| {
        entries
            .into_iter()
            .map(|(module_id, ok)| {
                if ok {
                    PersistOutcome::saved(module_id)
                } else {
                    PersistOutcome::failed(module_id, "EEPROM write failed")
                }
            })
            .collect()
    })
}

proptest! {
    /// Property: two adjustments equal one adjustment by their sum.
    #[test]
    fn prop_adjust_is_additive(
        count in module_count(),
        pick in any::<prop::sample::Index>(),
        d1 in delta(),
        d2 in delta(),
    ) {
        let module_id = pick.index(count);

        let mut split = CalibrationState::new(count);
        split.adjust(module_id, d1).unwrap();
        let stepwise = split.adjust(module_id, d2).unwrap();

        let mut single = CalibrationState::new(count);
        let combined = single.adjust(module_id, d1 + d2).unwrap();

        prop_assert_eq!(stepwise, combined);
        prop_assert_eq!(split.offsets(), single.offsets());
    }

    /// Property: commit leaves the module at zero and nothing else moves.
    #[test]
    fn prop_commit_resets_only_target(
        count in module_count(),
        pick in any::<prop::sample::Index>(),
        deltas in prop::collection::vec(delta(), 72),
    ) {
        let module_id = pick.index(count);
        let mut state = CalibrationState::new(count);
        for (id, d) in deltas.iter().take(count).enumerate() {
            state.adjust(id, *d).unwrap();
        }
        let before = state.offsets();

        state.commit_as_zero(module_id).unwrap();

        prop_assert_eq!(state.offset(module_id).unwrap(), 0);
        prop_assert_eq!(state.phase(module_id).unwrap(), CalibrationPhase::Committed);
        for (id, offset) in state.offsets().into_iter().enumerate() {
            if id != module_id {
                prop_assert_eq!(offset, before[id]);
            }
        }
    }

    /// Property: forward-wrap steps are forward only and land on the same
    /// flap position as the requested delta.
    #[test]
    fn prop_forward_wrap_lands_on_same_position(d in delta()) {
        let steps = device_steps(d, NegativeDeltaMode::ForwardWrap);

        if d >= 0 {
            prop_assert_eq!(steps, if d == 0 { vec![] } else { vec![d] });
        } else {
            prop_assert!(steps.iter().all(|&s| s == 5 || s == 1));
            prop_assert!(steps.len() <= 5);
            let total: i32 = steps.iter().sum();
            prop_assert_eq!(total.rem_euclid(10), d.rem_euclid(10));
        }
    }

    /// Property: native mode forwards every non-zero delta untouched.
    #[test]
    fn prop_native_is_identity(d in delta()) {
        let steps = device_steps(d, NegativeDeltaMode::Native);
        prop_assert_eq!(steps.len(), usize::from(d != 0));
        prop_assert!(steps.iter().all(|&s| s == d));
    }

    /// Property: a save report has exactly one entry per module, ascending.
    #[test]
    fn prop_save_report_covers_every_module(
        count in module_count(),
        reply in outcomes(),
    ) {
        let report = save_report(count, reply.clone());

        prop_assert_eq!(report.len(), count);
        for (index, result) in report.iter().enumerate() {
            prop_assert_eq!(result.module_id, index);
            prop_assert_eq!(result.ok, result.error.is_none());

            let first = reply.iter().find(|o| o.module_id == index);
            prop_assert_eq!(result.ok, first.is_some_and(|o| o.ok));
        }
    }
}
