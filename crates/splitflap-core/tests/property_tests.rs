//! Property-based tests for message normalization.
//!
//! These tests use proptest to generate arbitrary caller text and display
//! widths and verify that the normalizer's laws hold for all of them.

use proptest::prelude::*;
use splitflap_core::constants::DEFAULT_ALPHABET;
use splitflap_core::{DeviceAlphabet, Error, normalize};

/// Strategy for display widths seen on real hardware (1-72 modules).
fn module_count() -> impl Strategy<Value = usize> {
    1usize..=72
}

/// Strategy for non-empty text drawn only from the stock flap set.
fn alphabet_text() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(DEFAULT_ALPHABET.to_vec()), 1..100)
        .prop_map(|chars| chars.into_iter().collect())
}

/// Strategy for arbitrary non-empty text, including characters with no flap.
fn any_text() -> impl Strategy<Value = String> {
    prop::string::string_regex(".{1,100}").expect("Failed to create text regex strategy")
}

proptest! {
    /// Property: output length always equals the display width.
    #[test]
    fn prop_length_law(raw in alphabet_text(), count in module_count()) {
        let n = normalize(&raw, count, &DeviceAlphabet::default()).unwrap();
        prop_assert_eq!(n.message.len(), count);
        prop_assert_eq!(n.truncated, raw.chars().count() > count);
    }

    /// Property: a successful result has the right length even for arbitrary
    /// input, and every character is a flap.
    #[test]
    fn prop_success_is_well_formed(raw in any_text(), count in module_count()) {
        let alphabet = DeviceAlphabet::default();
        if let Ok(n) = normalize(&raw, count, &alphabet) {
            prop_assert_eq!(n.message.len(), count);
            prop_assert!(n.message.chars().iter().all(|c| alphabet.contains(*c)));
        }
    }

    /// Property: normalizing an already-normalized message returns it unchanged.
    #[test]
    fn prop_idempotent(raw in any_text(), count in module_count()) {
        let alphabet = DeviceAlphabet::default();
        if let Ok(first) = normalize(&raw, count, &alphabet) {
            let second = normalize(&first.message.as_string(), count, &alphabet).unwrap();
            prop_assert_eq!(&second.message, &first.message);
            prop_assert!(!second.truncated);
        }
    }

    /// Property: text made only of flaps never fails with InvalidCharacters.
    #[test]
    fn prop_alphabet_text_never_invalid(raw in alphabet_text(), count in module_count()) {
        let result = normalize(&raw, count, &DeviceAlphabet::default());
        prop_assert!(
            !matches!(result, Err(Error::InvalidCharacters { .. })),
            "alphabet-only text was rejected as invalid: {:?}",
            result
        );
    }

    /// Property: every reported invalid character really has no flap.
    #[test]
    fn prop_reported_characters_are_invalid(raw in any_text(), count in module_count()) {
        let alphabet = DeviceAlphabet::default();
        if let Err(Error::InvalidCharacters { invalid, alphabet: reported }) =
            normalize(&raw, count, &alphabet)
        {
            prop_assert!(!invalid.is_empty());
            prop_assert_eq!(reported.as_slice(), alphabet.chars());
            for c in invalid {
                prop_assert!(alphabet.resolve(c).is_none());
            }
        }
    }
}
