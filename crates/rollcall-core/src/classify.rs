//! Reply classifier - normalize free-form inbound text into a decision
//!
//! Pure and total: every input, including absent text, maps to exactly one of
//! `Yes`, `No`, `Invalid`. No I/O, no side effects.

use crate::contact::Decision;
use crate::text::normalize_token;

/// Accepted affirmative tokens, after diacritic stripping ("sí" becomes "si")
const YES_TOKENS: &[&str] = &["si", "yes", "y"];

/// Accepted negative tokens
const NO_TOKENS: &[&str] = &["no", "n"];

/// Outcome of classifying an inbound reply text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// An affirmative answer
    Yes,
    /// A negative answer
    No,
    /// Anything else: empty, absent, or free text that is not an answer
    Invalid,
}

impl Classification {
    /// The decision this classification carries, if it is one
    #[must_use]
    pub fn decision(&self) -> Option<Decision> {
        match self {
            Self::Yes => Some(Decision::Yes),
            Self::No => Some(Decision::No),
            Self::Invalid => None,
        }
    }
}

/// Classify an inbound reply text.
///
/// Normalization: trim, case-fold, strip vowel diacritics. The decision token
/// is the leading whitespace-delimited word with surrounding punctuation
/// trimmed, so "Sí, confirmo" counts as a yes while "tal vez" stays invalid.
#[must_use]
pub fn classify(raw_text: Option<&str>) -> Classification {
    let Some(raw) = raw_text else {
        return Classification::Invalid;
    };

    let normalized = normalize_token(raw);
    let token = normalized
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_matches(|c: char| !c.is_alphanumeric());

    if token.is_empty() {
        Classification::Invalid
    } else if YES_TOKENS.contains(&token) {
        Classification::Yes
    } else if NO_TOKENS.contains(&token) {
        Classification::No
    } else {
        Classification::Invalid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_normalization_equivalence() {
        for input in ["Sí", "si", "SÍ", " sí ", "SI", "yes", "Y"] {
            assert_eq!(classify(Some(input)), Classification::Yes, "input = {input:?}");
        }
    }

    #[test]
    fn test_no_variants() {
        for input in ["No", "no", "NO", " n "] {
            assert_eq!(classify(Some(input)), Classification::No, "input = {input:?}");
        }
    }

    #[test]
    fn test_leading_word_with_punctuation() {
        assert_eq!(classify(Some("Sí, confirmo")), Classification::Yes);
        assert_eq!(classify(Some("No puedo ❌")), Classification::No);
        assert_eq!(classify(Some("tal vez")), Classification::Invalid);
    }

    #[test]
    fn test_absent_and_empty_are_invalid() {
        assert_eq!(classify(None), Classification::Invalid);
        assert_eq!(classify(Some("")), Classification::Invalid);
        assert_eq!(classify(Some("   ")), Classification::Invalid);
    }

    #[test]
    fn test_totality_over_odd_strings() {
        for input in ["¿?", "🙂🙂🙂", "sí́́", "y e s", "nope", "siesta", "no-show", "\u{0}"] {
            // Must return one of the three variants without panicking
            let _ = classify(Some(input));
        }
        // Near-misses must not be accepted
        assert_eq!(classify(Some("siesta")), Classification::Invalid);
        assert_eq!(classify(Some("nope")), Classification::Invalid);
    }

    #[test]
    fn test_decision_mapping() {
        assert_eq!(classify(Some("sí")).decision(), Some(Decision::Yes));
        assert_eq!(classify(Some("n")).decision(), Some(Decision::No));
        assert_eq!(classify(Some("quizás")).decision(), None);
    }
}
