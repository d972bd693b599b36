//! Per-annotator weights.
//!
//! Weights are keyed by a normalized annotator name so that the spellings
//! used in config files and CLI flags (`Annotator_1`, `annotator one`,
//! `annotator01`) find the column they refer to.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::error::ReliabilityError;

static SEPARATOR_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\s_\-.]+").expect("valid regex"));
static LETTER_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z])([0-9])").expect("valid regex"));
static DIGIT_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"([0-9])([a-z])").expect("valid regex"));

const NUMBER_WORDS: [&str; 20] = [
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten", "eleven",
    "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen", "nineteen",
    "twenty",
];

/// Canonical identity for an annotator name.
///
/// Lowercases, collapses whitespace/underscore/hyphen/dot runs to one space,
/// splits letter-digit boundaries, spells number words one..twenty as digits
/// and drops leading zeros.
pub fn normalize_annotator_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let spaced = SEPARATOR_RUNS.replace_all(&lowered, " ");
    let spaced = LETTER_DIGIT.replace_all(&spaced, "$1 $2");
    let spaced = DIGIT_LETTER.replace_all(&spaced, "$1 $2");

    spaced
        .split_whitespace()
        .map(|token| {
            if let Some(idx) = NUMBER_WORDS.iter().position(|w| *w == token) {
                return (idx + 1).to_string();
            }
            if token.chars().all(|c| c.is_ascii_digit()) {
                let trimmed = token.trim_start_matches('0');
                return if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() };
            }
            token.to_string()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotatorWeights {
    by_name: BTreeMap<String, f64>,
    /// Raw spelling of each key, for log messages.
    raw_names: BTreeMap<String, String>,
}

impl AnnotatorWeights {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map<I, S>(weights: I) -> Result<Self, ReliabilityError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut out = Self::new();
        for (name, weight) in weights {
            out.insert(name.as_ref(), weight)?;
        }
        Ok(out)
    }

    /// Add a weight. Two spellings of the same annotator must agree.
    pub fn insert(&mut self, name: &str, weight: f64) -> Result<(), ReliabilityError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ReliabilityError::InvalidWeight {
                annotator: name.to_string(),
                weight,
            });
        }
        let key = normalize_annotator_name(name);
        if let Some(&first) = self.by_name.get(&key) {
            if first != weight {
                return Err(ReliabilityError::ConflictingWeight {
                    annotator: name.to_string(),
                    first,
                    second: weight,
                });
            }
            return Ok(());
        }
        self.raw_names.insert(key.clone(), name.to_string());
        self.by_name.insert(key, weight);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Weight for `annotator`, 1.0 when unset.
    pub fn weight_for(&self, annotator: &str) -> f64 {
        self.by_name
            .get(&normalize_annotator_name(annotator))
            .copied()
            .unwrap_or(1.0)
    }

    /// One weight per annotator, in order. Keys matching none of the
    /// annotators are logged and ignored.
    pub fn resolve(&self, annotators: &[String]) -> Vec<f64> {
        let normalized: Vec<String> = annotators
            .iter()
            .map(|a| normalize_annotator_name(a))
            .collect();
        for (key, raw) in &self.raw_names {
            if !normalized.contains(key) {
                warn!(annotator = %raw, "weight given for an annotator that is not in the data");
            }
        }
        normalized
            .iter()
            .map(|key| self.by_name.get(key).copied().unwrap_or(1.0))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spellings_of_the_same_annotator_normalize_equal() {
        for raw in ["Annotator_1", "annotator 1", "Annotator one", "annotator01", " ANNOTATOR-1 "] {
            assert_eq!(normalize_annotator_name(raw), "annotator 1", "{raw}");
        }
    }

    #[test]
    fn normalization_keeps_distinct_annotators_distinct() {
        assert_eq!(normalize_annotator_name("annotator_10"), "annotator 10");
        assert_eq!(normalize_annotator_name("annotator twelve"), "annotator 12");
        assert_eq!(normalize_annotator_name("rater.b"), "rater b");
        assert_ne!(normalize_annotator_name("annotator1"), normalize_annotator_name("annotator2"));
        assert_eq!(normalize_annotator_name("annotator_0"), "annotator 0");
    }

    #[test]
    fn weights_resolve_by_normalized_name() {
        let w = AnnotatorWeights::from_map([("Annotator one", 0.5), ("annotator_3", 2.0)]).unwrap();
        let cols = vec![
            "annotator_1".to_string(),
            "annotator_2".to_string(),
            "Annotator3".to_string(),
        ];
        assert_eq!(w.resolve(&cols), vec![0.5, 1.0, 2.0]);
        assert_eq!(w.weight_for("ANNOTATOR 01"), 0.5);
    }

    #[test]
    fn negative_and_non_finite_weights_are_rejected() {
        assert!(matches!(
            AnnotatorWeights::from_map([("a", -1.0)]),
            Err(ReliabilityError::InvalidWeight { .. })
        ));
        assert!(matches!(
            AnnotatorWeights::from_map([("a", f64::NAN)]),
            Err(ReliabilityError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn conflicting_spellings_are_rejected() {
        let err = AnnotatorWeights::from_map([("annotator_1", 0.5), ("Annotator one", 0.7)]).unwrap_err();
        assert!(matches!(err, ReliabilityError::ConflictingWeight { first, second, .. }
            if first == 0.5 && second == 0.7));
        // Same weight under two spellings is fine.
        let ok = AnnotatorWeights::from_map([("annotator_1", 0.5), ("annotator01", 0.5)]).unwrap();
        assert_eq!(ok.len(), 1);
    }
}
