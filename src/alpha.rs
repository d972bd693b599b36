//! Alpha aggregation and the serialized result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::disagreement::{compute_disagreement, Disagreement};
use crate::distance::DistanceStrategy;
use crate::error::ReliabilityError;
use crate::mapping::LabelMapping;
use crate::matrix::ReliabilityMatrix;

/// Decimal places used when the caller does not choose.
pub const DEFAULT_PRECISION: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub observed_disagreement: f64,
    pub expected_disagreement: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlphaResult {
    pub alpha: f64,
    pub observed_disagreement: f64,
    pub expected_disagreement: f64,
    /// Keyed by original label; only for nominal and ordinal data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_category_scores: Option<BTreeMap<String, CategoryScore>>,
}

/// Round half away from zero to `precision` decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    let rounded = (value * factor).round() / factor;
    // Avoid reporting -0.0.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// `1 - D_o / D_e`, or 1.0 when there is no expected disagreement.
/// Not clamped: systematic disagreement yields negative values.
pub fn alpha_from_disagreement(observed: f64, expected: f64) -> f64 {
    if expected > 0.0 {
        1.0 - observed / expected
    } else {
        1.0
    }
}

/// Compute alpha for a prepared matrix.
///
/// `mapping` is required for per-category keys when the strategy is
/// categorical; every category value must reverse-map to a label.
pub fn krippendorff_alpha(
    matrix: &ReliabilityMatrix,
    strategy: &DistanceStrategy,
    weights: &[f64],
    mapping: Option<&LabelMapping>,
    precision: u32,
) -> Result<AlphaResult, ReliabilityError> {
    let disagreement = compute_disagreement(matrix, strategy, weights)?;
    assemble_result(&disagreement, mapping, precision)
}

pub(crate) fn assemble_result(
    disagreement: &Disagreement,
    mapping: Option<&LabelMapping>,
    precision: u32,
) -> Result<AlphaResult, ReliabilityError> {
    let alpha = alpha_from_disagreement(disagreement.observed, disagreement.expected);

    let per_category_scores = match &disagreement.per_category {
        None => None,
        Some(categories) => {
            let mapping = mapping.ok_or_else(|| {
                ReliabilityError::MappingInconsistency(
                    "per-category scores need a label mapping".to_string(),
                )
            })?;
            let mut scores = BTreeMap::new();
            for category in categories {
                let label = mapping.label_for_value(category.value).ok_or_else(|| {
                    ReliabilityError::MappingInconsistency(format!(
                        "no label for code {} in the label mapping",
                        category.value
                    ))
                })?;
                scores.insert(
                    label.to_string(),
                    CategoryScore {
                        observed_disagreement: round_to(category.observed, precision),
                        expected_disagreement: round_to(category.expected, precision),
                    },
                );
            }
            Some(scores)
        }
    };

    Ok(AlphaResult {
        alpha: round_to(alpha, precision),
        observed_disagreement: round_to(disagreement.observed, precision),
        expected_disagreement: round_to(disagreement.expected, precision),
        per_category_scores,
    })
}
