//! Observed and expected disagreement.
//!
//! Notation: a unit's pairability `m` is its number of non-missing values.
//! Units with `m < 2` are skipped. For the rest, every unordered pair of
//! values `(a, b)` contributes `w[a] * w[b] * d(a, b) / (m - 1)`, and
//!
//! ```text
//! D_o = Σ pair terms / Σ m
//! D_e = Σ_{ordered (c, k)} d(c, k) · n_c · n_k / (2 · N · (N - 1))
//! ```
//!
//! where `n_c` counts value `c` over all `N` non-missing cells. The factor 2
//! puts `D_e` on the same unordered-pair footing as `D_o`, so unweighted
//! results match the textbook coefficient.

use tracing::{debug, warn};

use crate::distance::DistanceStrategy;
use crate::error::ReliabilityError;
use crate::matrix::ReliabilityMatrix;

/// Hard minimum number of annotators.
pub const MIN_ANNOTATORS: usize = 3;
/// Hard minimum number of units.
pub const MIN_UNITS: usize = 3;

/// Contribution of one category (a coded value) to each disagreement.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDisagreement {
    pub value: f64,
    pub observed: f64,
    pub expected: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Disagreement {
    pub observed: f64,
    pub expected: f64,
    /// Σ m over contributing units.
    pub pairable_values: usize,
    pub contributing_units: usize,
    /// N: all non-missing cells.
    pub total_values: usize,
    /// Present for categorical strategies. Each entry is the category's share
    /// of `observed` / `expected` under the global denominators, not a mean
    /// over that category's own pairs, so the entries sum to the totals.
    pub per_category: Option<Vec<CategoryDisagreement>>,
}

/// Value census over all non-missing cells, sorted by value.
struct Census {
    values: Vec<f64>,
    counts: Vec<f64>,
    total: usize,
}

impl Census {
    fn of(matrix: &ReliabilityMatrix) -> Self {
        let mut all: Vec<f64> = matrix.values().iter().flatten().copied().collect();
        all.sort_by(f64::total_cmp);
        let total = all.len();
        let mut values: Vec<f64> = Vec::new();
        let mut counts: Vec<f64> = Vec::new();
        for v in all {
            match values.last() {
                Some(last) if *last == v => {
                    if let Some(c) = counts.last_mut() {
                        *c += 1.0;
                    }
                }
                _ => {
                    values.push(v);
                    counts.push(1.0);
                }
            }
        }
        Self {
            values,
            counts,
            total,
        }
    }

    fn index(&self, value: f64) -> Option<usize> {
        self.values.binary_search_by(|v| v.total_cmp(&value)).ok()
    }
}

/// Compute observed and expected disagreement for `matrix`.
///
/// `weights` holds one weight per annotator row.
pub fn compute_disagreement(
    matrix: &ReliabilityMatrix,
    strategy: &DistanceStrategy,
    weights: &[f64],
) -> Result<Disagreement, ReliabilityError> {
    matrix.ensure_min_shape()?;
    if weights.len() != matrix.n_annotators() {
        return Err(ReliabilityError::Shape(format!(
            "{} weights for {} annotators",
            weights.len(),
            matrix.n_annotators()
        )));
    }
    for (annotator, &weight) in matrix.annotators().iter().zip(weights) {
        if !weight.is_finite() || weight < 0.0 {
            return Err(ReliabilityError::InvalidWeight {
                annotator: annotator.clone(),
                weight,
            });
        }
    }

    let census = Census::of(matrix);
    let decompose = strategy.decomposes();
    let n_categories = census.values.len();
    let mut observed_by_category = vec![0.0; n_categories];
    let mut expected_by_category = vec![0.0; n_categories];

    // ---------------------------------------------------------------------
    // Observed: within-unit pairs
    // ---------------------------------------------------------------------
    let mut observed_sum = 0.0;
    let mut pairable_values = 0usize;
    let mut contributing_units = 0usize;
    let mut skipped_units = 0usize;

    for unit in 0..matrix.n_units() {
        let values = matrix.unit_values(unit);
        let m = values.len();
        if m < 2 {
            skipped_units += 1;
            continue;
        }
        pairable_values += m;
        contributing_units += 1;
        let norm = (m - 1) as f64;

        for i in 0..m {
            let (ai, vi) = values[i];
            for &(aj, vj) in &values[i + 1..] {
                let term = weights[ai] * weights[aj] * strategy.distance(vi, vj) / norm;
                observed_sum += term;
                if decompose && term != 0.0 {
                    let ci = census.index(vi).ok_or_else(|| census_miss(vi))?;
                    let cj = census.index(vj).ok_or_else(|| census_miss(vj))?;
                    observed_by_category[ci] += term / 2.0;
                    observed_by_category[cj] += term / 2.0;
                }
            }
        }
    }

    if skipped_units > 0 {
        warn!(
            skipped = skipped_units,
            "units with fewer than two values contribute nothing"
        );
    }

    let observed = if pairable_values > 0 {
        observed_sum / pairable_values as f64
    } else {
        0.0
    };

    // ---------------------------------------------------------------------
    // Expected: population-level pairs
    // ---------------------------------------------------------------------
    let n = census.total as f64;
    let mut expected = 0.0;
    if census.total >= 2 {
        let denom = 2.0 * n * (n - 1.0);
        let mut expected_sum = 0.0;
        for c in 0..n_categories {
            for k in 0..n_categories {
                if c == k {
                    continue;
                }
                let term = strategy.distance(census.values[c], census.values[k])
                    * census.counts[c]
                    * census.counts[k];
                expected_sum += term;
                if decompose {
                    expected_by_category[c] += term / 2.0;
                    expected_by_category[k] += term / 2.0;
                }
            }
        }
        expected = expected_sum / denom;
        for e in &mut expected_by_category {
            *e /= denom;
        }
    }

    if pairable_values > 0 {
        for o in &mut observed_by_category {
            *o /= pairable_values as f64;
        }
    }

    debug!(
        observed,
        expected,
        pairable_values,
        contributing_units,
        total_values = census.total,
        "computed disagreement"
    );

    let per_category = decompose.then(|| {
        census
            .values
            .iter()
            .zip(observed_by_category.iter().zip(&expected_by_category))
            .map(|(&value, (&observed, &expected))| CategoryDisagreement {
                value,
                observed,
                expected,
            })
            .collect()
    });

    Ok(Disagreement {
        observed,
        expected,
        pairable_values,
        contributing_units,
        total_values: census.total,
        per_category,
    })
}

fn census_miss(value: f64) -> ReliabilityError {
    ReliabilityError::MappingInconsistency(format!("value {value} missing from value census"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: &[Vec<Option<f64>>]) -> ReliabilityMatrix {
        ReliabilityMatrix::from_annotator_rows(rows).unwrap()
    }

    fn unit_weights(n: usize) -> Vec<f64> {
        vec![1.0; n]
    }

    #[test]
    fn identical_values_have_no_observed_disagreement() {
        let m = matrix(&[
            vec![Some(1.0), Some(2.0), Some(3.0)],
            vec![Some(1.0), Some(2.0), Some(3.0)],
            vec![Some(1.0), Some(2.0), Some(3.0)],
        ]);
        let d = compute_disagreement(&m, &DistanceStrategy::Nominal, &unit_weights(3)).unwrap();
        assert_eq!(d.observed, 0.0);
        assert!(d.expected > 0.0);
        assert_eq!(d.pairable_values, 9);
    }

    #[test]
    fn single_value_units_are_excluded_from_pairable_total() {
        let m = matrix(&[
            vec![Some(0.0), Some(0.0), Some(1.0)],
            vec![Some(1.0), None, Some(1.0)],
            vec![Some(0.0), None, Some(0.0)],
        ]);
        let d = compute_disagreement(&m, &DistanceStrategy::Nominal, &unit_weights(3)).unwrap();
        assert_eq!(d.contributing_units, 2);
        assert_eq!(d.pairable_values, 6);
        assert_eq!(d.total_values, 7);
    }

    #[test]
    fn per_category_sums_match_totals() {
        let m = matrix(&[
            vec![Some(0.0), Some(1.0), Some(2.0), Some(0.0)],
            vec![Some(1.0), Some(1.0), Some(2.0), None],
            vec![Some(0.0), Some(2.0), Some(0.0), Some(0.0)],
        ]);
        let strategy = DistanceStrategy::Ordinal {
            scale: vec![0.0, 1.0, 2.0],
        };
        let d = compute_disagreement(&m, &strategy, &unit_weights(3)).unwrap();
        let cats = d.per_category.unwrap();
        assert_eq!(cats.len(), 3);
        let obs: f64 = cats.iter().map(|c| c.observed).sum();
        let exp: f64 = cats.iter().map(|c| c.expected).sum();
        assert!((obs - d.observed).abs() < 1e-12);
        assert!((exp - d.expected).abs() < 1e-12);
    }

    #[test]
    fn numeric_strategies_do_not_decompose() {
        let m = matrix(&[
            vec![Some(1.0), Some(2.0), Some(3.0)],
            vec![Some(1.5), Some(2.0), Some(3.5)],
            vec![Some(1.0), Some(2.5), Some(3.0)],
        ]);
        let d = compute_disagreement(&m, &DistanceStrategy::Interval, &unit_weights(3)).unwrap();
        assert!(d.per_category.is_none());
    }

    #[test]
    fn zero_weight_silences_an_annotator() {
        let m = matrix(&[
            vec![Some(0.0), Some(1.0), Some(0.0)],
            vec![Some(0.0), Some(1.0), Some(0.0)],
            vec![Some(1.0), Some(0.0), Some(1.0)],
        ]);
        let d = compute_disagreement(&m, &DistanceStrategy::Nominal, &[1.0, 1.0, 0.0]).unwrap();
        assert_eq!(d.observed, 0.0);
    }

    #[test]
    fn weight_count_must_match_annotators() {
        let m = matrix(&[
            vec![Some(0.0), Some(1.0), Some(0.0)],
            vec![Some(0.0), Some(1.0), Some(0.0)],
            vec![Some(1.0), Some(0.0), Some(1.0)],
        ]);
        let err = compute_disagreement(&m, &DistanceStrategy::Nominal, &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, ReliabilityError::Shape(_)));
        let err = compute_disagreement(&m, &DistanceStrategy::Nominal, &[1.0, -0.5, 1.0]).unwrap_err();
        assert!(matches!(err, ReliabilityError::InvalidWeight { .. }));
    }

    #[test]
    fn fewer_than_two_values_gives_zero_expected() {
        let m = matrix(&[
            vec![Some(1.0), None, None],
            vec![None, None, None],
            vec![None, None, None],
        ]);
        let d = compute_disagreement(&m, &DistanceStrategy::Nominal, &unit_weights(3)).unwrap();
        assert_eq!(d.expected, 0.0);
        assert_eq!(d.observed, 0.0);
        assert_eq!(d.pairable_values, 0);
    }
}
