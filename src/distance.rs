//! Distance metrics, one per measurement scale.
//!
//! All four are pure, symmetric, zero on equal inputs and total over their
//! domain. The engine selects one [`DistanceStrategy`] per computation.

use crate::error::ReliabilityError;
use crate::mapping::LabelMapping;
use crate::schema::DataType;

/// 0 when equal, 1 otherwise.
pub fn nominal_distance<T: PartialEq + ?Sized>(a: &T, b: &T) -> f64 {
    if a == b {
        0.0
    } else {
        1.0
    }
}

/// Squared difference of 0-based ranks in `scale`. If either value is not in
/// the scale the values are compared nominally.
pub fn ordinal_distance<T: PartialEq>(a: &T, b: &T, scale: &[T]) -> f64 {
    let rank = |v: &T| scale.iter().position(|s| s == v);
    match (rank(a), rank(b)) {
        (Some(ra), Some(rb)) => {
            let diff = ra as f64 - rb as f64;
            diff * diff
        }
        _ => nominal_distance(a, b),
    }
}

pub fn interval_distance(a: f64, b: f64) -> f64 {
    (a - b).powi(2)
}

/// `(a - b)^2 / (a + b)`, with 0 for equal values. The singular case
/// `a + b == 0, a != b` yields 0; negative ratio data never reaches here
/// because the matrix builder rejects it.
pub fn ratio_distance(a: f64, b: f64) -> f64 {
    if a == b {
        return 0.0;
    }
    let sum = a + b;
    if sum == 0.0 {
        return 0.0;
    }
    (a - b).powi(2) / sum
}

/// Distance function selected once per computation.
#[derive(Debug, Clone, PartialEq)]
pub enum DistanceStrategy {
    Nominal,
    /// `scale` lists the ranked codes in order.
    Ordinal { scale: Vec<f64> },
    Interval,
    Ratio,
}

impl DistanceStrategy {
    /// Strategy for `data_type`. Ordinal data takes its scale from the mapping.
    pub fn for_data_type(
        data_type: DataType,
        mapping: Option<&LabelMapping>,
    ) -> Result<Self, ReliabilityError> {
        match data_type {
            DataType::Nominal => Ok(DistanceStrategy::Nominal),
            DataType::Ordinal => {
                let mapping = mapping.ok_or_else(|| {
                    ReliabilityError::MappingInconsistency(
                        "ordinal data requires a label mapping".to_string(),
                    )
                })?;
                Ok(DistanceStrategy::Ordinal {
                    scale: mapping.ordinal_scale(),
                })
            }
            DataType::Interval => Ok(DistanceStrategy::Interval),
            DataType::Ratio => Ok(DistanceStrategy::Ratio),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            DistanceStrategy::Nominal => DataType::Nominal,
            DistanceStrategy::Ordinal { .. } => DataType::Ordinal,
            DistanceStrategy::Interval => DataType::Interval,
            DistanceStrategy::Ratio => DataType::Ratio,
        }
    }

    /// Whether results are broken down per category.
    pub fn decomposes(&self) -> bool {
        self.data_type().is_categorical()
    }

    pub fn distance(&self, a: f64, b: f64) -> f64 {
        match self {
            DistanceStrategy::Nominal => nominal_distance(&a, &b),
            DistanceStrategy::Ordinal { scale } => ordinal_distance(&a, &b, scale),
            DistanceStrategy::Interval => interval_distance(a, b),
            DistanceStrategy::Ratio => ratio_distance(a, b),
        }
    }
}
