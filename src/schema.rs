//! Shared vocabulary: measurement scales, missing-value policies, column mappings.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::disagreement::MIN_ANNOTATORS;
use crate::error::ReliabilityError;

/// Measurement scale of the annotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Nominal,
    Ordinal,
    Interval,
    Ratio,
}

impl DataType {
    pub const ALL: [DataType; 4] = [
        DataType::Nominal,
        DataType::Ordinal,
        DataType::Interval,
        DataType::Ratio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Nominal => "nominal",
            DataType::Ordinal => "ordinal",
            DataType::Interval => "interval",
            DataType::Ratio => "ratio",
        }
    }

    /// Labels are categories (mapped to codes) rather than measurements.
    /// Only categorical scales get a per-category breakdown.
    pub fn is_categorical(self) -> bool {
        matches!(self, DataType::Nominal | DataType::Ordinal)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ReliabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nominal" => Ok(DataType::Nominal),
            "ordinal" => Ok(DataType::Ordinal),
            "interval" => Ok(DataType::Interval),
            "ratio" => Ok(DataType::Ratio),
            _ => Err(ReliabilityError::UnsupportedDataType(s.to_string())),
        }
    }
}

/// What to do with missing annotator cells before the matrix is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value", rename_all = "snake_case")]
pub enum MissingValuePolicy {
    /// Keep missing cells; they become non-pairable values.
    #[default]
    Ignore,
    /// Remove every unit (row) with at least one missing annotator value.
    #[serde(rename = "drop")]
    DropUnits,
    /// Replace missing annotator cells with this label.
    Fill(String),
}

/// Granularity of the annotated units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationLevel {
    /// One unit per text/sentence/document.
    #[default]
    TextLevel,
    /// One unit per token within a text.
    TokenLevel,
}

/// Which table columns hold the unit identity and the annotators' labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub text_col: Option<String>,
    #[serde(default)]
    pub word_col: Option<String>,
    pub annotator_cols: Vec<String>,
}

impl ColumnMapping {
    /// Validates that at least three distinct annotator columns are given.
    pub fn new(
        text_col: Option<String>,
        annotator_cols: Vec<String>,
    ) -> Result<Self, ReliabilityError> {
        validate_annotator_cols(&annotator_cols)?;
        Ok(Self {
            text_col,
            word_col: None,
            annotator_cols,
        })
    }

    pub fn with_word_col(mut self, word_col: Option<String>) -> Self {
        self.word_col = word_col;
        self
    }

    /// Columns identifying a unit, in join order.
    pub fn key_cols(&self) -> Vec<&str> {
        self.text_col
            .iter()
            .chain(self.word_col.iter())
            .map(String::as_str)
            .collect()
    }
}

pub(crate) fn validate_annotator_cols(cols: &[String]) -> Result<(), ReliabilityError> {
    if cols.len() < MIN_ANNOTATORS {
        return Err(ReliabilityError::InsufficientAnnotators {
            found: cols.len(),
            required: MIN_ANNOTATORS,
        });
    }
    let mut seen = HashSet::new();
    for col in cols {
        if !seen.insert(col.as_str()) {
            return Err(ReliabilityError::DuplicateAnnotator {
                column: col.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_parses_case_insensitively() {
        assert_eq!("Ordinal".parse::<DataType>().unwrap(), DataType::Ordinal);
        assert_eq!(" RATIO ".parse::<DataType>().unwrap(), DataType::Ratio);
        assert!(matches!(
            "likert".parse::<DataType>(),
            Err(ReliabilityError::UnsupportedDataType(s)) if s == "likert"
        ));
    }

    #[test]
    fn only_nominal_and_ordinal_are_categorical() {
        let categorical: Vec<DataType> = DataType::ALL
            .into_iter()
            .filter(|dt| dt.is_categorical())
            .collect();
        assert_eq!(categorical, vec![DataType::Nominal, DataType::Ordinal]);
    }

    #[test]
    fn column_mapping_rejects_two_annotators() {
        let err = ColumnMapping::new(None, vec!["a".into(), "b".into()]).unwrap_err();
        assert_eq!(
            err,
            ReliabilityError::InsufficientAnnotators {
                found: 2,
                required: 3
            }
        );
    }

    #[test]
    fn column_mapping_rejects_duplicates() {
        let err =
            ColumnMapping::new(None, vec!["a".into(), "b".into(), "a".into()]).unwrap_err();
        assert!(matches!(err, ReliabilityError::DuplicateAnnotator { column } if column == "a"));
    }

    #[test]
    fn missing_policy_serde_shape() {
        let fill: MissingValuePolicy =
            serde_json::from_str(r#"{"strategy":"fill","value":"unknown"}"#).unwrap();
        assert_eq!(fill, MissingValuePolicy::Fill("unknown".into()));
        let drop: MissingValuePolicy = serde_json::from_str(r#"{"strategy":"drop"}"#).unwrap();
        assert_eq!(drop, MissingValuePolicy::DropUnits);
    }
}
