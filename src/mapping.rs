//! Label ↔ integer code mapping for categorical annotations.
//!
//! A mapping is built once per computation from the union of labels across
//! every annotator column, then passed explicitly to the matrix builder and to
//! the alpha aggregator (which uses the reverse direction to key per-category
//! scores). Nothing is cached between computations.
//!
//! Codes are ranks for ordinal data: when labels come from a scale, a label's
//! code is its 0-based position in that scale, so gaps are possible when only
//! part of a scale is observed. Labels outside the scale get codes after it
//! and fall back to nominal distance.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ReliabilityError;
use crate::scales::{normalize_label, OrdinalScale, ScaleLibrary};
use crate::schema::DataType;
use crate::table::AnnotationTable;

/// Where the ordering of the codes came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "scale", rename_all = "snake_case")]
pub enum MappingSource {
    /// Sorted label order (nominal data, or ordinal data with no known scale).
    Sorted,
    /// A scale from the library, by name.
    CanonicalScale(String),
    /// The caller supplied the scale.
    ExplicitScale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelMapping {
    data_type: DataType,
    forward: HashMap<String, usize>,
    reverse: BTreeMap<usize, String>,
    /// Codes `0..scale_len` are ranks; higher codes are off-scale labels.
    scale_len: usize,
    source: MappingSource,
}

impl LabelMapping {
    /// Build the mapping for `data_type` from the labels in `annotator_cols`.
    ///
    /// Returns `Ok(None)` for interval and ratio data, whose values are used
    /// as numbers directly.
    pub fn for_data_type(
        table: &AnnotationTable,
        annotator_cols: &[String],
        data_type: DataType,
        explicit_scale: Option<&[String]>,
        library: &ScaleLibrary,
    ) -> Result<Option<Self>, ReliabilityError> {
        if !data_type.is_categorical() {
            return Ok(None);
        }
        let mut labels = Vec::new();
        for col in annotator_cols {
            for cell in table.column(col)? {
                if let Some(label) = cell.as_label() {
                    labels.push(label);
                }
            }
        }
        Self::from_labels(labels, data_type, explicit_scale, library).map(Some)
    }

    /// Build from raw labels in observation order. Duplicates are expected.
    pub fn from_labels<I, S>(
        labels: I,
        data_type: DataType,
        explicit_scale: Option<&[String]>,
        library: &ScaleLibrary,
    ) -> Result<Self, ReliabilityError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if !data_type.is_categorical() {
            return Err(ReliabilityError::MappingInconsistency(format!(
                "{data_type} data is not mapped to codes"
            )));
        }

        // Distinct labels keyed by their lookup form, keeping the first spelling.
        let mut distinct: Vec<(String, String)> = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        for label in labels {
            let label = label.as_ref().trim();
            if label.is_empty() {
                continue;
            }
            let key = lookup_key(data_type, label);
            if !seen.contains_key(&key) {
                seen.insert(key.clone(), distinct.len());
                distinct.push((key, label.to_string()));
            }
        }

        let mapping = match data_type {
            DataType::Ordinal => Self::ordinal(distinct, explicit_scale, library)?,
            _ => Self::sorted(data_type, distinct),
        };

        debug!(
            data_type = %mapping.data_type,
            labels = mapping.len(),
            source = ?mapping.source,
            "built label mapping"
        );
        if mapping.len() < 2 {
            warn!(
                labels = mapping.len(),
                "fewer than two distinct labels; alpha is degenerate for this data"
            );
        }
        Ok(mapping)
    }

    fn sorted(data_type: DataType, mut distinct: Vec<(String, String)>) -> Self {
        sort_labels(data_type, &mut distinct);
        let mut mapping = Self::empty(data_type, MappingSource::Sorted);
        for (code, (key, label)) in distinct.into_iter().enumerate() {
            mapping.insert(key, label, code);
        }
        mapping.scale_len = mapping.len();
        mapping
    }

    fn ordinal(
        distinct: Vec<(String, String)>,
        explicit_scale: Option<&[String]>,
        library: &ScaleLibrary,
    ) -> Result<Self, ReliabilityError> {
        let (scale, source) = match explicit_scale {
            Some(labels) => {
                let scale = OrdinalScale::new("explicit", labels.to_vec());
                scale.validate()?;
                (scale, MappingSource::ExplicitScale)
            }
            None => {
                let observed = distinct.iter().map(|(_, label)| label.as_str());
                match library.find_match(observed) {
                    Some(scale) => (scale.clone(), MappingSource::CanonicalScale(scale.name.clone())),
                    None => {
                        if !distinct.is_empty() {
                            warn!(
                                labels = distinct.len(),
                                "ordinal labels match no known scale; using sorted order"
                            );
                        }
                        return Ok(Self::sorted(DataType::Ordinal, distinct));
                    }
                }
            }
        };

        let mut mapping = Self::empty(DataType::Ordinal, source);
        mapping.scale_len = scale.labels.len();
        let mut off_scale = Vec::new();
        for (key, label) in distinct {
            match scale.position(&label) {
                Some(rank) => mapping.insert(key, label, rank),
                None => off_scale.push((key, label)),
            }
        }
        if !off_scale.is_empty() {
            warn!(
                count = off_scale.len(),
                "labels outside the ordinal scale fall back to nominal distance"
            );
        }
        sort_labels(DataType::Ordinal, &mut off_scale);
        for (offset, (key, label)) in off_scale.into_iter().enumerate() {
            mapping.insert(key, label, scale.labels.len() + offset);
        }
        Ok(mapping)
    }

    fn empty(data_type: DataType, source: MappingSource) -> Self {
        Self {
            data_type,
            forward: HashMap::new(),
            reverse: BTreeMap::new(),
            scale_len: 0,
            source,
        }
    }

    fn insert(&mut self, key: String, label: String, code: usize) {
        self.forward.insert(key, code);
        self.reverse.insert(code, label);
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn source(&self) -> &MappingSource {
        &self.source
    }

    /// Code for `label`, `None` if the label was never observed.
    pub fn code(&self, label: &str) -> Option<usize> {
        self.forward.get(&lookup_key(self.data_type, label.trim())).copied()
    }

    /// Original label for `code`.
    pub fn label(&self, code: usize) -> Option<&str> {
        self.reverse.get(&code).map(String::as_str)
    }

    /// Reverse lookup for a matrix value; non-integral values never match.
    pub fn label_for_value(&self, value: f64) -> Option<&str> {
        if value < 0.0 || value.fract() != 0.0 {
            return None;
        }
        self.label(value as usize)
    }

    /// Number of distinct observed labels.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// `(code, label)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.reverse.iter().map(|(code, label)| (*code, label.as_str()))
    }

    /// Ranked codes for ordinal distance: position `i` holds code `i`.
    /// Off-scale codes are absent, so they compare nominally.
    pub fn ordinal_scale(&self) -> Vec<f64> {
        (0..self.scale_len).map(|code| code as f64).collect()
    }
}

fn lookup_key(data_type: DataType, label: &str) -> String {
    match data_type {
        DataType::Ordinal => normalize_label(label),
        _ => label.to_string(),
    }
}

/// Numeric order when every label parses as a number, otherwise string order.
/// Ordinal labels compare by their case-folded lookup key, nominal labels by
/// their spelling.
fn sort_labels(data_type: DataType, labels: &mut [(String, String)]) {
    let sort_key = |(key, label): &(String, String)| -> String {
        match data_type {
            DataType::Ordinal => key.clone(),
            _ => label.clone(),
        }
    };
    let numeric: Option<Vec<f64>> = labels
        .iter()
        .map(|(_, label)| label.parse::<f64>().ok().filter(|n| n.is_finite()))
        .collect();
    if numeric.is_some() {
        labels.sort_by(|(_, a), (_, b)| {
            let (a, b) = (a.parse::<f64>().unwrap_or(0.0), b.parse::<f64>().unwrap_or(0.0));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        });
    } else {
        labels.sort_by_key(sort_key);
    }
}
