//! Annotator × unit reliability matrix.
//!
//! Axis order is fixed: row `a` is annotator `a`, column `u` is unit `u`.
//! Missing values are `None`. Callers that want one row per unit use
//! [`ReliabilityMatrix::to_unit_major`].

use nalgebra::DMatrix;
use tracing::debug;

use crate::disagreement::{MIN_ANNOTATORS, MIN_UNITS};
use crate::error::ReliabilityError;
use crate::mapping::LabelMapping;
use crate::schema::DataType;
use crate::table::AnnotationTable;

#[derive(Debug, Clone, PartialEq)]
pub struct ReliabilityMatrix {
    annotators: Vec<String>,
    values: DMatrix<Option<f64>>,
}

impl ReliabilityMatrix {
    /// `values` must have one row per annotator.
    pub fn new(
        annotators: Vec<String>,
        values: DMatrix<Option<f64>>,
    ) -> Result<Self, ReliabilityError> {
        if annotators.len() != values.nrows() {
            return Err(ReliabilityError::Shape(format!(
                "{} annotator names for {} matrix rows",
                annotators.len(),
                values.nrows()
            )));
        }
        if values.iter().flatten().any(|v| !v.is_finite()) {
            return Err(ReliabilityError::Shape(
                "matrix values must be finite".to_string(),
            ));
        }
        Ok(Self { annotators, values })
    }

    /// Build from one row per annotator. Annotators are named `annotator_<i>`.
    pub fn from_annotator_rows(rows: &[Vec<Option<f64>>]) -> Result<Self, ReliabilityError> {
        let n_units = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != n_units) {
            return Err(ReliabilityError::Shape(
                "annotator rows have different lengths".to_string(),
            ));
        }
        let values = DMatrix::from_fn(rows.len(), n_units, |a, u| rows[a][u]);
        let annotators = (1..=rows.len()).map(|i| format!("annotator_{i}")).collect();
        Self::new(annotators, values)
    }

    /// Build from the explicit (unit, annotator) layout.
    pub fn from_unit_major(
        annotators: Vec<String>,
        unit_major: &DMatrix<Option<f64>>,
    ) -> Result<Self, ReliabilityError> {
        Self::new(annotators, unit_major.transpose())
    }

    /// Build from the annotator columns of `table`.
    ///
    /// Categorical data is coded through `mapping`; labels it does not know
    /// become missing. Interval and ratio data must parse as finite numbers,
    /// and ratio data must be non-negative. No unit is dropped here.
    pub fn from_table(
        table: &AnnotationTable,
        annotator_cols: &[String],
        data_type: DataType,
        mapping: Option<&LabelMapping>,
    ) -> Result<Self, ReliabilityError> {
        let n_units = table.n_rows();
        let mut values = DMatrix::from_element(annotator_cols.len(), n_units, None);

        for (a, col) in annotator_cols.iter().enumerate() {
            let cells = table.column(col)?;
            for (u, cell) in cells.into_iter().enumerate() {
                values[(a, u)] = if data_type.is_categorical() {
                    let mapping = mapping.ok_or_else(|| {
                        ReliabilityError::MappingInconsistency(format!(
                            "{data_type} data requires a label mapping"
                        ))
                    })?;
                    cell.as_label()
                        .and_then(|label| mapping.code(&label))
                        .map(|code| code as f64)
                } else {
                    let value = cell.as_number().map_err(|raw| ReliabilityError::NonNumericValue {
                        column: col.clone(),
                        row: u,
                        value: raw,
                        data_type,
                    })?;
                    if let Some(v) = value {
                        if data_type == DataType::Ratio && v < 0.0 {
                            return Err(ReliabilityError::NegativeRatioValue {
                                column: col.clone(),
                                row: u,
                                value: v,
                            });
                        }
                    }
                    value
                };
            }
        }

        let matrix = Self::new(annotator_cols.to_vec(), values)?;
        debug!(
            annotators = matrix.n_annotators(),
            units = matrix.n_units(),
            non_missing = matrix.non_missing(),
            "built reliability matrix"
        );
        Ok(matrix)
    }

    pub fn annotators(&self) -> &[String] {
        &self.annotators
    }

    pub fn values(&self) -> &DMatrix<Option<f64>> {
        &self.values
    }

    pub fn n_annotators(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_units(&self) -> usize {
        self.values.ncols()
    }

    pub fn get(&self, annotator: usize, unit: usize) -> Option<f64> {
        if annotator < self.n_annotators() && unit < self.n_units() {
            self.values[(annotator, unit)]
        } else {
            None
        }
    }

    /// Non-missing values of unit `u` as `(annotator index, value)`.
    pub fn unit_values(&self, unit: usize) -> Vec<(usize, f64)> {
        self.values
            .column(unit)
            .iter()
            .enumerate()
            .filter_map(|(a, v)| v.map(|v| (a, v)))
            .collect()
    }

    /// Number of non-missing values in unit `u` (its pairability `m`).
    pub fn pairable_count(&self, unit: usize) -> usize {
        self.values.column(unit).iter().filter(|v| v.is_some()).count()
    }

    /// Total number of non-missing cells.
    pub fn non_missing(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// The (unit, annotator) transpose.
    pub fn to_unit_major(&self) -> DMatrix<Option<f64>> {
        self.values.transpose()
    }

    /// Enforce the hard minimum of annotators and units.
    pub fn ensure_min_shape(&self) -> Result<(), ReliabilityError> {
        if self.n_annotators() < MIN_ANNOTATORS {
            return Err(ReliabilityError::InsufficientAnnotators {
                found: self.n_annotators(),
                required: MIN_ANNOTATORS,
            });
        }
        if self.n_units() < MIN_UNITS {
            return Err(ReliabilityError::InsufficientUnits {
                found: self.n_units(),
                required: MIN_UNITS,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scales::ScaleLibrary;
    use crate::table::Cell;

    fn cols() -> Vec<String> {
        vec!["a1".into(), "a2".into(), "a3".into()]
    }

    fn table(rows: Vec<Vec<Cell>>) -> AnnotationTable {
        AnnotationTable::new(cols(), rows).unwrap()
    }

    #[test]
    fn categorical_cells_are_coded_through_mapping() {
        let t = table(vec![
            vec!["pos".into(), "neg".into(), Cell::Missing],
            vec!["neg".into(), "none".into(), "pos".into()],
        ]);
        let mapping =
            LabelMapping::for_data_type(&t, &cols(), DataType::Nominal, None, &ScaleLibrary::canonical())
                .unwrap()
                .unwrap();
        let m = ReliabilityMatrix::from_table(&t, &cols(), DataType::Nominal, Some(&mapping)).unwrap();
        assert_eq!(m.n_annotators(), 3);
        assert_eq!(m.n_units(), 2);
        assert_eq!(m.get(0, 0), Some(1.0));
        assert_eq!(m.get(1, 0), Some(0.0));
        assert_eq!(m.get(2, 0), None);
        assert_eq!(m.get(1, 1), None);
        assert_eq!(m.pairable_count(1), 2);
        assert_eq!(m.non_missing(), 4);
    }

    #[test]
    fn interval_rejects_text() {
        let t = table(vec![vec![Cell::Number(1.0), "two".into(), Cell::Number(3.0)]]);
        let err = ReliabilityMatrix::from_table(&t, &cols(), DataType::Interval, None).unwrap_err();
        assert!(matches!(
            err,
            ReliabilityError::NonNumericValue { ref column, row: 0, ref value, .. }
                if column == "a2" && value == "two"
        ));
    }

    #[test]
    fn ratio_rejects_negative_values() {
        let t = table(vec![vec![Cell::Number(1.0), Cell::Number(-2.0), Cell::Number(3.0)]]);
        let err = ReliabilityMatrix::from_table(&t, &cols(), DataType::Ratio, None).unwrap_err();
        assert!(matches!(err, ReliabilityError::NegativeRatioValue { value, .. } if value == -2.0));
        // Interval data may be negative.
        assert!(ReliabilityMatrix::from_table(&t, &cols(), DataType::Interval, None).is_ok());
    }

    #[test]
    fn numeric_text_is_accepted_for_interval() {
        let t = table(vec![vec!["1.5".into(), Cell::Number(2.0), "nan".into()]]);
        let m = ReliabilityMatrix::from_table(&t, &cols(), DataType::Interval, None).unwrap();
        assert_eq!(m.unit_values(0), vec![(0, 1.5), (1, 2.0)]);
    }

    #[test]
    fn unit_major_round_trip_preserves_axes() {
        let m = ReliabilityMatrix::from_annotator_rows(&[
            vec![Some(1.0), Some(2.0)],
            vec![Some(3.0), None],
            vec![None, Some(4.0)],
        ])
        .unwrap();
        let unit_major = m.to_unit_major();
        assert_eq!(unit_major.nrows(), 2);
        assert_eq!(unit_major.ncols(), 3);
        assert_eq!(unit_major[(0, 1)], Some(3.0));
        let back = ReliabilityMatrix::from_unit_major(m.annotators().to_vec(), &unit_major).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn min_shape_is_enforced() {
        let m = ReliabilityMatrix::from_annotator_rows(&[
            vec![Some(1.0), Some(1.0)],
            vec![Some(1.0), Some(1.0)],
            vec![Some(1.0), Some(1.0)],
        ])
        .unwrap();
        assert_eq!(
            m.ensure_min_shape().unwrap_err(),
            ReliabilityError::InsufficientUnits {
                found: 2,
                required: 3
            }
        );
    }

    #[test]
    fn categorical_without_mapping_is_inconsistent() {
        let t = table(vec![vec!["a".into(), "b".into(), "c".into()]]);
        let err = ReliabilityMatrix::from_table(&t, &cols(), DataType::Nominal, None).unwrap_err();
        assert!(matches!(err, ReliabilityError::MappingInconsistency(_)));
    }
}
