//! End-to-end computation: table in, alpha out.
//!
//! Steps, in order: validate the annotator columns, apply the missing-value
//! policy, build the label mapping, build the matrix, select the distance
//! strategy, resolve weights, compute disagreement, aggregate.

use serde::Serialize;
use tracing::info;

use crate::alpha::{assemble_result, AlphaResult};
use crate::config::AlphaConfig;
use crate::disagreement::compute_disagreement;
use crate::distance::DistanceStrategy;
use crate::error::ReliabilityError;
use crate::mapping::{LabelMapping, MappingSource};
use crate::matrix::ReliabilityMatrix;
use crate::schema::{validate_annotator_cols, DataType, MissingValuePolicy};
use crate::table::AnnotationTable;
use crate::weights::AnnotatorWeights;

/// What to compute over a table.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphaRequest {
    pub data_type: DataType,
    pub annotator_cols: Vec<String>,
    /// Falls back to the configured policy when `None`.
    pub missing_value_policy: Option<MissingValuePolicy>,
    /// Explicit ordinal scale, lowest first.
    pub ordinal_scale: Option<Vec<String>>,
    pub weights: AnnotatorWeights,
}

impl AlphaRequest {
    pub fn new(data_type: DataType, annotator_cols: Vec<String>) -> Self {
        Self {
            data_type,
            annotator_cols,
            missing_value_policy: None,
            ordinal_scale: None,
            weights: AnnotatorWeights::default(),
        }
    }

    pub fn with_missing_value_policy(mut self, policy: MissingValuePolicy) -> Self {
        self.missing_value_policy = Some(policy);
        self
    }

    pub fn with_ordinal_scale(mut self, scale: Vec<String>) -> Self {
        self.ordinal_scale = Some(scale);
        self
    }

    pub fn with_weights(mut self, weights: AnnotatorWeights) -> Self {
        self.weights = weights;
        self
    }
}

/// Result plus the context needed to report on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlphaRun {
    #[serde(flatten)]
    pub result: AlphaResult,
    pub data_type: DataType,
    pub annotators: Vec<String>,
    pub units: usize,
    pub contributing_units: usize,
    pub pairable_values: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_source: Option<MappingSource>,
}

pub fn compute_alpha(
    table: &AnnotationTable,
    request: &AlphaRequest,
    config: &AlphaConfig,
) -> Result<AlphaResult, ReliabilityError> {
    compute_alpha_run(table, request, config).map(|run| run.result)
}

pub fn compute_alpha_run(
    table: &AnnotationTable,
    request: &AlphaRequest,
    config: &AlphaConfig,
) -> Result<AlphaRun, ReliabilityError> {
    let cols = &request.annotator_cols;
    validate_annotator_cols(cols)?;
    for col in cols {
        table.require_column(col)?;
    }

    let policy = request
        .missing_value_policy
        .as_ref()
        .unwrap_or(&config.missing_value_policy);
    let prepared = table.apply_missing_policy(policy, cols)?;

    let library = config.scale_library();
    let mapping = LabelMapping::for_data_type(
        &prepared,
        cols,
        request.data_type,
        request.ordinal_scale.as_deref(),
        &library,
    )?;
    let matrix = ReliabilityMatrix::from_table(&prepared, cols, request.data_type, mapping.as_ref())?;
    matrix.ensure_min_shape()?;

    let strategy = DistanceStrategy::for_data_type(request.data_type, mapping.as_ref())?;
    let weights = request.weights.resolve(matrix.annotators());
    let disagreement = compute_disagreement(&matrix, &strategy, &weights)?;
    let result = assemble_result(&disagreement, mapping.as_ref(), config.precision)?;

    info!(
        data_type = %request.data_type,
        alpha = result.alpha,
        units = matrix.n_units(),
        "computed krippendorff alpha"
    );

    Ok(AlphaRun {
        result,
        data_type: request.data_type,
        annotators: matrix.annotators().to_vec(),
        units: matrix.n_units(),
        contributing_units: disagreement.contributing_units,
        pairable_values: disagreement.pairable_values,
        mapping_source: mapping.map(|m| m.source().clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn cols() -> Vec<String> {
        vec!["a1".into(), "a2".into(), "a3".into()]
    }

    #[test]
    fn unknown_annotator_column_is_rejected() {
        let table = AnnotationTable::new(cols(), vec![]).unwrap();
        let request = AlphaRequest::new(
            DataType::Nominal,
            vec!["a1".into(), "a2".into(), "a9".into()],
        );
        let err = compute_alpha(&table, &request, &AlphaConfig::default()).unwrap_err();
        assert_eq!(err, ReliabilityError::UnknownColumn { column: "a9".into() });
    }

    #[test]
    fn drop_policy_can_leave_too_few_units() {
        let table = AnnotationTable::new(
            cols(),
            vec![
                vec!["x".into(), "x".into(), "x".into()],
                vec!["x".into(), Cell::Missing, "y".into()],
                vec!["y".into(), "y".into(), Cell::Missing],
            ],
        )
        .unwrap();
        let request = AlphaRequest::new(DataType::Nominal, cols())
            .with_missing_value_policy(MissingValuePolicy::DropUnits);
        let err = compute_alpha(&table, &request, &AlphaConfig::default()).unwrap_err();
        assert!(matches!(err, ReliabilityError::InsufficientUnits { found: 1, .. }));
    }

    #[test]
    fn run_reports_context() {
        let table = AnnotationTable::new(
            cols(),
            vec![
                vec!["x".into(), "x".into(), "x".into()],
                vec!["x".into(), "y".into(), "y".into()],
                vec!["y".into(), "y".into(), Cell::Missing],
            ],
        )
        .unwrap();
        let run = compute_alpha_run(
            &table,
            &AlphaRequest::new(DataType::Nominal, cols()),
            &AlphaConfig::default(),
        )
        .unwrap();
        assert_eq!(run.units, 3);
        assert_eq!(run.pairable_values, 8);
        assert_eq!(run.mapping_source, Some(MappingSource::Sorted));
        let json = serde_json::to_value(&run).unwrap();
        assert!(json.get("alpha").is_some());
        assert_eq!(json["data_type"], "nominal");
    }
}
