//! Error types for the reliability engine.

use thiserror::Error;

use crate::schema::DataType;

/// Errors raised while validating input or computing alpha.
///
/// Every variant is fatal and names the precondition that was violated.
/// Degenerate-but-valid inputs (all values identical, single-value units)
/// are not errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReliabilityError {
    /// Fewer annotator columns or matrix rows than the hard minimum.
    #[error("at least {required} annotators are required for reliability assessment, found {found}")]
    InsufficientAnnotators { found: usize, required: usize },

    /// Fewer units than the hard minimum.
    #[error("at least {required} units are required for reliability assessment, found {found}")]
    InsufficientUnits { found: usize, required: usize },

    #[error("annotator column listed more than once: {column}")]
    DuplicateAnnotator { column: String },

    #[error("unknown column: {column}")]
    UnknownColumn { column: String },

    /// No column matched the aliases for `role`; the caller must name it.
    #[error("could not detect the {role} column; specify it explicitly")]
    UndetectedColumn { role: String },

    #[error("unsupported data type '{0}': must be one of nominal, ordinal, interval, ratio")]
    UnsupportedDataType(String),

    /// A label that interval/ratio data requires to be numeric is not.
    #[error("non-numeric value {value:?} in column {column} (row {row}) for {data_type} data")]
    NonNumericValue {
        column: String,
        row: usize,
        value: String,
        data_type: DataType,
    },

    #[error("negative value {value} in column {column} (row {row}) is not valid ratio data")]
    NegativeRatioValue {
        column: String,
        row: usize,
        value: f64,
    },

    /// Caller bug: the mapping and the matrix disagree.
    #[error("label mapping inconsistency: {0}")]
    MappingInconsistency(String),

    #[error("invalid weight {weight} for annotator {annotator}: weights must be finite and >= 0")]
    InvalidWeight { annotator: String, weight: f64 },

    #[error("annotator {annotator} was given two different weights ({first} and {second})")]
    ConflictingWeight {
        annotator: String,
        first: f64,
        second: f64,
    },

    #[error("invalid ordinal scale: {0}")]
    InvalidScale(String),

    #[error("shape error: {0}")]
    Shape(String),
}
