#![forbid(unsafe_code)]

//! # krippendorff-alpha
//!
//! Chance-corrected agreement for annotation pipelines.
//!
//! Given a table of labels produced by three or more annotators over a shared
//! set of units, this crate builds an annotator × unit reliability matrix and
//! computes Krippendorff's alpha for nominal, ordinal, interval or ratio data,
//! with optional annotator weights and a per-category breakdown for
//! categorical scales.
//!
//! Data flows strictly one way:
//! label mapping → reliability matrix → distance strategy + disagreement → alpha.
//! Nothing is cached between calls; every computation builds its own
//! [`LabelMapping`] and threads it through explicitly.
//!
//! ```rust,ignore
//! use krippendorff_alpha::{compute_alpha, AlphaConfig, AlphaRequest, AnnotationTable, DataType};
//!
//! let table = AnnotationTable::new(columns, rows)?;
//! let request = AlphaRequest::new(DataType::Nominal, vec!["a1".into(), "a2".into(), "a3".into()]);
//! let result = compute_alpha(&table, &request, &AlphaConfig::default())?;
//! println!("alpha = {}", result.alpha);
//! ```

pub mod alpha;
pub mod compute;
pub mod config;
pub mod detect;
pub mod disagreement;
pub mod distance;
pub mod error;
pub mod ingest;
pub mod mapping;
pub mod matrix;
pub mod report;
pub mod scales;
pub mod schema;
pub mod table;
pub mod update;
pub mod weights;

pub use alpha::{alpha_from_disagreement, krippendorff_alpha, round_to, AlphaResult, CategoryScore};
pub use compute::{compute_alpha, compute_alpha_run, AlphaRequest, AlphaRun};
pub use config::{AlphaConfig, ConfigError};
pub use disagreement::{compute_disagreement, Disagreement, MIN_ANNOTATORS, MIN_UNITS};
pub use distance::{
    interval_distance, nominal_distance, ordinal_distance, ratio_distance, DistanceStrategy,
};
pub use error::ReliabilityError;
pub use ingest::{load_table, IngestError};
pub use mapping::{LabelMapping, MappingSource};
pub use matrix::ReliabilityMatrix;
pub use scales::{OrdinalScale, ScaleLibrary};
pub use schema::{AnnotationLevel, ColumnMapping, DataType, MissingValuePolicy};
pub use table::{AnnotationTable, Cell};
pub use update::{
    update_annotations, InMemoryMatrixStore, MatrixStore, UpdateError, UpdateMode, UpdateType,
};
pub use weights::{normalize_annotator_name, AnnotatorWeights};
