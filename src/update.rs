//! Merging newly arrived annotations into a stored table.
//!
//! The engine never touches storage. This workflow loads the previously
//! saved table from a [`MatrixStore`], merges according to an update type,
//! saves the result and hands it back for recomputation.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::ReliabilityError;
use crate::schema::ColumnMapping;
use crate::table::{AnnotationTable, Cell};

const CLASH_SUFFIX: &str = "_new";

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("no text/word columns shared by both tables to merge new annotators on")]
    NoMergeColumns,
    #[error("duplicate unit key {key:?} in the {side} table; keys must be unique to merge")]
    DuplicateKeys { side: &'static str, key: String },
    #[error("new_doc_annotator update did not add any annotations in a new annotator column")]
    NoNewAnnotations,
    #[error(transparent)]
    Table(#[from] ReliabilityError),
    #[error("matrix store error: {0}")]
    Store(String),
}

/// How new data relates to what is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    /// Same annotators, more units.
    NewDoc,
    /// Same units, more annotators.
    NewAnnotator,
    /// Both at once.
    NewDocAnnotator,
    /// Unrelated task; replaces everything.
    NewTask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Pick the update type by comparing columns with the stored table.
    #[default]
    Auto,
    Manual(UpdateType),
}

/// Storage collaborator for the update workflow.
pub trait MatrixStore: Send + Sync {
    fn load_previous(&self) -> Result<Option<AnnotationTable>, UpdateError>;
    fn save(&self, table: &AnnotationTable) -> Result<(), UpdateError>;
}

/// Keeps every saved version in memory; the last one is "previous".
#[derive(Debug, Default)]
pub struct InMemoryMatrixStore {
    versions: Mutex<Vec<AnnotationTable>>,
}

impl InMemoryMatrixStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_previous(table: AnnotationTable) -> Self {
        Self {
            versions: Mutex::new(vec![table]),
        }
    }

    pub fn history(&self) -> Result<Vec<AnnotationTable>, UpdateError> {
        let versions = self
            .versions
            .lock()
            .map_err(|_| UpdateError::Store("store lock poisoned".to_string()))?;
        Ok(versions.clone())
    }
}

impl MatrixStore for InMemoryMatrixStore {
    fn load_previous(&self) -> Result<Option<AnnotationTable>, UpdateError> {
        let versions = self
            .versions
            .lock()
            .map_err(|_| UpdateError::Store("store lock poisoned".to_string()))?;
        Ok(versions.last().cloned())
    }

    fn save(&self, table: &AnnotationTable) -> Result<(), UpdateError> {
        let mut versions = self
            .versions
            .lock()
            .map_err(|_| UpdateError::Store("store lock poisoned".to_string()))?;
        versions.push(table.clone());
        Ok(())
    }
}

/// Merge `new` into `current` and save the result to `store`.
pub fn update_annotations(
    store: &dyn MatrixStore,
    current: &AnnotationTable,
    new: &AnnotationTable,
    mapping: &ColumnMapping,
    mode: UpdateMode,
) -> Result<AnnotationTable, UpdateError> {
    let previous = store.load_previous()?;

    let update_type = match mode {
        UpdateMode::Manual(update_type) => Some(update_type),
        UpdateMode::Auto => previous.as_ref().map(|prev| detect_update_type(prev, new)),
    };

    let updated = match update_type {
        // Nothing stored yet: the new data is the whole table.
        None => new.clone(),
        Some(UpdateType::NewTask) => new.clone(),
        Some(UpdateType::NewDoc) => current.concat(new),
        Some(UpdateType::NewAnnotator) => merge_new_annotators(current, new, mapping)?,
        Some(UpdateType::NewDocAnnotator) => append_new_docs_and_annotators(current, new)?,
    };

    info!(
        update_type = ?update_type,
        rows = updated.n_rows(),
        columns = updated.columns().len(),
        "updated annotation table"
    );
    store.save(&updated)?;
    Ok(updated)
}

fn detect_update_type(previous: &AnnotationTable, new: &AnnotationTable) -> UpdateType {
    let prev_cols: HashSet<&String> = previous.columns().iter().collect();
    let new_cols: HashSet<&String> = new.columns().iter().collect();
    let detected = if prev_cols == new_cols {
        UpdateType::NewDoc
    } else if new_cols.iter().any(|c| !prev_cols.contains(c)) {
        UpdateType::NewAnnotator
    } else {
        UpdateType::NewDocAnnotator
    };
    debug!(?detected, "auto-detected update type");
    detected
}

type UnitKey = Vec<Option<String>>;

fn unit_key(table: &AnnotationTable, row: usize, key_idx: &[usize]) -> UnitKey {
    key_idx
        .iter()
        .map(|&i| table.rows()[row][i].as_label())
        .collect()
}

fn describe_key(key: &UnitKey) -> String {
    key.iter()
        .map(|k| k.as_deref().unwrap_or("<missing>"))
        .collect::<Vec<_>>()
        .join(" / ")
}

fn index_keys(
    table: &AnnotationTable,
    key_idx: &[usize],
    side: &'static str,
) -> Result<HashMap<UnitKey, usize>, UpdateError> {
    let mut index = HashMap::new();
    for row in 0..table.n_rows() {
        let key = unit_key(table, row, key_idx);
        if index.contains_key(&key) {
            return Err(UpdateError::DuplicateKeys {
                side,
                key: describe_key(&key),
            });
        }
        index.insert(key, row);
    }
    Ok(index)
}

/// Left join of `new` onto `current` by the text (and word) columns.
fn merge_new_annotators(
    current: &AnnotationTable,
    new: &AnnotationTable,
    mapping: &ColumnMapping,
) -> Result<AnnotationTable, UpdateError> {
    let key_cols: Vec<&str> = mapping
        .key_cols()
        .into_iter()
        .filter(|c| current.has_column(c) && new.has_column(c))
        .collect();
    if key_cols.is_empty() {
        return Err(UpdateError::NoMergeColumns);
    }

    let current_idx: Vec<usize> = key_cols
        .iter()
        .map(|c| current.require_column(c))
        .collect::<Result<_, _>>()?;
    let new_idx: Vec<usize> = key_cols
        .iter()
        .map(|c| new.require_column(c))
        .collect::<Result<_, _>>()?;

    index_keys(current, &current_idx, "current")?;
    let new_rows = index_keys(new, &new_idx, "new")?;

    let mut merged = current.clone();
    for col in new.columns() {
        if key_cols.contains(&col.as_str()) {
            continue;
        }
        let name = if current.has_column(col) {
            format!("{col}{CLASH_SUFFIX}")
        } else {
            col.clone()
        };
        let src = new.require_column(col)?;
        let cells: Vec<Cell> = (0..current.n_rows())
            .map(|row| {
                new_rows
                    .get(&unit_key(current, row, &current_idx))
                    .map(|&r| new.rows()[r][src].clone())
                    .unwrap_or(Cell::Missing)
            })
            .collect();
        merged = merged.with_column(name, cells)?;
    }
    Ok(merged)
}

/// Union of columns with rows appended; must contribute to a new annotator column.
fn append_new_docs_and_annotators(
    current: &AnnotationTable,
    new: &AnnotationTable,
) -> Result<AnnotationTable, UpdateError> {
    let added_cols: Vec<&String> = new
        .columns()
        .iter()
        .filter(|c| !current.has_column(c))
        .collect();
    let contributes = added_cols.iter().any(|col| {
        new.column(col)
            .map(|cells| cells.iter().any(|c| !c.is_missing()))
            .unwrap_or(false)
    });
    if !contributes {
        return Err(UpdateError::NoNewAnnotations);
    }
    Ok(current.concat(new))
}
