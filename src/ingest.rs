//! File loaders producing an [`AnnotationTable`].
//!
//! Supported layouts:
//!
//! - `.csv` / `.tsv`: header row, one row per unit, one column per annotator.
//! - `.json`: an array of entries (or a single entry), each with `text` and an
//!   `annotations` list of objects; every annotation object becomes one row
//!   carrying the entry's text. Entries without annotations give a text-only row.
//! - `.jsonl`: one entry per line. Annotations carrying `word` give one row
//!   per token with its `annotator_*` keys; annotations carrying `annotator`
//!   and `label` give one row per entry with a column per annotator.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ReliabilityError;
use crate::table::{AnnotationTable, Cell};

const TOKEN_KEYS: [&str; 2] = ["word", "token"];

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported file format {0:?}: expected csv, tsv, json or jsonl")]
    UnsupportedFormat(String),
    #[error("no annotation rows found in {0}")]
    Empty(String),
    #[error(transparent)]
    Table(#[from] ReliabilityError),
}

/// Load a table, choosing the parser from the file extension.
pub fn load_table(path: impl AsRef<Path>) -> Result<AnnotationTable, IngestError> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let io_err = |source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    };

    let table = match ext.as_str() {
        "csv" | "tsv" => {
            let file = std::fs::File::open(path).map_err(io_err)?;
            let delimiter = if ext == "tsv" { b'\t' } else { b',' };
            parse_delimited(std::io::BufReader::new(file), delimiter)?
        }
        "json" => parse_json(&std::fs::read_to_string(path).map_err(io_err)?)?,
        "jsonl" => parse_jsonl(&std::fs::read_to_string(path).map_err(io_err)?)?,
        other => return Err(IngestError::UnsupportedFormat(format!(".{other}"))),
    };

    if table.columns().is_empty() {
        return Err(IngestError::Empty(path.display().to_string()));
    }
    debug!(
        path = %path.display(),
        rows = table.n_rows(),
        columns = table.columns().len(),
        "loaded annotation table"
    );
    Ok(table)
}

/// Parse delimited text with a header row. Empty fields are missing and
/// numeric fields become numbers.
pub fn parse_delimited<R: Read>(reader: R, delimiter: u8) -> Result<AnnotationTable, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader);

    let columns: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::parse).collect());
    }
    Ok(AnnotationTable::new(columns, rows)?)
}

/// Parse a JSON document: an array of entries or a single entry object.
pub fn parse_json(raw: &str) -> Result<AnnotationTable, IngestError> {
    let value: Value = serde_json::from_str(raw)?;
    let entries = match value {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => return Err(IngestError::Empty("json document".to_string())),
    };

    let mut records: Vec<Vec<(String, Cell)>> = Vec::new();
    for entry in &entries {
        let Some(entry) = entry.as_object() else {
            warn!("skipping non-object json entry");
            continue;
        };
        let text = text_cell(entry);
        let annotations = annotation_objects(entry);
        if annotations.is_empty() {
            records.push(vec![("text".to_string(), text)]);
            continue;
        }
        for annotation in annotations {
            let mut record = vec![("text".to_string(), text.clone())];
            if let Some(key) = TOKEN_KEYS.iter().find(|k| annotation.contains_key(**k)) {
                let token = annotation.get(*key).map(plain_string).unwrap_or_default();
                record.push((key.to_string(), Cell::Text(token)));
            }
            for (key, value) in annotation {
                if !TOKEN_KEYS.contains(&key.as_str()) {
                    record.push((key.clone(), json_cell(value)));
                }
            }
            records.push(record);
        }
    }
    Ok(AnnotationTable::from_records(records))
}

/// Parse JSON lines. Blank lines are ignored; entries whose annotations have
/// neither layout are skipped.
pub fn parse_jsonl(raw: &str) -> Result<AnnotationTable, IngestError> {
    let mut records: Vec<Vec<(String, Cell)>> = Vec::new();
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        let value: Value = serde_json::from_str(line)?;
        let Some(entry) = value.as_object() else {
            warn!("skipping non-object jsonl line");
            continue;
        };
        let text = text_cell(entry);
        let annotations = annotation_objects(entry);
        let Some(first) = annotations.first() else {
            continue;
        };

        if first.contains_key("word") {
            for annotation in &annotations {
                let word = annotation.get("word").map(plain_string).unwrap_or_default();
                let mut record = vec![
                    ("text".to_string(), text.clone()),
                    ("word".to_string(), Cell::Text(word)),
                ];
                for (key, value) in annotation.iter() {
                    if key.starts_with("annotator_") {
                        record.push((key.clone(), json_cell(value)));
                    }
                }
                records.push(record);
            }
        } else if first.contains_key("annotator") && first.contains_key("label") {
            let mut record = vec![("text".to_string(), text)];
            for annotation in &annotations {
                let name = annotation.get("annotator").map(plain_string).unwrap_or_default();
                let label = annotation.get("label").map(json_cell).unwrap_or(Cell::Missing);
                record.push((name, label));
            }
            records.push(record);
        } else {
            warn!("skipping jsonl entry with unrecognised annotation layout");
        }
    }
    Ok(AnnotationTable::from_records(records))
}

fn text_cell(entry: &Map<String, Value>) -> Cell {
    entry
        .get("text")
        .map(|v| Cell::Text(plain_string(v)))
        .unwrap_or_else(|| Cell::Text(String::new()))
}

/// The entry's annotation objects; anything other than a list of objects
/// counts as no annotations.
fn annotation_objects(entry: &Map<String, Value>) -> Vec<&Map<String, Value>> {
    match entry.get("annotations") {
        Some(Value::Array(items)) => {
            let objects: Vec<&Map<String, Value>> = items.iter().filter_map(Value::as_object).collect();
            if objects.len() == items.len() {
                objects
            } else {
                Vec::new()
            }
        }
        _ => Vec::new(),
    }
}

fn json_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Missing,
        Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or(Cell::Missing),
        Value::String(s) => Cell::parse(s),
        other => Cell::Text(other.to_string()),
    }
}

fn plain_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
