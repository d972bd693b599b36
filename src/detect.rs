//! Column detection and data-type inference for tables that arrive without
//! an explicit column mapping.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::AlphaConfig;
use crate::disagreement::MIN_ANNOTATORS;
use crate::error::ReliabilityError;
use crate::scales::ScaleLibrary;
use crate::schema::{AnnotationLevel, ColumnMapping, DataType};
use crate::table::AnnotationTable;

pub const TEXT_COLUMN_ALIASES: [&str; 8] = [
    "text",
    "sentence",
    "paragraph",
    "document",
    "texts",
    "sentences",
    "documents",
    "paragraphs",
];

pub const WORD_COLUMN_ALIASES: [&str; 4] = ["word", "token", "tokens", "words"];

/// Distinct integer values below this count make numeric data ordinal.
const ORDINAL_MAX_DISTINCT: usize = 10;

static ANNOTATOR_COLUMN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(annotator[_\s]*\d+|annotator one)$").expect("Invalid annotator column regex")
});
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("Invalid digits regex"));

/// First column whose trimmed, lowercased name is one of `aliases`.
pub fn detect_column<'a, I>(table: &AnnotationTable, aliases: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let aliases: BTreeSet<String> = aliases
        .into_iter()
        .map(|a| a.trim().to_lowercase())
        .collect();
    let matches: Vec<&String> = table
        .columns()
        .iter()
        .filter(|c| aliases.contains(&c.trim().to_lowercase()))
        .collect();
    if matches.len() > 1 {
        warn!(?matches, chosen = %matches[0], "multiple candidate columns; using the first");
    }
    matches.first().map(|c| (*c).clone())
}

/// Columns named like `annotator_1`, `Annotator 2`, `annotator one`.
pub fn detect_annotator_columns(table: &AnnotationTable) -> Vec<String> {
    let matches: Vec<String> = table
        .columns()
        .iter()
        .filter(|c| ANNOTATOR_COLUMN.is_match(c))
        .cloned()
        .collect();

    if matches.len() < MIN_ANNOTATORS {
        warn!(
            found = matches.len(),
            ?matches,
            "fewer than {MIN_ANNOTATORS} annotator columns detected"
        );
    }
    let patterns: BTreeSet<String> = matches
        .iter()
        .map(|c| DIGITS.replace_all(c, "").to_lowercase())
        .collect();
    if patterns.len() > 1 {
        warn!(?patterns, "inconsistent annotator column naming");
    }
    matches
}

fn aliases<'a>(builtin: &'a [&'a str], extra: &'a [String]) -> impl Iterator<Item = &'a str> {
    builtin.iter().copied().chain(extra.iter().map(String::as_str))
}

/// Resolve the column mapping, preferring explicit names over detection.
pub fn resolve_column_mapping(
    table: &AnnotationTable,
    level: AnnotationLevel,
    text_col: Option<&str>,
    annotator_cols: Option<Vec<String>>,
    config: &AlphaConfig,
) -> Result<ColumnMapping, ReliabilityError> {
    let text_col = match text_col {
        Some(col) => {
            table.require_column(col)?;
            Some(col.to_string())
        }
        None => detect_column(table, aliases(&TEXT_COLUMN_ALIASES, &config.text_column_aliases)),
    };

    let word_col = match level {
        AnnotationLevel::TextLevel => None,
        AnnotationLevel::TokenLevel => {
            let col = detect_column(table, aliases(&WORD_COLUMN_ALIASES, &config.word_column_aliases))
                .ok_or_else(|| ReliabilityError::UndetectedColumn {
                    role: "word".to_string(),
                })?;
            Some(col)
        }
    };

    // Explicit annotator columns need no unit key.
    if text_col.is_none() && word_col.is_none() && annotator_cols.is_none() {
        return Err(ReliabilityError::UndetectedColumn {
            role: "text".to_string(),
        });
    }

    let annotator_cols = match annotator_cols {
        Some(cols) => {
            for col in &cols {
                table.require_column(col)?;
            }
            cols
        }
        None => detect_annotator_columns(table),
    };

    let mapping = ColumnMapping::new(text_col, annotator_cols)?.with_word_col(word_col);
    debug!(?mapping, "resolved column mapping");
    Ok(mapping)
}

/// Guess the measurement scale of the annotator columns.
///
/// Any non-numeric label makes the data categorical: ordinal when the label
/// set fits a library scale, nominal otherwise. All-numeric data is ordinal
/// with fewer than ten distinct integers, else ratio when non-negative, else
/// interval.
pub fn infer_data_type(
    table: &AnnotationTable,
    annotator_cols: &[String],
    library: &ScaleLibrary,
) -> Result<DataType, ReliabilityError> {
    let mut labels: BTreeSet<String> = BTreeSet::new();
    let mut numbers: Vec<f64> = Vec::new();
    let mut all_numeric = true;

    for col in annotator_cols {
        for cell in table.column(col)? {
            let Some(label) = cell.as_label() else {
                continue;
            };
            match cell.as_number() {
                Ok(Some(n)) => numbers.push(n),
                _ => all_numeric = false,
            }
            labels.insert(label);
        }
    }

    let inferred = if labels.is_empty() {
        DataType::Nominal
    } else if !all_numeric {
        if library.find_match(labels.iter().map(String::as_str)).is_some() {
            DataType::Ordinal
        } else {
            DataType::Nominal
        }
    } else {
        numbers.sort_by(f64::total_cmp);
        numbers.dedup();
        let integral = numbers.iter().all(|n| n.fract() == 0.0);
        if integral && numbers.len() < ORDINAL_MAX_DISTINCT {
            DataType::Ordinal
        } else if numbers.first().is_some_and(|min| *min >= 0.0) {
            DataType::Ratio
        } else {
            DataType::Interval
        }
    };
    debug!(data_type = %inferred, distinct = labels.len(), "inferred data type");
    Ok(inferred)
}

/// Output of `kalpha detect`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub columns: ColumnMapping,
    pub data_type: DataType,
}

pub fn detect(
    table: &AnnotationTable,
    level: AnnotationLevel,
    config: &AlphaConfig,
) -> Result<Detection, ReliabilityError> {
    let columns = resolve_column_mapping(table, level, None, None, config)?;
    let data_type = infer_data_type(table, &columns.annotator_cols, &config.scale_library())?;
    Ok(Detection { columns, data_type })
}
