//! In-memory annotation table handed to the engine by the ingestion layer.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ReliabilityError;
use crate::schema::MissingValuePolicy;

/// Text values that count as "no annotation".
const MISSING_TOKENS: [&str; 3] = ["", "nan", "none"];

/// A single table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Parse raw text: empty is missing, numeric text becomes a number.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Missing => true,
            Cell::Number(n) => n.is_nan(),
            Cell::Text(s) => {
                let lowered = s.trim().to_lowercase();
                MISSING_TOKENS.contains(&lowered.as_str())
            }
        }
    }

    /// Categorical label for this cell, `None` when missing.
    pub fn as_label(&self) -> Option<String> {
        if self.is_missing() {
            return None;
        }
        match self {
            Cell::Number(n) => Some(format_number(*n)),
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Missing => None,
        }
    }

    /// Numeric value for this cell: `None` when missing, `Err(raw)` when the
    /// cell holds text that is not a finite number.
    pub fn as_number(&self) -> Result<Option<f64>, String> {
        if self.is_missing() {
            return Ok(None);
        }
        match self {
            Cell::Number(n) if n.is_finite() => Ok(Some(*n)),
            Cell::Number(n) => Err(n.to_string()),
            Cell::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(s.clone()),
            },
            Cell::Missing => Ok(None),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Missing)
    }
}

/// Integral numbers print without a fractional part so that `3` and `3.0`
/// become the same label.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Row-major table with named columns. Rows are units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl AnnotationTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, ReliabilityError> {
        let mut seen = HashSet::new();
        for col in &columns {
            if !seen.insert(col.as_str()) {
                return Err(ReliabilityError::Shape(format!("duplicate column name: {col}")));
            }
        }
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(ReliabilityError::Shape(format!(
                    "row {idx} has {} cells, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(Self { columns, rows })
    }

    /// Build from key/value records. Columns are the union of keys in
    /// first-seen order; absent keys become missing cells.
    pub fn from_records<I, R, K>(records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, Cell)>,
        K: Into<String>,
    {
        let mut columns: Vec<String> = Vec::new();
        let mut raw_rows: Vec<Vec<(usize, Cell)>> = Vec::new();
        for record in records {
            let mut row = Vec::new();
            for (key, value) in record {
                let key = key.into();
                let idx = match columns.iter().position(|c| *c == key) {
                    Some(idx) => idx,
                    None => {
                        columns.push(key);
                        columns.len() - 1
                    }
                };
                row.push((idx, value));
            }
            raw_rows.push(row);
        }

        let width = columns.len();
        let rows = raw_rows
            .into_iter()
            .map(|pairs| {
                let mut row = vec![Cell::Missing; width];
                for (idx, value) in pairs {
                    row[idx] = value;
                }
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn require_column(&self, name: &str) -> Result<usize, ReliabilityError> {
        self.column_index(name)
            .ok_or_else(|| ReliabilityError::UnknownColumn {
                column: name.to_string(),
            })
    }

    /// Cells of one column, top to bottom.
    pub fn column(&self, name: &str) -> Result<Vec<&Cell>, ReliabilityError> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Apply the missing-value policy to the annotator columns and return
    /// the resulting table. Other columns are never touched.
    pub fn apply_missing_policy(
        &self,
        policy: &MissingValuePolicy,
        annotator_cols: &[String],
    ) -> Result<Self, ReliabilityError> {
        let indices = annotator_cols
            .iter()
            .map(|c| self.require_column(c))
            .collect::<Result<Vec<_>, _>>()?;

        let rows = match policy {
            MissingValuePolicy::Ignore => self.rows.clone(),
            MissingValuePolicy::DropUnits => self
                .rows
                .iter()
                .filter(|row| indices.iter().all(|&i| !row[i].is_missing()))
                .cloned()
                .collect(),
            MissingValuePolicy::Fill(label) => self
                .rows
                .iter()
                .map(|row| {
                    let mut row = row.clone();
                    for &i in &indices {
                        if row[i].is_missing() {
                            row[i] = Cell::parse(label);
                        }
                    }
                    row
                })
                .collect(),
        };

        Ok(Self {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Append rows from `other`, aligning by column name. Columns only in
    /// `other` are added at the end; cells absent on either side are missing.
    pub fn concat(&self, other: &AnnotationTable) -> Self {
        let mut columns = self.columns.clone();
        for col in &other.columns {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }
        let mut rows = Vec::with_capacity(self.rows.len() + other.rows.len());
        for table in [self, other] {
            for row in &table.rows {
                let aligned = columns
                    .iter()
                    .map(|col| match table.column_index(col) {
                        Some(i) => row[i].clone(),
                        None => Cell::Missing,
                    })
                    .collect();
                rows.push(aligned);
            }
        }
        Self { columns, rows }
    }

    /// Add a column filled from `cells`; `cells` must have one entry per row.
    pub fn with_column(
        &self,
        name: impl Into<String>,
        cells: Vec<Cell>,
    ) -> Result<Self, ReliabilityError> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(ReliabilityError::Shape(format!("duplicate column name: {name}")));
        }
        if cells.len() != self.rows.len() {
            return Err(ReliabilityError::Shape(format!(
                "column {name} has {} cells, table has {} rows",
                cells.len(),
                self.rows.len()
            )));
        }
        let mut columns = self.columns.clone();
        columns.push(name);
        let rows = self
            .rows
            .iter()
            .zip(cells)
            .map(|(row, cell)| {
                let mut row = row.clone();
                row.push(cell);
                row
            })
            .collect();
        Ok(Self { columns, rows })
    }
}
