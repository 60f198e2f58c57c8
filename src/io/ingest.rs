//! Whitespace-delimited numeric table ingest.
//!
//! Training tables are plain text written by an external generator:
//!
//! ```text
//! # optional comment lines
//! 0 0 1.2e-2 3.4e-2 ...
//! 1 0 1.1e-2 3.3e-2 ...
//! ```
//!
//! Design goals:
//! - **Strict shape**: every data row must have the same number of columns
//! - **Clear errors**: failures name the file and the 1-based line
//! - **Deterministic behavior**: no type guessing, only finite `f64`s accepted
//! - **Separation of concerns**: no knowledge of what the columns mean here

use std::fs;
use std::path::Path;

use crate::error::EmulatorError;

/// A dense row-major table of finite numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericTable {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl NumericTable {
    /// Build a table from rows, checking that they are rectangular.
    ///
    /// Returns `None` for ragged input.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        Some(Self {
            rows: rows.len(),
            cols,
            data: rows.iter().flatten().copied().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.cols + j]
    }

    pub fn is_all_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

/// Read a numeric table from disk.
pub fn read_table(path: &Path) -> Result<NumericTable, EmulatorError> {
    let text = fs::read_to_string(path)
        .map_err(|e| EmulatorError::data_load(path, None, format!("cannot read file: {e}")))?;
    parse_table(&text).map_err(|(line, message)| EmulatorError::data_load(path, line, message))
}

/// Parse table text. Errors carry the 1-based line number when one applies.
pub fn parse_table(text: &str) -> Result<NumericTable, (Option<usize>, String)> {
    let mut data = Vec::new();
    let mut rows = 0usize;
    let mut cols: Option<usize> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let start = data.len();
        for token in content.split_whitespace() {
            let value: f64 = token
                .parse()
                .map_err(|_| (Some(line), format!("not a number: '{token}'")))?;
            if !value.is_finite() {
                return Err((Some(line), format!("non-finite value: '{token}'")));
            }
            data.push(value);
        }

        let n = data.len() - start;
        match cols {
            None => cols = Some(n),
            Some(expected) if expected != n => {
                return Err((
                    Some(line),
                    format!("expected {expected} columns (as on the first row), found {n}"),
                ));
            }
            Some(_) => {}
        }
        rows += 1;
    }

    let Some(cols) = cols else {
        return Err((None, "table contains no data rows".to_string()));
    };

    Ok(NumericTable { rows, cols, data })
}
