//! The raw event table as exported from an E-Prime log: one row per logged
//! event, one column per attribute, every cell kept as text until a caller asks
//! for a number.

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::error::SummaryError;

#[derive(Debug, Clone, PartialEq)]
pub struct RawTrialLog {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RawTrialLog {
    pub fn from_path(path: &Path) -> Result<Self, SummaryError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(input: R) -> Result<Self, SummaryError> {
        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(input);
        let headers = reader
            .headers()
            .map_err(|e| SummaryError::malformed(format!("unreadable header: {e}")))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let rows = reader
            .records()
            .enumerate()
            .map(|(i, record)| {
                record
                    .map(|r| r.iter().map(str::to_string).collect())
                    .map_err(|e| SummaryError::malformed(e.to_string()).within(line_context(i)))
            })
            .collect::<Result<Vec<Vec<String>>, _>>()?;
        if rows.is_empty() {
            return Err(SummaryError::malformed("input table has no rows"));
        }
        Ok(RawTrialLog { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Result<usize, SummaryError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SummaryError::missing_column(name))
    }

    /// Short rows read as empty in their missing trailing cells.
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows[row].get(column).map(String::as_str).unwrap_or("")
    }

    /// `None` for a missing cell, an error for anything that is not a finite
    /// number.
    pub fn number(&self, row: usize, column: usize) -> Result<Option<f64>, SummaryError> {
        let text = self.cell(row, column);
        if is_missing(text) {
            return Ok(None);
        }
        match text.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Some(value)),
            _ => Err(
                SummaryError::malformed(format!("unable to parse {text:?} as a number"))
                    .within(format!("column {}", self.headers[column]))
                    .within(line_context(row)),
            ),
        }
    }

    pub fn required_number(&self, row: usize, column: usize) -> Result<f64, SummaryError> {
        self.number(row, column)?.ok_or_else(|| {
            SummaryError::malformed("missing value")
                .within(format!("column {}", self.headers[column]))
                .within(line_context(row))
        })
    }
}

/// Markers the upstream converter and spreadsheet tools write for "no value".
const MISSING_MARKERS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

pub fn is_missing(text: &str) -> bool {
    text.is_empty() || MISSING_MARKERS.contains(&text)
}

// Data rows start on line 2, below the header.
fn line_context(row: usize) -> String {
    format!("on line {}", row + 2)
}
