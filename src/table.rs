// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// In-memory table model handed over by the file-loading collaborator

use chrono::{NaiveDate, NaiveDateTime};

/// A single untyped cell as produced by the loader
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Null,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

static NULL_CELL: CellValue = CellValue::Null;

impl CellValue {
    /// Text content, if this cell holds text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Non-blank text content, trimmed
    pub fn as_label(&self) -> Option<&str> {
        self.as_text().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Grouping label for any non-null cell. Numbers are rendered without a
    /// trailing `.0` so numeric partner codes group like their text form.
    pub fn to_label(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Text(_) => self.as_label().map(str::to_string),
            CellValue::Number(n) if n.is_finite() && n.fract() == 0.0 => {
                Some(format!("{}", *n as i64))
            }
            CellValue::Number(n) if n.is_finite() => Some(n.to_string()),
            CellValue::Number(_) => None,
            CellValue::Date(d) => Some(d.to_string()),
            CellValue::DateTime(dt) => Some(dt.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CellValue::Null, Into::into)
    }
}

/// One row, one source line
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRecord {
    cells: Vec<CellValue>,
}

impl RawRecord {
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Cell at `position`; positions past the end of a short row read as null
    pub fn cell(&self, position: usize) -> &CellValue {
        self.cells.get(position).unwrap_or(&NULL_CELL)
    }

    pub fn cells(&self) -> &[CellValue] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub(crate) fn set_cell(&mut self, position: usize, value: CellValue) {
        if position >= self.cells.len() {
            self.cells.resize(position + 1, CellValue::Null);
        }
        self.cells[position] = value;
    }
}

impl<T: Into<CellValue>> FromIterator<T> for RawRecord {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// A loaded table: ordered headers plus rows addressed by column position
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<RawRecord>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<RawRecord>) -> Self {
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[RawRecord] {
        &self.rows
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            total_rows: self.row_count(),
            total_columns: self.column_count(),
        }
    }
}

/// Shape of a loaded table
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct TableSummary {
    pub total_rows: usize,
    pub total_columns: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_row_reads_null() {
        let record: RawRecord = ["a", "b"].into_iter().collect();
        assert_eq!(record.cell(1), &CellValue::from("b"));
        assert_eq!(record.cell(12), &CellValue::Null);
    }

    #[test]
    fn test_labels() {
        assert_eq!(CellValue::from("  Sky UK ").to_label().as_deref(), Some("Sky UK"));
        assert_eq!(CellValue::from("   ").to_label(), None);
        assert_eq!(CellValue::Number(42.0).to_label().as_deref(), Some("42"));
        assert_eq!(CellValue::Number(f64::NAN).to_label(), None);
        assert_eq!(CellValue::Null.to_label(), None);
    }

    #[test]
    fn test_set_cell_extends_row() {
        let mut record = RawRecord::default();
        record.set_cell(3, CellValue::from("x"));
        assert_eq!(record.len(), 4);
        assert!(record.cell(0).is_null());
    }

    #[test]
    fn test_summary() {
        let table = RawTable::new(
            vec!["a".into(), "b".into()],
            vec![RawRecord::default(), RawRecord::default()],
        );
        let summary = table.summary();
        assert_eq!(summary.total_rows, 2);
        assert_eq!(summary.total_columns, 2);
    }
}
