//! Raw tabular data as read from an uploaded spreadsheet

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// A single cell before any interpretation
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    /// Native spreadsheet date or datetime cell
    Date(NaiveDateTime),
    Empty,
}

impl CellValue {
    /// Whether the cell carries nothing usable (empty or whitespace-only)
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        CellValue::Date(date.and_time(chrono::NaiveTime::MIN))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%d")),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// One data row: header (original spelling) to cell, in file column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    cells: Vec<(String, CellValue)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, header: impl Into<String>, value: CellValue) {
        self.cells.push((header.into(), value));
    }

    /// Cell under `header`, or `None` when the column is missing or blank
    pub fn get(&self, header: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, v)| v)
            .filter(|v| !v.is_blank())
    }

    /// Trimmed text of the cell under `header`
    pub fn text(&self, header: &str) -> Option<String> {
        self.get(header).map(|v| v.to_string().trim().to_string())
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.is_blank())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<H: Into<String>> FromIterator<(H, CellValue)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (H, CellValue)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(h, v)| (h.into(), v)).collect(),
        }
    }
}

/// A whole sheet: header row plus the data rows under it
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row aligned to the header order; missing trailing cells are empty
    pub fn push_row(&mut self, values: Vec<CellValue>) {
        let mut values = values.into_iter();
        let row = self
            .headers
            .iter()
            .map(|h| (h.clone(), values.next().unwrap_or(CellValue::Empty)))
            .collect();
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_cells_are_absent() {
        let row: RawRow = vec![
            ("Date", CellValue::from("2024-01-05")),
            ("Montant", CellValue::from("   ")),
            ("Ref", CellValue::Empty),
        ]
        .into_iter()
        .collect();

        assert!(row.get("Date").is_some());
        assert!(row.get("Montant").is_none());
        assert!(row.get("Ref").is_none());
        assert!(row.get("Missing").is_none());
    }

    #[test]
    fn test_push_row_pads_short_rows() {
        let mut table = RawTable::new(vec!["A".into(), "B".into(), "C".into()]);
        table.push_row(vec![CellValue::from("x")]);

        let row = &table.rows[0];
        assert_eq!(row.len(), 3);
        assert_eq!(row.text("A").as_deref(), Some("x"));
        assert!(row.get("C").is_none());
    }

    #[test]
    fn test_number_display() {
        assert_eq!(CellValue::Number(-45.0).to_string(), "-45");
        assert_eq!(CellValue::Number(12.5).to_string(), "12.5");
    }
}
