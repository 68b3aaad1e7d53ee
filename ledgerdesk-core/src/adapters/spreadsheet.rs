//! Spreadsheet reader - CSV through `csv`, workbooks through `calamine`

use std::borrow::Cow;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use encoding_rs::{UTF_8, WINDOWS_1252};

use crate::domain::result::{Error, Result};
use crate::domain::{CellValue, RawTable};
use crate::ports::TableReader;

const EXTENSIONS: &[&str] = &["csv", "xlsx", "xlsm", "xls", "ods"];

/// Reads the first sheet of a CSV or workbook file
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetReader;

impl SpreadsheetReader {
    pub fn new() -> Self {
        Self
    }

    fn read_csv(&self, path: &Path) -> Result<RawTable> {
        let bytes = std::fs::read(path)
            .map_err(|e| Error::read(format!("{}: {}", path.display(), e)))?;
        let text = decode_text(&bytes);
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(sniff_delimiter(&text))
            .from_reader(text.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|e| Error::read(format!("Failed to read CSV header: {}", e)))?
            .iter()
            .enumerate()
            .map(|(i, h)| header_name(i, h))
            .collect();
        let mut table = RawTable::new(headers);

        for result in rdr.records() {
            let record = result.map_err(|e| Error::read(format!("Malformed CSV row: {}", e)))?;
            let cells: Vec<CellValue> = record
                .iter()
                .map(|v| {
                    if v.trim().is_empty() {
                        CellValue::Empty
                    } else {
                        CellValue::Text(v.to_string())
                    }
                })
                .collect();
            if cells.iter().all(CellValue::is_blank) {
                continue;
            }
            table.push_row(cells);
        }

        Ok(table)
    }

    fn read_workbook(&self, path: &Path) -> Result<RawTable> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| Error::read(format!("Failed to open workbook: {}", e)))?;

        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range.map_err(|e| Error::read(format!("Failed to read sheet: {}", e)))?,
            None => return Ok(RawTable::default()),
        };

        let mut rows = range.rows();
        let Some(header_row) = rows.next() else {
            return Ok(RawTable::default());
        };
        let headers = header_row
            .iter()
            .enumerate()
            .map(|(i, cell)| header_name(i, &cell_to_value(cell).to_string()))
            .collect();
        let mut table = RawTable::new(headers);

        for row in rows {
            let cells: Vec<CellValue> = row.iter().map(cell_to_value).collect();
            if cells.iter().all(CellValue::is_blank) {
                continue;
            }
            table.push_row(cells);
        }

        Ok(table)
    }
}

impl TableReader for SpreadsheetReader {
    fn supported_extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    fn read_table(&self, path: &Path) -> Result<RawTable> {
        if !path.exists() {
            return Err(Error::read(format!("File not found: {}", path.display())));
        }
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => self.read_csv(path),
            "xlsx" | "xlsm" | "xls" | "ods" => self.read_workbook(path),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Trimmed header text; blank headers get a positional name
fn header_name(index: usize, raw: &str) -> String {
    let name = raw.trim_start_matches('\u{feff}').trim();
    if name.is_empty() {
        format!("Column {}", index + 1)
    } else {
        name.to_string()
    }
}

/// UTF-8 when the bytes are valid UTF-8, else Windows-1252 (older French bank exports)
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        Some(text) => text,
        None => WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}

/// Semicolon-separated exports are common with comma decimal separators
fn sniff_delimiter(text: &str) -> u8 {
    let first_line = text.lines().next().unwrap_or_default();
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

fn cell_to_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => serial_to_datetime(dt.as_f64())
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}

/// Excel serial (days since 1899-12-30, fraction is time of day)
fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_csv_headers_and_rows() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "releve.csv",
            "\u{feff}Date Comptable, Montant ,Description\n05/01/2024,-45.00,EDF Facture\n\n06/01/2024,120,\n",
        );

        let table = SpreadsheetReader::new().read_table(&path).unwrap();
        assert_eq!(table.headers, vec!["Date Comptable", "Montant", "Description"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].text("Montant").as_deref(), Some("-45.00"));
        assert!(table.rows[1].get("Description").is_none());
    }

    #[test]
    fn test_csv_semicolon_delimiter() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "export.csv", "Date;Montant;Libellé\n05/01/2024;1 234,56;Loyer\n");

        let table = SpreadsheetReader::new().read_table(&path).unwrap();
        assert_eq!(table.headers.len(), 3);
        assert_eq!(table.rows[0].text("Montant").as_deref(), Some("1 234,56"));
    }

    #[test]
    fn test_windows_1252_export_is_decoded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("releve_latin1.csv");
        std::fs::write(&path, b"Date;Libell\xe9;Montant\n05/01/2024;Caf\xe9 de la gare;-3,50\n").unwrap();

        let table = SpreadsheetReader::new().read_table(&path).unwrap();
        assert_eq!(table.headers, vec!["Date", "Libellé", "Montant"]);
        assert_eq!(table.rows[0].text("Libellé").as_deref(), Some("Café de la gare"));
        assert_eq!(table.rows[0].text("Montant").as_deref(), Some("-3,50"));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "short.csv", "Date,Amount,Description\n2024-01-05,10\n");

        let table = SpreadsheetReader::new().read_table(&path).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert!(table.rows[0].get("Description").is_none());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = SpreadsheetReader::new()
            .read_table(Path::new("/nonexistent/file.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::Read(_)));
    }

    #[test]
    fn test_corrupt_workbook_is_read_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "broken.xlsx", "definitely not a zip archive");

        let err = SpreadsheetReader::new().read_table(&path).unwrap_err();
        assert!(matches!(err, Error::Read(_)));
    }

    #[test]
    fn test_supports_extensions() {
        let reader = SpreadsheetReader::new();
        assert!(reader.supports(Path::new("a.CSV")));
        assert!(reader.supports(Path::new("a.xlsx")));
        assert!(reader.supports(Path::new("a.ods")));
        assert!(!reader.supports(Path::new("a.pdf")));
        assert!(!reader.supports(Path::new("noext")));
    }

    #[test]
    fn test_serial_to_datetime() {
        let dt = serial_to_datetime(45296.5).unwrap();
        assert_eq!(dt.to_string(), "2024-01-05 12:00:00");
    }
}
