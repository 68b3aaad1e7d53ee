//! Row normalization: one raw spreadsheet row to one candidate transaction

use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use uuid::Uuid;

use super::columns::{ColumnMapping, Field};
use super::fingerprint::fingerprint;
use super::payment::map_payment_method;
use crate::domain::{CellValue, Direction, PaymentMethod, RawRow, Transaction, UNCATEGORIZED};

/// Source file name used when the upload has none
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Per-upload settings for normalization
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub day_first: bool,
    pub default_category: String,
    pub source_file: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            day_first: true,
            default_category: UNCATEGORIZED.to_string(),
            source_file: UNKNOWN_SOURCE.to_string(),
        }
    }
}

/// A validated row, not yet tied to an owner or persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    pub direction: Direction,
    pub category: String,
    pub payment_method: PaymentMethod,
    pub reference: String,
    pub source_file: String,
    pub fingerprint: String,
}

impl NormalizedRow {
    pub fn into_transaction(self, owner_id: &str, batch_id: &str) -> Transaction {
        let mut tx = Transaction::new(Uuid::new_v4(), owner_id, self.date, self.amount, self.direction);
        tx.description = self.description;
        tx.category = self.category;
        tx.payment_method = self.payment_method;
        tx.reference = self.reference;
        tx.source_file = Some(self.source_file);
        tx.fingerprint = Some(self.fingerprint);
        tx.import_batch_id = Some(batch_id.to_string());
        tx
    }
}

/// Normalize a row, or `None` when its date is missing/unparseable or its amount is zero
pub fn normalize_row(
    row: &RawRow,
    mapping: &ColumnMapping,
    options: &NormalizeOptions,
) -> Option<NormalizedRow> {
    let cell = |field: Field| mapping.get(field).and_then(|h| row.get(h));
    let text = |field: Field| mapping.get(field).and_then(|h| row.text(h));

    let date = cell(Field::Date).and_then(|c| parse_date_cell(c, options.day_first));
    let description = text(Field::Description).unwrap_or_default();

    let amount_text = cell(Field::Amount).map(amount_cell_text);
    let magnitude = amount_text.as_deref().and_then(parse_amount).map(|a| a.abs());
    // Stored with two decimals; the zero test below uses the unrounded value
    let amount =
        magnitude.map(|a| a.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero));

    let direction = classify_direction(text(Field::Type).as_deref(), amount_text.as_deref());
    let category = text(Field::Category).unwrap_or_else(|| options.default_category.clone());
    let payment_method = map_payment_method(text(Field::PaymentMethod).as_deref());
    let reference = text(Field::Reference).unwrap_or_default();

    let fingerprint = fingerprint(date, amount, Some(description.as_str()), Some(reference.as_str()));

    let date = date?;
    if magnitude.map_or(true, |m| m.is_zero()) {
        return None;
    }
    let amount = amount.unwrap_or(Decimal::ZERO);

    Some(NormalizedRow {
        date,
        description,
        amount,
        direction,
        category,
        payment_method,
        reference,
        source_file: options.source_file.clone(),
        fingerprint,
    })
}

/// Decide income vs expense.
///
/// An explicit credit/debit type column wins. Otherwise the raw amount text
/// decides: a `+`, or no `-` at all, means income. With no amount cell the
/// signed amount falls back to zero, which always reads as expense.
pub fn classify_direction(type_text: Option<&str>, amount_text: Option<&str>) -> Direction {
    if let Some(kind) = type_text {
        let kind = kind.to_lowercase();
        if kind.contains("credit") {
            return Direction::Income;
        }
        if kind.contains("debit") {
            return Direction::Expense;
        }
    }

    match amount_text {
        Some(raw) if raw.contains('+') || !raw.contains('-') => Direction::Income,
        Some(_) => Direction::Expense,
        None => {
            let signed = parse_amount("0").unwrap_or(Decimal::ZERO);
            if signed > Decimal::ZERO {
                Direction::Income
            } else {
                Direction::Expense
            }
        }
    }
}

fn amount_cell_text(cell: &CellValue) -> String {
    match cell {
        CellValue::Text(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

/// Parse a signed decimal from loosely formatted text.
///
/// Handles currency symbols, spaces, thousands separators, decimal comma,
/// trailing or leading minus, and `(12.50)` as a negative.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let (parenthesized, s) = match s.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, s),
    };
    let negative = parenthesized || s.contains('-');

    let kept: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }

    let cleaned = match (kept.rfind('.'), kept.rfind(',')) {
        // "1.234,56": comma is the decimal separator
        (Some(dot), Some(comma)) if comma > dot => kept.replace('.', "").replace(',', "."),
        // "1,234.56"
        (Some(_), Some(_)) => kept.replace(',', ""),
        // "45,90"
        (None, Some(_)) if kept.matches(',').count() == 1 => kept.replace(',', "."),
        // "1,234,567"
        (None, Some(_)) => kept.replace(',', ""),
        _ => kept,
    };

    let value = Decimal::from_str(&cleaned).ok()?;
    Some(if negative { -value } else { value })
}

const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);
/// Serial of 9999-12-31, the last date a spreadsheet can hold
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Convert an Excel serial day number to a date
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_EXCEL_SERIAL {
        return None;
    }
    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}

fn parse_date_cell(cell: &CellValue, day_first: bool) -> Option<NaiveDate> {
    match cell {
        CellValue::Date(dt) => Some(dt.date()),
        CellValue::Number(n) => excel_serial_to_date(*n),
        CellValue::Text(s) => parse_date(s, day_first),
        CellValue::Empty => None,
    }
}

const ISO_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"];
const YEAR_FIRST_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y%m%d"];
const DAY_FIRST_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d/%m/%y", "%d-%m-%y", "%d.%m.%y"];
const MONTH_FIRST_FORMATS: &[&str] = &["%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y", "%m/%d/%y", "%m-%d-%y", "%m.%d.%y"];

/// Parse a date from text. Ambiguous `01/02/2024` style dates are read
/// day-first unless `day_first` is false; the other order is tried next.
pub fn parse_date(raw: &str, day_first: bool) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // chrono's %Y also accepts one or two digits, so "05-01-24" must not
    // reach the year-first formats
    let starts_with_year = s.chars().take(4).filter(|c| c.is_ascii_digit()).count() == 4;
    if starts_with_year {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(dt.date_naive());
        }
        for fmt in ISO_DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt.date());
            }
        }
        for fmt in YEAR_FIRST_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(date);
            }
        }
    }

    // "05/01/2024 14:30": keep the date part only
    let date_part = s.split_whitespace().next().unwrap_or(s);
    let (first, second) = if day_first {
        (DAY_FIRST_FORMATS, MONTH_FIRST_FORMATS)
    } else {
        (MONTH_FIRST_FORMATS, DAY_FIRST_FORMATS)
    };
    for fmt in first.iter().chain(second.iter()) {
        // a two-digit year parsed by %Y lands in the first century; let %y take it
        if let Ok(date) = NaiveDate::parse_from_str(date_part, fmt) {
            if date.year() >= 1000 {
                return Some(date);
            }
        }
    }

    // CSV exports sometimes carry the raw spreadsheet serial
    s.parse::<f64>().ok().and_then(excel_serial_to_date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::import::columns::detect_columns;

    fn row(cells: &[(&str, CellValue)]) -> (RawRow, ColumnMapping) {
        let headers: Vec<String> = cells.iter().map(|(h, _)| h.to_string()).collect();
        let row = cells.iter().map(|(h, v)| (*h, v.clone())).collect();
        (row, detect_columns(&headers))
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_french_expense_row() {
        let (row, mapping) = row(&[
            ("Date Comptable", CellValue::from("2024-01-05")),
            ("Montant", CellValue::from("-45.00")),
            ("Description", CellValue::from("EDF Facture")),
        ]);
        let tx = normalize_row(&row, &mapping, &NormalizeOptions::default()).unwrap();

        assert_eq!(tx.date, ymd(2024, 1, 5));
        assert_eq!(tx.amount, Decimal::new(4500, 2));
        assert_eq!(tx.direction, Direction::Expense);
        assert_eq!(tx.description, "EDF Facture");
        assert_eq!(tx.payment_method, PaymentMethod::Other);
        assert_eq!(tx.category, "Uncategorized");
        assert_eq!(tx.reference, "");
        assert_eq!(tx.source_file, "unknown");
        assert_eq!(tx.fingerprint, "1704412800000|45|EDF Factur");
    }

    #[test]
    fn test_unsigned_amount_is_income() {
        let (row, mapping) = row(&[
            ("Date", CellValue::from("2024-02-01")),
            ("Amount", CellValue::from("120")),
        ]);
        let tx = normalize_row(&row, &mapping, &NormalizeOptions::default()).unwrap();
        assert_eq!(tx.direction, Direction::Income);
        assert_eq!(tx.amount, Decimal::new(120, 0));
    }

    #[test]
    fn test_numeric_cells() {
        let (row, mapping) = row(&[
            ("Date", CellValue::Number(45292.0)),
            ("Amount", CellValue::Number(-12.5)),
        ]);
        let tx = normalize_row(&row, &mapping, &NormalizeOptions::default()).unwrap();
        assert_eq!(tx.date, ymd(2024, 1, 1));
        assert_eq!(tx.amount, Decimal::new(1250, 2));
        assert_eq!(tx.direction, Direction::Expense);
    }

    #[test]
    fn test_rejected_rows() {
        let opts = NormalizeOptions::default();

        let (r, m) = row(&[("Date", CellValue::Empty), ("Amount", CellValue::from("10"))]);
        assert!(normalize_row(&r, &m, &opts).is_none());

        let (r, m) = row(&[("Date", CellValue::from("not a date")), ("Amount", CellValue::from("10"))]);
        assert!(normalize_row(&r, &m, &opts).is_none());

        let (r, m) = row(&[("Date", CellValue::from("2024-01-01")), ("Amount", CellValue::from("0.00"))]);
        assert!(normalize_row(&r, &m, &opts).is_none());

        let (r, m) = row(&[("Date", CellValue::from("2024-01-01")), ("Amount", CellValue::from("n/a"))]);
        assert!(normalize_row(&r, &m, &opts).is_none());
    }

    #[test]
    fn test_sub_cent_amounts_kept_and_rounded_half_up() {
        let opts = NormalizeOptions::default();

        let (r, m) = row(&[("Date", CellValue::from("2024-01-01")), ("Amount", CellValue::from("0.004"))]);
        let tiny = normalize_row(&r, &m, &opts).unwrap();
        assert_eq!(tiny.amount, Decimal::ZERO);

        let (r, m) = row(&[("Date", CellValue::from("2024-01-01")), ("Amount", CellValue::from("0.125"))]);
        assert_eq!(normalize_row(&r, &m, &opts).unwrap().amount, Decimal::new(13, 2));

        let (r, m) = row(&[("Date", CellValue::from("2024-01-01")), ("Amount", CellValue::from("-2.675"))]);
        assert_eq!(normalize_row(&r, &m, &opts).unwrap().amount, Decimal::new(268, 2));
    }

    #[test]
    fn test_type_column_takes_precedence() {
        assert_eq!(classify_direction(Some("CREDIT"), Some("-10")), Direction::Income);
        assert_eq!(classify_direction(Some("Debit"), Some("+10")), Direction::Expense);
        assert_eq!(classify_direction(Some("Transfer"), Some("-10")), Direction::Expense);
        assert_eq!(classify_direction(Some("credit/debit"), None), Direction::Income);
    }

    #[test]
    fn test_direction_without_amount_cell_is_expense() {
        assert_eq!(classify_direction(None, None), Direction::Expense);
        assert_eq!(classify_direction(None, Some("+-3")), Direction::Income);
    }

    #[test]
    fn test_category_and_payment_columns() {
        let (row, mapping) = row(&[
            ("Date", CellValue::from("15/03/2024")),
            ("Libellé", CellValue::from("Loyer bureau")),
            ("Montant", CellValue::from("-1 250,00 €")),
            ("Catégorie", CellValue::from("Loyer")),
            ("Mode", CellValue::from("Virement bancaire")),
            ("Référence", CellValue::from("VIR-0042")),
        ]);
        let opts = NormalizeOptions {
            source_file: "releve.xlsx".to_string(),
            ..Default::default()
        };
        let tx = normalize_row(&row, &mapping, &opts).unwrap();

        assert_eq!(tx.date, ymd(2024, 3, 15));
        assert_eq!(tx.amount, Decimal::new(125000, 2));
        assert_eq!(tx.direction, Direction::Expense);
        assert_eq!(tx.category, "Loyer");
        assert_eq!(tx.payment_method, PaymentMethod::Transfer);
        assert_eq!(tx.reference, "VIR-0042");
        assert_eq!(tx.source_file, "releve.xlsx");
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("1,234.56"), Some(Decimal::new(123456, 2)));
        assert_eq!(parse_amount("1.234,56"), Some(Decimal::new(123456, 2)));
        assert_eq!(parse_amount("45,90"), Some(Decimal::new(4590, 2)));
        assert_eq!(parse_amount("1,234,567"), Some(Decimal::new(1234567, 0)));
        assert_eq!(parse_amount("(12.50)"), Some(Decimal::new(-1250, 2)));
        assert_eq!(parse_amount("$ -3.10"), Some(Decimal::new(-310, 2)));
        assert_eq!(parse_amount("+7"), Some(Decimal::new(7, 0)));
        assert_eq!(parse_amount("EUR"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-01-05", true), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05T10:30:00", true), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05T10:30:00Z", true), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("05/01/2024", true), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("05/01/2024", false), Some(ymd(2024, 5, 1)));
        assert_eq!(parse_date("31.12.2023", true), Some(ymd(2023, 12, 31)));
        // not a valid day-first date, so month-first is used
        assert_eq!(parse_date("12/31/2023", true), Some(ymd(2023, 12, 31)));
        assert_eq!(parse_date("05/01/2024 14:30", true), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("05-01-24", true), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("20240105", true), Some(ymd(2024, 1, 5)));
        assert_eq!(parse_date("45292", true), Some(ymd(2024, 1, 1)));
        assert_eq!(parse_date("yesterday", true), None);
    }

    #[test]
    fn test_excel_serial_bounds() {
        assert_eq!(excel_serial_to_date(1.0), Some(ymd(1899, 12, 31)));
        assert_eq!(excel_serial_to_date(45292.75), Some(ymd(2024, 1, 1)));
        assert_eq!(excel_serial_to_date(0.0), None);
        assert_eq!(excel_serial_to_date(-3.0), None);
    }
}
