//! Probable-duplicate fingerprint for imported rows

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;

const DESCRIPTION_PREFIX_CHARS: usize = 10;

/// Build the fingerprint from whichever parts are present, joined with `|`:
/// date (epoch milliseconds at UTC midnight), absolute amount without
/// trailing zeros, first ten characters of the description, reference.
///
/// Rows sharing date, amount, reference and description prefix collide.
pub fn fingerprint(
    date: Option<NaiveDate>,
    amount: Option<Decimal>,
    description: Option<&str>,
    reference: Option<&str>,
) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(4);

    if let Some(date) = date {
        let millis = date.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
        parts.push(millis.to_string());
    }
    if let Some(amount) = amount {
        parts.push(amount.abs().normalize().to_string());
    }
    if let Some(description) = description.filter(|d| !d.is_empty()) {
        parts.push(description.chars().take(DESCRIPTION_PREFIX_CHARS).collect());
    }
    if let Some(reference) = reference.filter(|r| !r.is_empty()) {
        parts.push(reference.to_string());
    }

    parts.join("|")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_all_parts() {
        let fp = fingerprint(
            date(2024, 1, 5),
            Some(Decimal::new(-4500, 2)),
            Some("EDF Facture Janvier"),
            Some("REF-1"),
        );
        assert_eq!(fp, "1704412800000|45|EDF Factur|REF-1");
    }

    #[test]
    fn test_missing_parts_are_omitted() {
        let fp = fingerprint(date(1970, 1, 2), Some(Decimal::new(1250, 2)), None, Some(""));
        assert_eq!(fp, "86400000|12.5");
        assert_eq!(fingerprint(None, None, None, None), "");
    }

    #[test]
    fn test_description_prefix_counts_characters() {
        let fp = fingerprint(None, None, Some("Électricité de France"), None);
        assert_eq!(fp, "Électricit");
    }

    #[test]
    fn test_same_prefix_collides() {
        let a = fingerprint(date(2024, 3, 1), Some(Decimal::new(10, 0)), Some("Abonnement mobile"), None);
        let b = fingerprint(date(2024, 3, 1), Some(Decimal::new(1000, 2)), Some("Abonnement internet"), None);
        assert_eq!(a, b);
    }
}
