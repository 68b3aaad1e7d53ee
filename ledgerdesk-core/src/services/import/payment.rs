//! Payment method mapping from free-text cells

use crate::domain::PaymentMethod;

/// Ordered (keyword, method) table; first containment match wins
const PAYMENT_RULES: &[(&str, PaymentMethod)] = &[
    ("cash", PaymentMethod::Cash),
    ("espece", PaymentMethod::Cash),
    ("espèce", PaymentMethod::Cash),
    ("credit", PaymentMethod::Credit),
    ("carte", PaymentMethod::Credit),
    ("debit", PaymentMethod::Debit),
    ("bankcontact", PaymentMethod::Debit),
    ("bancontact", PaymentMethod::Debit),
    ("transfer", PaymentMethod::Transfer),
    ("virement", PaymentMethod::Transfer),
    ("check", PaymentMethod::Check),
    ("cheque", PaymentMethod::Check),
    ("chèque", PaymentMethod::Check),
];

/// Map a payment cell to a method; missing or unrecognized input is `Other`
pub fn map_payment_method(raw: Option<&str>) -> PaymentMethod {
    let Some(raw) = raw else {
        return PaymentMethod::Other;
    };
    let lowered = raw.to_lowercase();
    PAYMENT_RULES
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, method)| *method)
        .unwrap_or(PaymentMethod::Other)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_french_keywords() {
        assert_eq!(map_payment_method(Some("Virement bancaire")), PaymentMethod::Transfer);
        assert_eq!(map_payment_method(Some("Paiement Carte")), PaymentMethod::Credit);
        assert_eq!(map_payment_method(Some("Espèces")), PaymentMethod::Cash);
        assert_eq!(map_payment_method(Some("CHÈQUE n°12")), PaymentMethod::Check);
        assert_eq!(map_payment_method(Some("Bancontact")), PaymentMethod::Debit);
    }

    #[test]
    fn test_earlier_rule_wins() {
        // contains both "credit" and "transfer"; credit is checked first
        assert_eq!(map_payment_method(Some("credit transfer")), PaymentMethod::Credit);
        // "debit card" hits neither cash nor credit/carte, so debit
        assert_eq!(map_payment_method(Some("Debit card")), PaymentMethod::Debit);
    }

    #[test]
    fn test_missing_or_unknown() {
        assert_eq!(map_payment_method(None), PaymentMethod::Other);
        assert_eq!(map_payment_method(Some("PayPal")), PaymentMethod::Other);
    }
}
