//! Column detection: map arbitrary headers onto the transaction fields

use serde::Serialize;

/// Fields a spreadsheet column can feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Date,
    Description,
    Amount,
    Type,
    Category,
    PaymentMethod,
    Reference,
}

/// One synonym rule: a header containing `synonym` (case-insensitive) feeds `field`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRule {
    pub field: Field,
    pub synonym: &'static str,
}

const fn rule(field: Field, synonym: &'static str) -> ColumnRule {
    ColumnRule { field, synonym }
}

/// Synonym table, in priority order within each field.
///
/// English and French bank export headers. "type" appears for both the
/// direction column and the category column.
pub const COLUMN_RULES: &[ColumnRule] = &[
    rule(Field::Date, "date"),
    rule(Field::Date, "transaction date"),
    rule(Field::Date, "execution date"),
    rule(Field::Date, "date comptable"),
    rule(Field::Date, "date valeur"),
    rule(Field::Description, "description"),
    rule(Field::Description, "message"),
    rule(Field::Description, "communication"),
    rule(Field::Description, "detail"),
    rule(Field::Description, "commentaire"),
    rule(Field::Description, "libellé"),
    rule(Field::Description, "libelle"),
    rule(Field::Amount, "amount"),
    rule(Field::Amount, "montant"),
    rule(Field::Amount, "value"),
    rule(Field::Amount, "sum"),
    rule(Field::Type, "type"),
    rule(Field::Type, "transaction type"),
    rule(Field::Type, "credit/debit"),
    rule(Field::Category, "category"),
    rule(Field::Category, "catégorie"),
    rule(Field::Category, "categorie"),
    rule(Field::Category, "label"),
    rule(Field::Category, "type"),
    rule(Field::PaymentMethod, "payment method"),
    rule(Field::PaymentMethod, "mode"),
    rule(Field::PaymentMethod, "payment type"),
    rule(Field::PaymentMethod, "method"),
    rule(Field::PaymentMethod, "moyen de paiement"),
    rule(Field::Reference, "reference"),
    rule(Field::Reference, "ref"),
    rule(Field::Reference, "number"),
    rule(Field::Reference, "no"),
    rule(Field::Reference, "référence"),
    rule(Field::Reference, "numéro"),
];

const FIELDS: [Field; 7] = [
    Field::Date,
    Field::Description,
    Field::Amount,
    Field::Type,
    Field::Category,
    Field::PaymentMethod,
    Field::Reference,
];

/// Header chosen for each field, in its original spelling
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMapping {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl ColumnMapping {
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Date => self.date.as_deref(),
            Field::Description => self.description.as_deref(),
            Field::Amount => self.amount.as_deref(),
            Field::Type => self.kind.as_deref(),
            Field::Category => self.category.as_deref(),
            Field::PaymentMethod => self.payment_method.as_deref(),
            Field::Reference => self.reference.as_deref(),
        }
    }

    fn set(&mut self, field: Field, header: String) {
        let slot = match field {
            Field::Date => &mut self.date,
            Field::Description => &mut self.description,
            Field::Amount => &mut self.amount,
            Field::Type => &mut self.kind,
            Field::Category => &mut self.category,
            Field::PaymentMethod => &mut self.payment_method,
            Field::Reference => &mut self.reference,
        };
        *slot = Some(header);
    }

    pub fn is_empty(&self) -> bool {
        FIELDS.iter().all(|f| self.get(*f).is_none())
    }
}

/// Detect the column mapping from a header row using [`COLUMN_RULES`]
pub fn detect_columns(headers: &[String]) -> ColumnMapping {
    detect_columns_with(headers, COLUMN_RULES)
}

/// Detect the column mapping with a custom rule table.
///
/// For each field, synonyms are tried in table order; for each synonym the
/// headers are scanned in file order. The first synonym with any containing
/// header wins. The same header may feed several fields.
pub fn detect_columns_with(headers: &[String], rules: &[ColumnRule]) -> ColumnMapping {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    let mut mapping = ColumnMapping::default();

    for field in FIELDS {
        let found = rules
            .iter()
            .filter(|r| r.field == field)
            .find_map(|r| lowered.iter().position(|h| h.contains(r.synonym)));
        if let Some(idx) = found {
            mapping.set(field, headers[idx].clone());
        }
    }

    mapping
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_french_bank_export() {
        let mapping = detect_columns(&headers(&["Date Comptable", "Montant", "Description"]));
        assert_eq!(mapping.date.as_deref(), Some("Date Comptable"));
        assert_eq!(mapping.amount.as_deref(), Some("Montant"));
        assert_eq!(mapping.description.as_deref(), Some("Description"));
        assert!(mapping.kind.is_none());
        assert!(mapping.category.is_none());
    }

    #[test]
    fn test_first_synonym_wins_over_file_order() {
        // "execution date" contains "date" too, and "date" is tried first,
        // so the first header containing "date" is picked.
        let mapping = detect_columns(&headers(&["Execution Date", "Value Date", "Amount"]));
        assert_eq!(mapping.date.as_deref(), Some("Execution Date"));

        // "amount" outranks "value" even though "Value" comes first
        let mapping = detect_columns(&headers(&["Value", "Amount"]));
        assert_eq!(mapping.amount.as_deref(), Some("Amount"));
    }

    #[test]
    fn test_type_header_feeds_type_and_category() {
        let mapping = detect_columns(&headers(&["Date", "Type", "Amount"]));
        assert_eq!(mapping.kind.as_deref(), Some("Type"));
        assert_eq!(mapping.category.as_deref(), Some("Type"));
    }

    #[test]
    fn test_accented_and_plain_synonyms() {
        let mapping = detect_columns(&headers(&["Libellé", "Catégorie", "Moyen de paiement"]));
        assert_eq!(mapping.description.as_deref(), Some("Libellé"));
        assert_eq!(mapping.category.as_deref(), Some("Catégorie"));
        assert_eq!(mapping.payment_method.as_deref(), Some("Moyen de paiement"));
    }

    #[test]
    fn test_empty_headers_map_nothing() {
        let mapping = detect_columns(&[]);
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_custom_rule_table() {
        let rules = [rule(Field::Amount, "debit")];
        let mapping = detect_columns_with(&headers(&["Debit EUR", "Amount"]), &rules);
        assert_eq!(mapping.amount.as_deref(), Some("Debit EUR"));
        assert!(mapping.date.is_none());
    }
}
