//! Local rule-based category suggester

use regex::{Regex, RegexBuilder};

use crate::config::{CategoryRule, MatchType};
use crate::domain::result::{Error, Result};
use crate::domain::Transaction;
use crate::ports::{CategorySuggester, CategorySuggestion};

/// Confidence reported for a rule hit; rules are exact by construction
const RULE_CONFIDENCE: f64 = 1.0;

enum Matcher {
    Contains(String),
    StartsWith(String),
    Regex(Regex),
}

impl Matcher {
    fn matches(&self, description: &str) -> bool {
        match self {
            Matcher::Contains(p) => description.to_lowercase().contains(p),
            Matcher::StartsWith(p) => description.trim_start().to_lowercase().starts_with(p),
            Matcher::Regex(re) => re.is_match(description),
        }
    }
}

/// Suggests categories from description rules; the first matching rule wins
pub struct RuleSuggester {
    rules: Vec<(Matcher, String)>,
}

impl RuleSuggester {
    /// Compile the rules. Regex patterns are case-insensitive; an invalid one
    /// is a configuration error.
    pub fn new(rules: &[CategoryRule]) -> Result<Self> {
        let compiled = rules
            .iter()
            .map(|rule| {
                let matcher = match rule.match_type {
                    MatchType::Contains => Matcher::Contains(rule.pattern.to_lowercase()),
                    MatchType::StartsWith => Matcher::StartsWith(rule.pattern.to_lowercase()),
                    MatchType::Regex => Matcher::Regex(
                        RegexBuilder::new(&rule.pattern)
                            .case_insensitive(true)
                            .build()
                            .map_err(|e| {
                                Error::Config(format!("Invalid rule pattern '{}': {}", rule.pattern, e))
                            })?,
                    ),
                };
                Ok((matcher, rule.category.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules: compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl CategorySuggester for RuleSuggester {
    fn name(&self) -> &str {
        "rules"
    }

    fn suggest(&self, transactions: &[Transaction]) -> Result<Vec<CategorySuggestion>> {
        Ok(transactions
            .iter()
            .filter_map(|tx| {
                self.rules
                    .iter()
                    .find(|(matcher, _)| matcher.matches(&tx.description))
                    .map(|(_, category)| CategorySuggestion {
                        transaction_id: tx.id,
                        category: category.clone(),
                        confidence: RULE_CONFIDENCE,
                    })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn rule(pattern: &str, match_type: MatchType, category: &str) -> CategoryRule {
        CategoryRule {
            pattern: pattern.to_string(),
            match_type,
            category: category.to_string(),
        }
    }

    fn tx(description: &str) -> Transaction {
        let mut tx = Transaction::new(
            Uuid::new_v4(),
            "owner",
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            Decimal::new(4500, 2),
            Direction::Expense,
        );
        tx.description = description.to_string();
        tx
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let suggester = RuleSuggester::new(&[
            rule("edf", MatchType::Contains, "Energie"),
            rule("facture", MatchType::Contains, "Divers"),
        ])
        .unwrap();

        let txs = vec![tx("EDF Facture"), tx("Facture Orange"), tx("Loyer")];
        let suggestions = suggester.suggest(&txs).unwrap();

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].transaction_id, txs[0].id);
        assert_eq!(suggestions[0].category, "Energie");
        assert_eq!(suggestions[1].category, "Divers");
        assert_eq!(suggestions[1].confidence, 1.0);
    }

    #[test]
    fn test_starts_with_and_regex() {
        let suggester = RuleSuggester::new(&[
            rule("amazon", MatchType::StartsWith, "fournitures bureau"),
            rule(r"^prlv\s+sepa", MatchType::Regex, "abonnements"),
        ])
        .unwrap();

        let txs = vec![tx("  Amazon Marketplace"), tx("Paiement Amazon"), tx("PRLV SEPA Netflix")];
        let suggestions = suggester.suggest(&txs).unwrap();

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].category, "fournitures bureau");
        assert_eq!(suggestions[1].transaction_id, txs[2].id);
    }

    #[test]
    fn test_invalid_regex_is_config_error() {
        let result = RuleSuggester::new(&[rule("(unclosed", MatchType::Regex, "x")]);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
