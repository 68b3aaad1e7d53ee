//! Transaction domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// Category assigned when a record carries none
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Whether money came in or went out. The amount itself is always unsigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Income,
    Expense,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Income => "income",
            Direction::Expense => "expense",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Direction::Income),
            "expense" => Ok(Direction::Expense),
            other => Err(Error::validation(format!("Invalid transaction type: {}", other))),
        }
    }
}

/// How a transaction was paid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Credit,
    Debit,
    Transfer,
    Check,
    #[default]
    Other,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Credit => "credit",
            PaymentMethod::Debit => "debit",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Check => "check",
            PaymentMethod::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "credit" => Ok(PaymentMethod::Credit),
            "debit" => Ok(PaymentMethod::Debit),
            "transfer" => Ok(PaymentMethod::Transfer),
            "check" => Ok(PaymentMethod::Check),
            "other" => Ok(PaymentMethod::Other),
            other => Err(Error::validation(format!("Invalid payment method: {}", other))),
        }
    }
}

/// Repeat interval of a recurring transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringFrequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RecurringFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringFrequency::Daily => "daily",
            RecurringFrequency::Weekly => "weekly",
            RecurringFrequency::Monthly => "monthly",
            RecurringFrequency::Yearly => "yearly",
        }
    }
}

impl FromStr for RecurringFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(RecurringFrequency::Daily),
            "weekly" => Ok(RecurringFrequency::Weekly),
            "monthly" => Ok(RecurringFrequency::Monthly),
            "yearly" => Ok(RecurringFrequency::Yearly),
            other => Err(Error::validation(format!("Invalid recurring frequency: {}", other))),
        }
    }
}

/// A persisted financial transaction owned by one user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Identifier of the user the record belongs to
    pub owner_id: String,
    pub date: NaiveDate,
    pub description: String,
    /// Always non-negative; `direction` carries the sign
    pub amount: Decimal,
    pub direction: Direction,
    pub category: String,
    pub subcategory: Option<String>,
    pub payment_method: PaymentMethod,
    pub reference: String,
    pub notes: Option<String>,
    pub is_recurring: bool,
    pub recurring_frequency: Option<RecurringFrequency>,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // =========================================================================
    // Spreadsheet import tracking
    // =========================================================================
    /// Base name of the uploaded file the row came from
    pub source_file: Option<String>,
    /// Probable-duplicate key built at ingestion time
    pub fingerprint: Option<String>,
    /// Which import batch this transaction belongs to
    pub import_batch_id: Option<String>,
}

impl Transaction {
    /// Create a new transaction with required fields
    pub fn new(
        id: Uuid,
        owner_id: impl Into<String>,
        date: NaiveDate,
        amount: Decimal,
        direction: Direction,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            owner_id: owner_id.into(),
            date,
            description: String::new(),
            amount: amount.abs(),
            direction,
            category: UNCATEGORIZED.to_string(),
            subcategory: None,
            payment_method: PaymentMethod::Other,
            reference: String::new(),
            notes: None,
            is_recurring: false,
            recurring_frequency: None,
            is_verified: true,
            created_at: now,
            updated_at: now,
            source_file: None,
            fingerprint: None,
            import_batch_id: None,
        }
    }

    /// Signed amount: positive for income, negative for expenses
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Income => self.amount,
            Direction::Expense => -self.amount,
        }
    }

    /// Key used by the live duplicate check on upload
    pub fn duplicate_key(&self) -> DuplicateKey {
        DuplicateKey::new(self.date, self.amount, &self.description)
    }
}

/// The (date, amount, description) triple an upload is deduplicated on.
///
/// Amounts are normalized so `45.00` and `45` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DuplicateKey {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
}

impl DuplicateKey {
    pub fn new(date: NaiveDate, amount: Decimal, description: &str) -> Self {
        Self {
            date,
            amount: amount.normalize(),
            description: description.to_string(),
        }
    }
}

/// Input for a manually entered transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_frequency: Option<RecurringFrequency>,
}

impl NewTransaction {
    /// Check the fields a manual entry must carry
    pub fn validate(&self) -> Result<()> {
        if self.description.trim().is_empty() {
            return Err(Error::validation("Description is required"));
        }
        if self.category.trim().is_empty() {
            return Err(Error::validation("Category is required"));
        }
        if self.amount < Decimal::ZERO {
            return Err(Error::validation("Amount must not be negative"));
        }
        if self.is_recurring && self.recurring_frequency.is_none() {
            return Err(Error::validation("Recurring transactions need a frequency"));
        }
        Ok(())
    }

    /// Build the record for the given owner
    pub fn into_transaction(self, owner_id: &str) -> Transaction {
        let mut tx = Transaction::new(
            Uuid::new_v4(),
            owner_id,
            self.date,
            self.amount,
            self.direction,
        );
        tx.description = self.description.trim().to_string();
        tx.category = self.category.trim().to_string();
        tx.subcategory = self.subcategory.map(|s| s.trim().to_string());
        tx.payment_method = self.payment_method;
        tx.reference = self.reference.map(|r| r.trim().to_string()).unwrap_or_default();
        tx.notes = self.notes.map(|n| n.trim().to_string());
        tx.is_recurring = self.is_recurring;
        tx.recurring_frequency = self.recurring_frequency;
        tx
    }
}

/// Partial edit of an existing transaction; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionUpdate {
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    #[serde(rename = "type")]
    pub direction: Option<Direction>,
    pub category: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub is_verified: Option<bool>,
}

impl TransactionUpdate {
    /// Apply the edit, rejecting values a manual entry could not carry
    pub fn apply_to(&self, tx: &mut Transaction) -> Result<()> {
        if let Some(description) = &self.description {
            if description.trim().is_empty() {
                return Err(Error::validation("Description is required"));
            }
            tx.description = description.trim().to_string();
        }
        if let Some(category) = &self.category {
            if category.trim().is_empty() {
                return Err(Error::validation("Category is required"));
            }
            tx.category = category.trim().to_string();
        }
        if let Some(amount) = self.amount {
            if amount < Decimal::ZERO {
                return Err(Error::validation("Amount must not be negative"));
            }
            tx.amount = amount;
        }
        if let Some(date) = self.date {
            tx.date = date;
        }
        if let Some(direction) = self.direction {
            tx.direction = direction;
        }
        if let Some(method) = self.payment_method {
            tx.payment_method = method;
        }
        if let Some(reference) = &self.reference {
            tx.reference = reference.trim().to_string();
        }
        if let Some(notes) = &self.notes {
            tx.notes = Some(notes.trim().to_string());
        }
        if let Some(verified) = self.is_verified {
            tx.is_verified = verified;
        }
        tx.updated_at = Utc::now();
        Ok(())
    }
}

/// Listing criteria; `page` is 1-based
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub direction: Option<Direction>,
    pub page: u32,
    pub limit: u32,
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            category: None,
            direction: None,
            page: 1,
            limit: 10,
        }
    }
}

impl TransactionFilter {
    /// Rows to skip for the requested page
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction::new(
            Uuid::new_v4(),
            "owner-1",
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            Decimal::new(-4500, 2),
            Direction::Expense,
        )
    }

    #[test]
    fn test_new_transaction_defaults() {
        let tx = sample();
        assert_eq!(tx.amount, Decimal::new(4500, 2));
        assert_eq!(tx.category, UNCATEGORIZED);
        assert_eq!(tx.payment_method, PaymentMethod::Other);
        assert!(tx.is_verified);
        assert_eq!(tx.signed_amount(), Decimal::new(-4500, 2));
    }

    #[test]
    fn test_duplicate_key_ignores_trailing_zeros() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let a = DuplicateKey::new(date, Decimal::new(4500, 2), "EDF");
        let b = DuplicateKey::new(date, Decimal::new(45, 0), "EDF");
        assert_eq!(a, b);
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("Income".parse::<Direction>().unwrap(), Direction::Income);
        assert_eq!("transfer".parse::<PaymentMethod>().unwrap(), PaymentMethod::Transfer);
        assert!("wire".parse::<PaymentMethod>().is_err());
        assert_eq!("monthly".parse::<RecurringFrequency>().unwrap(), RecurringFrequency::Monthly);
    }

    #[test]
    fn test_new_transaction_validation() {
        let input = NewTransaction {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            description: "  ".to_string(),
            amount: Decimal::new(100, 0),
            direction: Direction::Income,
            category: "consulting".to_string(),
            subcategory: None,
            payment_method: PaymentMethod::Transfer,
            reference: None,
            notes: None,
            is_recurring: false,
            recurring_frequency: None,
        };
        assert!(input.validate().is_err());

        let input = NewTransaction { description: " Invoice 42 ".to_string(), ..input };
        input.validate().unwrap();
        let tx = input.into_transaction("owner-1");
        assert_eq!(tx.description, "Invoice 42");
        assert_eq!(tx.owner_id, "owner-1");
    }

    #[test]
    fn test_filter_offset() {
        let filter = TransactionFilter { page: 3, limit: 25, ..Default::default() };
        assert_eq!(filter.offset(), 50);
        let filter = TransactionFilter { page: 0, ..Default::default() };
        assert_eq!(filter.offset(), 0);
    }

    #[test]
    fn test_update_rejects_negative_amount() {
        let mut tx = sample();
        let update = TransactionUpdate {
            amount: Some(Decimal::new(-1, 0)),
            ..Default::default()
        };
        assert!(update.apply_to(&mut tx).is_err());

        let update = TransactionUpdate {
            category: Some("logiciels".to_string()),
            ..Default::default()
        };
        update.apply_to(&mut tx).unwrap();
        assert_eq!(tx.category, "logiciels");
    }
}
