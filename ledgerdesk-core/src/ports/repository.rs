//! Transaction store port - persistence used by spreadsheet ingestion

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::result::Result;
use crate::domain::{DuplicateKey, Transaction};

/// Record of one upload
#[derive(Debug, Clone, Serialize)]
pub struct ImportBatch {
    pub batch_id: String,
    pub owner_id: String,
    pub file_name: String,
    /// SHA-256 of the uploaded file, hex encoded
    pub checksum: String,
    /// Data rows found in the file
    pub row_count: i64,
    pub imported_count: i64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Persistence operations the import pipeline depends on
///
/// The DuckDB adapter implements this; tests substitute an in-memory store.
pub trait TransactionStore: Send + Sync {
    /// Whether the owner already has a record with this date, amount and description
    fn exists_by_owner_date_amount_description(
        &self,
        owner_id: &str,
        date: NaiveDate,
        amount: Decimal,
        description: &str,
    ) -> Result<bool>;

    /// Batch form of the check above: which of `keys` already exist for the owner
    fn find_existing_keys(
        &self,
        owner_id: &str,
        keys: &[DuplicateKey],
    ) -> Result<HashSet<DuplicateKey>>;

    /// Insert all records atomically, returning the number written
    fn bulk_insert(&self, transactions: &[Transaction]) -> Result<usize>;

    /// Insert the records and their batch row in one store transaction.
    /// On error nothing is written.
    fn commit_import(&self, transactions: &[Transaction], batch: &ImportBatch) -> Result<usize>;
}
