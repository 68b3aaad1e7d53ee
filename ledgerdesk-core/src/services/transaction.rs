//! Transaction service - manual records, listing and export

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::{NewTransaction, Transaction, TransactionFilter, TransactionUpdate};

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}

const EXPORT_HEADERS: [&str; 13] = [
    "id",
    "date",
    "description",
    "amount",
    "type",
    "category",
    "subcategory",
    "payment_method",
    "reference",
    "notes",
    "is_recurring",
    "is_verified",
    "source_file",
];

pub struct TransactionService {
    repository: Arc<DuckDbRepository>,
}

impl TransactionService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Owner's transactions matching the filter, newest first
    pub fn list(&self, owner_id: &str, filter: &TransactionFilter) -> Result<Page<Transaction>> {
        let (items, total) = self.repository.list_transactions(owner_id, filter)?;
        let pages = if filter.limit == 0 {
            0
        } else {
            total.div_ceil(u64::from(filter.limit))
        };
        Ok(Page {
            items,
            page: filter.page.max(1),
            limit: filter.limit,
            total,
            pages,
        })
    }

    pub fn get(&self, owner_id: &str, id: Uuid) -> Result<Transaction> {
        self.repository
            .get_transaction(owner_id, id)?
            .ok_or_else(|| Error::not_found(format!("Transaction {}", id)).into())
    }

    pub fn create(&self, owner_id: &str, input: NewTransaction) -> Result<Transaction> {
        input.validate()?;
        let tx = input.into_transaction(owner_id);
        self.repository
            .insert_transaction(&tx)
            .context("Failed to save transaction")?;
        Ok(tx)
    }

    pub fn update(&self, owner_id: &str, id: Uuid, changes: &TransactionUpdate) -> Result<Transaction> {
        let mut tx = self.get(owner_id, id)?;
        changes.apply_to(&mut tx)?;
        if !self.repository.update_transaction(&tx)? {
            return Err(Error::not_found(format!("Transaction {}", id)).into());
        }
        Ok(tx)
    }

    pub fn delete(&self, owner_id: &str, id: Uuid) -> Result<()> {
        if !self.repository.delete_transaction(owner_id, id)? {
            return Err(Error::not_found(format!("Transaction {}", id)).into());
        }
        Ok(())
    }

    /// Delete several records; ids the owner does not have are ignored
    pub fn bulk_delete(&self, owner_id: &str, ids: &[Uuid]) -> Result<usize> {
        if ids.is_empty() {
            return Err(Error::validation("No transaction ids given").into());
        }
        Ok(self.repository.delete_transactions(owner_id, ids)?)
    }

    /// Write every matching transaction as CSV (pagination is ignored).
    /// Returns the number of data rows written.
    pub fn export_csv<W: Write>(
        &self,
        owner_id: &str,
        filter: &TransactionFilter,
        writer: W,
    ) -> Result<usize> {
        let transactions = self.repository.list_all_transactions(owner_id, filter)?;

        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(EXPORT_HEADERS)?;
        for tx in &transactions {
            wtr.write_record([
                tx.id.to_string(),
                tx.date.to_string(),
                tx.description.clone(),
                tx.amount.to_string(),
                tx.direction.to_string(),
                tx.category.clone(),
                tx.subcategory.clone().unwrap_or_default(),
                tx.payment_method.to_string(),
                tx.reference.clone(),
                tx.notes.clone().unwrap_or_default(),
                tx.is_recurring.to_string(),
                tx.is_verified.to_string(),
                tx.source_file.clone().unwrap_or_default(),
            ])?;
        }
        wtr.flush().context("Failed to write CSV export")?;

        Ok(transactions.len())
    }
}
