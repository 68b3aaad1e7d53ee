//! Categorize service - apply suggested categories to transactions

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::ports::CategorySuggester;

/// What happened to one transaction
#[derive(Debug, Clone, Serialize)]
pub struct CategorizeEntry {
    pub transaction_id: Uuid,
    pub description: String,
    pub previous_category: String,
    /// Suggested category, or the existing one when there was no suggestion
    pub suggested_category: String,
    /// 0.0 when there was no suggestion
    pub confidence: f64,
    /// Whether the suggestion was written
    pub applied: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategorizeResult {
    pub suggester: String,
    pub entries: Vec<CategorizeEntry>,
    pub applied: usize,
}

pub struct CategorizeService {
    repository: Arc<DuckDbRepository>,
    suggester: Arc<dyn CategorySuggester>,
    min_confidence: f64,
}

impl CategorizeService {
    pub fn new(
        repository: Arc<DuckDbRepository>,
        suggester: Arc<dyn CategorySuggester>,
        min_confidence: f64,
    ) -> Self {
        Self {
            repository,
            suggester,
            min_confidence,
        }
    }

    /// Ask the suggester about the owner's transactions among `ids` and
    /// write every suggestion at or above the confidence threshold.
    ///
    /// Ids the owner does not have are skipped.
    pub fn categorize(&self, owner_id: &str, ids: &[Uuid]) -> Result<CategorizeResult> {
        if ids.is_empty() {
            return Err(Error::validation("No transaction ids given").into());
        }

        let transactions = self.repository.get_transactions_by_ids(owner_id, ids)?;
        let suggestions = self
            .suggester
            .suggest(&transactions)
            .with_context(|| format!("Category suggester '{}' failed", self.suggester.name()))?;

        let mut entries = Vec::with_capacity(transactions.len());
        let mut applied = 0;

        for tx in &transactions {
            let suggestion = suggestions.iter().find(|s| s.transaction_id == tx.id);
            let (category, confidence) = match suggestion {
                Some(s) => (s.category.clone(), s.confidence),
                None => (tx.category.clone(), 0.0),
            };

            let should_apply = suggestion.is_some()
                && confidence >= self.min_confidence
                && category != tx.category;
            if should_apply {
                self.repository
                    .update_transaction_category(owner_id, tx.id, &category)?;
                applied += 1;
            }

            entries.push(CategorizeEntry {
                transaction_id: tx.id,
                description: tx.description.clone(),
                previous_category: tx.category.clone(),
                suggested_category: category,
                confidence,
                applied: should_apply,
            });
        }

        Ok(CategorizeResult {
            suggester: self.suggester.name().to_string(),
            entries,
            applied,
        })
    }
}
