//! Category suggestion port
//!
//! Given transactions, an implementation returns suggested categories with a
//! confidence score. A remote model would sit behind this trait; the crate
//! ships a local rule-based implementation only.

use serde::Serialize;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::Transaction;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySuggestion {
    pub transaction_id: Uuid,
    pub category: String,
    /// Between 0.0 and 1.0
    pub confidence: f64,
}

pub trait CategorySuggester: Send + Sync {
    /// Suggester name (e.g., "rules")
    fn name(&self) -> &str;

    /// Suggest categories; transactions without a suggestion are simply omitted
    fn suggest(&self, transactions: &[Transaction]) -> Result<Vec<CategorySuggestion>>;
}
