//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod categorizer;
mod repository;
mod table_reader;

pub use categorizer::{CategorySuggester, CategorySuggestion};
pub use repository::{ImportBatch, TransactionStore};
pub use table_reader::TableReader;
