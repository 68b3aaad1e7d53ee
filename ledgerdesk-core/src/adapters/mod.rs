//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the TransactionStore port (and the rest of the ledger)
//! - csv/calamine for the TableReader port
//! - Configured description rules for the CategorySuggester port

pub mod duckdb;
pub mod rules;
pub mod spreadsheet;
