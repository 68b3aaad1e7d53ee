//! LedgerDesk Core - Business logic for small-business bookkeeping
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core business entities (Transaction, Category, Cost, Employee)
//! - **ports**: Trait definitions for external dependencies (TransactionStore, TableReader, CategorySuggester)
//! - **services**: Business logic orchestration (spreadsheet import, records, categorization)
//! - **adapters**: Concrete implementations (DuckDB, csv/calamine, description rules)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use adapters::duckdb::DuckDbRepository;
use adapters::rules::RuleSuggester;
use adapters::spreadsheet::SpreadsheetReader;
use config::Config;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{Category, Cost, Employee, Transaction};
pub use services::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};

/// Ledger database file inside the data directory
pub const DB_FILENAME: &str = "ledgerdesk.duckdb";

/// Main context for LedgerDesk operations
///
/// This is the primary entry point for all business logic. It holds
/// the database connection, configuration, and all services.
pub struct LedgerContext {
    pub config: Config,
    pub repository: Arc<DuckDbRepository>,
    pub import_service: ImportService,
    pub transaction_service: TransactionService,
    pub category_service: CategoryService,
    pub categorize_service: CategorizeService,
    pub cost_service: CostService,
}

impl LedgerContext {
    /// Open the ledger in `data_dir`, creating the database on first use
    pub fn new(data_dir: &Path) -> Result<Self> {
        Self::build(data_dir, None)
    }

    /// Same as [`LedgerContext::new`], with import events sent to `logger`
    pub fn with_logger(data_dir: &Path, logger: Arc<LoggingService>) -> Result<Self> {
        Self::build(data_dir, Some(logger))
    }

    fn build(data_dir: &Path, logger: Option<Arc<LoggingService>>) -> Result<Self> {
        let config = Config::load(data_dir)?;

        let db_path = data_dir.join(DB_FILENAME);
        let repository = Arc::new(
            DuckDbRepository::new(&db_path)
                .with_context(|| format!("Failed to open {}", db_path.display()))?,
        );

        // Initialize schema
        repository.ensure_schema()?;

        let mut import_service = ImportService::new(
            repository.clone(),
            Arc::new(SpreadsheetReader::new()),
            config.import.clone(),
        );
        if let Some(logger) = logger {
            import_service = import_service.with_logger(logger);
        }

        let suggester = RuleSuggester::new(&config.categorization.rules)?;
        let categorize_service = CategorizeService::new(
            Arc::clone(&repository),
            Arc::new(suggester),
            config.categorization.min_confidence,
        );

        let transaction_service = TransactionService::new(Arc::clone(&repository));
        let category_service = CategoryService::new(Arc::clone(&repository));
        let cost_service = CostService::new(Arc::clone(&repository));

        Ok(Self {
            config,
            repository,
            import_service,
            transaction_service,
            category_service,
            categorize_service,
            cost_service,
        })
    }
}
