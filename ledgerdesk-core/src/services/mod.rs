//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod categorize;
mod category;
mod cost;
pub mod import;
pub mod logging;
pub mod migration;
mod transaction;

pub use categorize::{CategorizeEntry, CategorizeResult, CategorizeService};
pub use category::CategoryService;
pub use cost::{CostEstimate, CostService};
pub use import::{ColumnMapping, ImportResult, ImportService};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use migration::{MigrationResult, MigrationService, MigrationSet};
pub use transaction::{Page, TransactionService};
