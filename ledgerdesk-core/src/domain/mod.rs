//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod category;
mod cost;
mod employee;
pub mod result;
pub mod table;
mod transaction;

pub use category::{Category, CategoryKind, DEFAULT_COLOR, DEFAULT_ICON};
pub use cost::{Cost, CostFrequency, CostUpdate};
pub use employee::{
    CostPeriod, Employee, EmployeeCost, EmployeeCostCategory, EmployeeCostUpdate, EmployeeStatus,
    EmployeeUpdate, EmploymentType,
};
pub use table::{CellValue, RawRow, RawTable};
pub use transaction::{
    Direction, DuplicateKey, NewTransaction, PaymentMethod, RecurringFrequency, Transaction,
    TransactionFilter, TransactionUpdate, UNCATEGORIZED,
};
