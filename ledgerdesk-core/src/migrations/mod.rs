//! Ledger database migrations, embedded with include_str!
//!
//! Applied in name order by `MigrationService`; each applied file is
//! recorded in `sys_migrations`.

/// (file name, SQL) pairs in application order.
/// New files must be named `NNN_description.sql` and appended here.
pub const MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
    ("002_default_categories.sql", include_str!("002_default_categories.sql")),
    ("003_costs_and_employees.sql", include_str!("003_costs_and_employees.sql")),
];
