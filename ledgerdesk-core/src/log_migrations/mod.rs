//! Log database migrations, embedded with include_str!
//!
//! Applied in order by `LoggingService`. `000_migrations.sql` bootstraps
//! the bookkeeping table and is never recorded twice.

/// (file name, SQL) pairs in application order.
/// New files must be named `NNN_description.sql` and appended here.
pub const LOG_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_initial_schema.sql", include_str!("001_initial_schema.sql")),
];
