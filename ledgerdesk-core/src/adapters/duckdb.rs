//! DuckDB repository implementation

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use duckdb::{params, params_from_iter, Connection, Statement};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{
    Category, Cost, DuplicateKey, Employee, EmployeeCost, Transaction, TransactionFilter,
    UNCATEGORIZED,
};
use crate::ports::{ImportBatch, TransactionStore};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of attempts when the database file is locked
const MAX_RETRIES: u32 = 5;

/// First retry delay in milliseconds; doubles on each attempt
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Whether an open error is a file-locking problem worth retrying
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

const TRANSACTION_COLUMNS: &str = "transaction_id, owner_id, transaction_date::VARCHAR, description, \
    amount::VARCHAR, direction, category, subcategory, payment_method, reference, notes, \
    is_recurring, recurring_frequency, is_verified, source_file, fingerprint, import_batch_id, \
    created_at::VARCHAR, updated_at::VARCHAR";

const INSERT_TRANSACTION: &str = "INSERT INTO sys_transactions (
        transaction_id, owner_id, transaction_date, description, amount, direction, category,
        subcategory, payment_method, reference, notes, is_recurring, recurring_frequency,
        is_verified, source_file, fingerprint, import_batch_id, created_at, updated_at)
     VALUES (?, ?, ?::DATE, ?, ?::DECIMAL(18, 2), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
             ?::TIMESTAMP, ?::TIMESTAMP)";

const CATEGORY_COLUMNS: &str =
    "category_id, name, kind, is_default, is_active, color, icon, parent_id, created_at::VARCHAR";

const COST_COLUMNS: &str = "cost_id, owner_id, name, description, amount::VARCHAR, category, \
    frequency, start_date::VARCHAR, end_date::VARCHAR, is_active, CAST(tags AS VARCHAR), notes, \
    related_employee_id, created_at::VARCHAR, updated_at::VARCHAR";

const EMPLOYEE_COLUMNS: &str = "employee_id, owner_id, first_name, last_name, email, position, \
    department, hire_date::VARCHAR, employment_type, status, total_monthly_cost::VARCHAR, \
    total_yearly_cost::VARCHAR, created_at::VARCHAR, updated_at::VARCHAR";

/// DuckDB-backed store for the whole ledger
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRepository {
    /// Open (or create) the database at `db_path`.
    ///
    /// Lock errors are retried with exponential backoff, since another
    /// process may hold the file briefly.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[ledgerdesk] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open database after {} retries", MAX_RETRIES))
        }))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading stays off; JSON is linked in through the cargo feature
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Ok(Connection::open_with_flags(db_path, config)?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| Error::database(format!("Lock poisoned: {}", e)))
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.conn()?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure the schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    // === Transaction operations ===

    pub fn insert_transaction(&self, tx: &Transaction) -> Result<()> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(INSERT_TRANSACTION)?;
        execute_insert(&mut stmt, tx)?;
        Ok(())
    }

    pub fn get_transaction(&self, owner_id: &str, id: Uuid) -> Result<Option<Transaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_transactions WHERE owner_id = ? AND transaction_id = ?",
            TRANSACTION_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![owner_id, id.to_string()], row_to_transaction)?;
        Ok(rows.next().transpose()?)
    }

    /// The owner's transactions with the given ids; unknown ids are skipped
    pub fn get_transactions_by_ids(&self, owner_id: &str, ids: &[Uuid]) -> Result<Vec<Transaction>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM sys_transactions WHERE owner_id = ? AND transaction_id IN ({})
             ORDER BY transaction_date DESC, created_at DESC",
            TRANSACTION_COLUMNS,
            placeholders(ids.len())
        );
        let mut args = vec![owner_id.to_string()];
        args.extend(ids.iter().map(|id| id.to_string()));

        let mut stmt = conn.prepare(&sql)?;
        let txs = stmt
            .query_map(params_from_iter(args.iter()), row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(txs)
    }

    /// One page of the owner's transactions, newest first, plus the total match count
    pub fn list_transactions(
        &self,
        owner_id: &str,
        filter: &TransactionFilter,
    ) -> Result<(Vec<Transaction>, u64)> {
        let (where_clause, args) = filter_clause(owner_id, filter);
        let conn = self.conn()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM sys_transactions WHERE {}", where_clause),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {} FROM sys_transactions WHERE {}
             ORDER BY transaction_date DESC, created_at DESC
             LIMIT {} OFFSET {}",
            TRANSACTION_COLUMNS,
            where_clause,
            filter.limit,
            filter.offset()
        );
        let mut stmt = conn.prepare(&sql)?;
        let txs = stmt
            .query_map(params_from_iter(args.iter()), row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok((txs, total.max(0) as u64))
    }

    /// Every transaction matching the filter, ignoring pagination
    pub fn list_all_transactions(
        &self,
        owner_id: &str,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let (where_clause, args) = filter_clause(owner_id, filter);
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_transactions WHERE {} ORDER BY transaction_date DESC, created_at DESC",
            TRANSACTION_COLUMNS, where_clause
        ))?;
        let txs = stmt
            .query_map(params_from_iter(args.iter()), row_to_transaction)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(txs)
    }

    /// Overwrite the editable fields; returns false when the record does not exist
    pub fn update_transaction(&self, tx: &Transaction) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE sys_transactions SET
                transaction_date = ?::DATE, description = ?, amount = ?::DECIMAL(18, 2),
                direction = ?, category = ?, subcategory = ?, payment_method = ?, reference = ?,
                notes = ?, is_recurring = ?, recurring_frequency = ?, is_verified = ?,
                updated_at = ?::TIMESTAMP
             WHERE owner_id = ? AND transaction_id = ?",
            params![
                tx.date.to_string(),
                tx.description,
                tx.amount.to_string(),
                tx.direction.as_str(),
                tx.category,
                tx.subcategory,
                tx.payment_method.as_str(),
                tx.reference,
                tx.notes,
                tx.is_recurring,
                tx.recurring_frequency.map(|f| f.as_str()),
                tx.is_verified,
                format_timestamp(&tx.updated_at),
                tx.owner_id,
                tx.id.to_string(),
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn update_transaction_category(
        &self,
        owner_id: &str,
        id: Uuid,
        category: &str,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE sys_transactions SET category = ?, updated_at = ?::TIMESTAMP
             WHERE owner_id = ? AND transaction_id = ?",
            params![category, format_timestamp(&Utc::now()), owner_id, id.to_string()],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_transaction(&self, owner_id: &str, id: Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM sys_transactions WHERE owner_id = ? AND transaction_id = ?",
            params![owner_id, id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// Delete the owner's records among `ids`; returns how many went
    pub fn delete_transactions(&self, owner_id: &str, ids: &[Uuid]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let conn = self.conn()?;
        let sql = format!(
            "DELETE FROM sys_transactions WHERE owner_id = ? AND transaction_id IN ({})",
            placeholders(ids.len())
        );
        let mut args = vec![owner_id.to_string()];
        args.extend(ids.iter().map(|id| id.to_string()));
        Ok(conn.execute(&sql, params_from_iter(args.iter()))?)
    }

    pub fn count_transactions(&self, owner_id: &str) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_transactions WHERE owner_id = ?",
            [owner_id],
            |row| row.get(0),
        )?;
        Ok(count.max(0) as u64)
    }

    // === Import batches ===

    pub fn list_import_batches(&self, owner_id: &str) -> Result<Vec<ImportBatch>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT batch_id, owner_id, file_name, checksum, row_count, imported_count,
                    start_date::VARCHAR, end_date::VARCHAR, created_at::VARCHAR
             FROM sys_import_batches WHERE owner_id = ? ORDER BY created_at DESC",
        )?;
        let batches = stmt
            .query_map([owner_id], |row| {
                let start: Option<String> = row.get(6)?;
                let end: Option<String> = row.get(7)?;
                let created: String = row.get(8)?;
                Ok(ImportBatch {
                    batch_id: row.get(0)?,
                    owner_id: row.get(1)?,
                    file_name: row.get(2)?,
                    checksum: row.get(3)?,
                    row_count: row.get(4)?,
                    imported_count: row.get(5)?,
                    start_date: start.as_deref().and_then(parse_date),
                    end_date: end.as_deref().and_then(parse_date),
                    created_at: parse_timestamp(&created),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(batches)
    }

    // === Categories ===

    /// Defaults first, then alphabetical
    pub fn list_categories(&self, include_inactive: bool) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM sys_categories {} ORDER BY is_default DESC, name",
            CATEGORY_COLUMNS,
            if include_inactive { "" } else { "WHERE is_active" }
        );
        let mut stmt = conn.prepare(&sql)?;
        let categories = stmt
            .query_map([], row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Case-insensitive name lookup
    pub fn category_name_exists(&self, name: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_categories WHERE lower(name) = lower(?)",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn insert_category(&self, category: &Category) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sys_categories
                (category_id, name, kind, is_default, is_active, color, icon, parent_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?::TIMESTAMP)",
            params![
                category.id.to_string(),
                category.name,
                category.kind.as_str(),
                category.is_default,
                category.is_active,
                category.color,
                category.icon,
                category.parent_id.map(|p| p.to_string()),
                format_timestamp(&category.created_at),
            ],
        )?;
        Ok(())
    }

    // === Costs ===

    pub fn insert_cost(&self, cost: &Cost) -> Result<()> {
        let conn = self.conn()?;
        let sql = format!(
            "INSERT INTO sys_costs (cost_id, owner_id, name, description, amount, category,
                frequency, start_date, end_date, is_active, tags, notes, related_employee_id,
                created_at, updated_at)
             VALUES (?, ?, ?, ?, ?::DECIMAL(18, 2), ?, ?, ?::DATE, ?::DATE, ?, {}, ?, ?,
                     ?::TIMESTAMP, ?::TIMESTAMP)",
            format_tags_array(&cost.tags)
        );
        conn.execute(
            &sql,
            params![
                cost.id.to_string(),
                cost.owner_id,
                cost.name,
                cost.description,
                cost.amount.to_string(),
                cost.category,
                cost.frequency.as_str(),
                cost.start_date.map(|d| d.to_string()),
                cost.end_date.map(|d| d.to_string()),
                cost.is_active,
                cost.notes,
                cost.related_employee_id.map(|id| id.to_string()),
                format_timestamp(&cost.created_at),
                format_timestamp(&cost.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn list_costs(&self, owner_id: &str) -> Result<Vec<Cost>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_costs WHERE owner_id = ? ORDER BY category, name",
            COST_COLUMNS
        ))?;
        let costs = stmt
            .query_map([owner_id], row_to_cost)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(costs)
    }

    pub fn get_cost(&self, owner_id: &str, id: Uuid) -> Result<Option<Cost>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_costs WHERE owner_id = ? AND cost_id = ?",
            COST_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![owner_id, id.to_string()], row_to_cost)?;
        Ok(rows.next().transpose()?)
    }

    /// Overwrite the editable fields; tags are left as inserted
    pub fn update_cost(&self, cost: &Cost) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE sys_costs SET
                name = ?, description = ?, amount = ?::DECIMAL(18, 2), category = ?,
                frequency = ?, start_date = ?::DATE, end_date = ?::DATE, is_active = ?,
                notes = ?, updated_at = ?::TIMESTAMP
             WHERE owner_id = ? AND cost_id = ?",
            params![
                cost.name,
                cost.description,
                cost.amount.to_string(),
                cost.category,
                cost.frequency.as_str(),
                cost.start_date.map(|d| d.to_string()),
                cost.end_date.map(|d| d.to_string()),
                cost.is_active,
                cost.notes,
                format_timestamp(&cost.updated_at),
                cost.owner_id,
                cost.id.to_string(),
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_cost(&self, owner_id: &str, id: Uuid) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM sys_costs WHERE owner_id = ? AND cost_id = ?",
            params![owner_id, id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    // === Employees ===

    /// Insert the employee and its cost lines in one transaction
    pub fn insert_employee(&self, employee: &Employee) -> Result<()> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        db_tx.execute(
            "INSERT INTO sys_employees (employee_id, owner_id, first_name, last_name, email,
                position, department, hire_date, employment_type, status, total_monthly_cost,
                total_yearly_cost, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?::DATE, ?, ?, ?::DECIMAL(18, 2), ?::DECIMAL(18, 2),
                     ?::TIMESTAMP, ?::TIMESTAMP)",
            params![
                employee.id.to_string(),
                employee.owner_id,
                employee.first_name,
                employee.last_name,
                employee.email,
                employee.position,
                employee.department,
                employee.hire_date.to_string(),
                employee.employment_type.as_str(),
                employee.status.as_str(),
                employee.total_monthly_cost.to_string(),
                employee.total_yearly_cost.to_string(),
                format_timestamp(&employee.created_at),
                format_timestamp(&employee.updated_at),
            ],
        )?;

        {
            let mut stmt = db_tx.prepare(
                "INSERT INTO sys_employee_costs
                    (cost_id, employee_id, name, amount, period, category, tax_deductible, notes)
                 VALUES (?, ?, ?, ?::DECIMAL(18, 2), ?, ?, ?, ?)",
            )?;
            for cost in &employee.costs {
                stmt.execute(params![
                    cost.id.to_string(),
                    employee.id.to_string(),
                    cost.name,
                    cost.amount.to_string(),
                    cost.period.as_str(),
                    cost.category.as_str(),
                    cost.tax_deductible,
                    cost.notes,
                ])?;
            }
        }

        db_tx.commit()?;
        Ok(())
    }

    pub fn list_employees(&self, owner_id: &str) -> Result<Vec<Employee>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_employees WHERE owner_id = ? ORDER BY last_name, first_name",
            EMPLOYEE_COLUMNS
        ))?;
        let mut employees = stmt
            .query_map([owner_id], row_to_employee)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut cost_stmt = conn.prepare(
            "SELECT cost_id, name, amount::VARCHAR, period, category, tax_deductible, notes
             FROM sys_employee_costs WHERE employee_id = ? ORDER BY name",
        )?;
        for employee in &mut employees {
            employee.costs = cost_stmt
                .query_map([employee.id.to_string()], row_to_employee_cost)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
        }

        Ok(employees)
    }

    pub fn get_employee(&self, owner_id: &str, id: Uuid) -> Result<Option<Employee>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_employees WHERE owner_id = ? AND employee_id = ?",
            EMPLOYEE_COLUMNS
        ))?;
        let mut rows = stmt.query_map(params![owner_id, id.to_string()], row_to_employee)?;
        let Some(mut employee) = rows.next().transpose()? else {
            return Ok(None);
        };

        let mut cost_stmt = conn.prepare(
            "SELECT cost_id, name, amount::VARCHAR, period, category, tax_deductible, notes
             FROM sys_employee_costs WHERE employee_id = ? ORDER BY name",
        )?;
        employee.costs = cost_stmt
            .query_map([employee.id.to_string()], row_to_employee_cost)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Some(employee))
    }

    /// Save the employee row and bring its cost lines in line with `employee.costs`.
    ///
    /// Kept lines are updated in place, dropped lines deleted and new lines
    /// inserted, all in one transaction.
    pub fn update_employee(&self, employee: &Employee) -> Result<bool> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;

        let changed = db_tx.execute(
            "UPDATE sys_employees SET
                first_name = ?, last_name = ?, email = ?, position = ?, department = ?,
                hire_date = ?::DATE, employment_type = ?, status = ?,
                total_monthly_cost = ?::DECIMAL(18, 2), total_yearly_cost = ?::DECIMAL(18, 2),
                updated_at = ?::TIMESTAMP
             WHERE owner_id = ? AND employee_id = ?",
            params![
                employee.first_name,
                employee.last_name,
                employee.email,
                employee.position,
                employee.department,
                employee.hire_date.to_string(),
                employee.employment_type.as_str(),
                employee.status.as_str(),
                employee.total_monthly_cost.to_string(),
                employee.total_yearly_cost.to_string(),
                format_timestamp(&employee.updated_at),
                employee.owner_id,
                employee.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Ok(false);
        }

        let stored: HashSet<String> = {
            let mut stmt =
                db_tx.prepare("SELECT cost_id FROM sys_employee_costs WHERE employee_id = ?")?;
            let ids = stmt
                .query_map([employee.id.to_string()], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;
            ids
        };
        let current: HashSet<String> = employee.costs.iter().map(|c| c.id.to_string()).collect();

        {
            let mut delete_stmt = db_tx.prepare("DELETE FROM sys_employee_costs WHERE cost_id = ?")?;
            for gone in stored.difference(&current) {
                delete_stmt.execute([gone])?;
            }

            let mut update_stmt = db_tx.prepare(
                "UPDATE sys_employee_costs SET name = ?, amount = ?::DECIMAL(18, 2), period = ?,
                    category = ?, tax_deductible = ?, notes = ?
                 WHERE cost_id = ?",
            )?;
            let mut insert_stmt = db_tx.prepare(
                "INSERT INTO sys_employee_costs
                    (cost_id, employee_id, name, amount, period, category, tax_deductible, notes)
                 VALUES (?, ?, ?, ?::DECIMAL(18, 2), ?, ?, ?, ?)",
            )?;
            for cost in &employee.costs {
                let cost_id = cost.id.to_string();
                if stored.contains(&cost_id) {
                    update_stmt.execute(params![
                        cost.name,
                        cost.amount.to_string(),
                        cost.period.as_str(),
                        cost.category.as_str(),
                        cost.tax_deductible,
                        cost.notes,
                        cost_id,
                    ])?;
                } else {
                    insert_stmt.execute(params![
                        cost_id,
                        employee.id.to_string(),
                        cost.name,
                        cost.amount.to_string(),
                        cost.period.as_str(),
                        cost.category.as_str(),
                        cost.tax_deductible,
                        cost.notes,
                    ])?;
                }
            }
        }

        db_tx.commit()?;
        Ok(true)
    }

    /// Delete the employee and its cost lines
    pub fn delete_employee(&self, owner_id: &str, id: Uuid) -> Result<bool> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;
        let deleted = db_tx.execute(
            "DELETE FROM sys_employees WHERE owner_id = ? AND employee_id = ?",
            params![owner_id, id.to_string()],
        )?;
        if deleted > 0 {
            db_tx.execute(
                "DELETE FROM sys_employee_costs WHERE employee_id = ?",
                [id.to_string()],
            )?;
        }
        db_tx.commit()?;
        Ok(deleted > 0)
    }
}

impl TransactionStore for DuckDbRepository {
    fn exists_by_owner_date_amount_description(
        &self,
        owner_id: &str,
        date: NaiveDate,
        amount: Decimal,
        description: &str,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sys_transactions
             WHERE owner_id = ? AND transaction_date = ?::DATE
               AND amount = ?::DECIMAL(18, 2) AND description = ?",
            params![owner_id, date.to_string(), amount.to_string(), description],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// One range query over the candidates' date span, matched in memory
    fn find_existing_keys(
        &self,
        owner_id: &str,
        keys: &[DuplicateKey],
    ) -> Result<HashSet<DuplicateKey>> {
        let (Some(min), Some(max)) = (
            keys.iter().map(|k| k.date).min(),
            keys.iter().map(|k| k.date).max(),
        ) else {
            return Ok(HashSet::new());
        };

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT transaction_date::VARCHAR, amount::VARCHAR, description
             FROM sys_transactions
             WHERE owner_id = ? AND transaction_date BETWEEN ?::DATE AND ?::DATE",
        )?;
        let rows = stmt.query_map(
            params![owner_id, min.to_string(), max.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )?;

        let mut stored = HashSet::new();
        for row in rows {
            let (date, amount, description) = row?;
            if let (Some(date), Ok(amount)) = (parse_date(&date), amount.parse::<Decimal>()) {
                stored.insert(DuplicateKey::new(date, amount, &description));
            }
        }

        Ok(keys.iter().filter(|k| stored.contains(k)).cloned().collect())
    }

    fn bulk_insert(&self, transactions: &[Transaction]) -> Result<usize> {
        if transactions.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;
        {
            let mut stmt = db_tx.prepare(INSERT_TRANSACTION)?;
            for tx in transactions {
                execute_insert(&mut stmt, tx)?;
            }
        }
        db_tx.commit()?;
        Ok(transactions.len())
    }

    fn commit_import(&self, transactions: &[Transaction], batch: &ImportBatch) -> Result<usize> {
        let mut conn = self.conn()?;
        let db_tx = conn.transaction()?;
        {
            let mut stmt = db_tx.prepare(INSERT_TRANSACTION)?;
            for tx in transactions {
                execute_insert(&mut stmt, tx)?;
            }
        }
        db_tx.execute(
            "INSERT INTO sys_import_batches (batch_id, owner_id, file_name, checksum, row_count,
                imported_count, start_date, end_date, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?::DATE, ?::DATE, ?::TIMESTAMP)",
            params![
                batch.batch_id,
                batch.owner_id,
                batch.file_name,
                batch.checksum,
                batch.row_count,
                batch.imported_count,
                batch.start_date.map(|d| d.to_string()),
                batch.end_date.map(|d| d.to_string()),
                format_timestamp(&batch.created_at),
            ],
        )?;
        db_tx.commit()?;
        Ok(transactions.len())
    }
}

fn execute_insert(stmt: &mut Statement<'_>, tx: &Transaction) -> duckdb::Result<usize> {
    stmt.execute(params![
        tx.id.to_string(),
        tx.owner_id,
        tx.date.to_string(),
        tx.description,
        tx.amount.to_string(),
        tx.direction.as_str(),
        tx.category,
        tx.subcategory,
        tx.payment_method.as_str(),
        tx.reference,
        tx.notes,
        tx.is_recurring,
        tx.recurring_frequency.map(|f| f.as_str()),
        tx.is_verified,
        tx.source_file,
        tx.fingerprint,
        tx.import_batch_id,
        format_timestamp(&tx.created_at),
        format_timestamp(&tx.updated_at),
    ])
}

/// WHERE clause and its string arguments for a listing filter
fn filter_clause(owner_id: &str, filter: &TransactionFilter) -> (String, Vec<String>) {
    let mut conditions = vec!["owner_id = ?".to_string()];
    let mut args = vec![owner_id.to_string()];

    if let Some(start) = filter.start_date {
        conditions.push("transaction_date >= ?::DATE".to_string());
        args.push(start.to_string());
    }
    if let Some(end) = filter.end_date {
        conditions.push("transaction_date <= ?::DATE".to_string());
        args.push(end.to_string());
    }
    if let Some(category) = &filter.category {
        conditions.push("category = ?".to_string());
        args.push(category.clone());
    }
    if let Some(direction) = filter.direction {
        conditions.push("direction = ?".to_string());
        args.push(direction.as_str().to_string());
    }

    (conditions.join(" AND "), args)
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn row_to_transaction(row: &duckdb::Row) -> duckdb::Result<Transaction> {
    // Column order follows TRANSACTION_COLUMNS
    let id: String = row.get(0)?;
    let date: String = row.get(2)?;
    let amount: String = row.get(4)?;
    let direction: String = row.get(5)?;
    let payment_method: String = row.get(8)?;
    let frequency: Option<String> = row.get(12)?;
    let created: String = row.get(17)?;
    let updated: String = row.get(18)?;

    Ok(Transaction {
        id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::new_v4()),
        owner_id: row.get(1)?,
        date: parse_date(&date).unwrap_or_else(|| Utc::now().date_naive()),
        description: row.get(3)?,
        amount: amount.parse().unwrap_or_default(),
        direction: direction.parse().unwrap_or(crate::domain::Direction::Expense),
        category: row.get::<_, Option<String>>(6)?.unwrap_or_else(|| UNCATEGORIZED.to_string()),
        subcategory: row.get(7)?,
        payment_method: payment_method.parse().unwrap_or_default(),
        reference: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        notes: row.get(10)?,
        is_recurring: row.get(11)?,
        recurring_frequency: frequency.and_then(|f| f.parse().ok()),
        is_verified: row.get(13)?,
        source_file: row.get(14)?,
        fingerprint: row.get(15)?,
        import_batch_id: row.get(16)?,
        created_at: parse_timestamp(&created),
        updated_at: parse_timestamp(&updated),
    })
}

fn row_to_category(row: &duckdb::Row) -> duckdb::Result<Category> {
    let id: String = row.get(0)?;
    let kind: String = row.get(2)?;
    let parent: Option<String> = row.get(7)?;
    let created: String = row.get(8)?;

    Ok(Category {
        id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::new_v4()),
        name: row.get(1)?,
        kind: kind.parse().unwrap_or_default(),
        is_default: row.get(3)?,
        is_active: row.get(4)?,
        color: row.get(5)?,
        icon: row.get(6)?,
        parent_id: parent.and_then(|p| Uuid::parse_str(&p).ok()),
        created_at: parse_timestamp(&created),
    })
}

fn row_to_cost(row: &duckdb::Row) -> duckdb::Result<Cost> {
    let id: String = row.get(0)?;
    let amount: String = row.get(4)?;
    let frequency: String = row.get(6)?;
    let start: Option<String> = row.get(7)?;
    let end: Option<String> = row.get(8)?;
    let tags: Option<String> = row.get(10)?;
    let employee: Option<String> = row.get(12)?;
    let created: String = row.get(13)?;
    let updated: String = row.get(14)?;

    Ok(Cost {
        id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::new_v4()),
        owner_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        amount: amount.parse().unwrap_or_default(),
        category: row.get(5)?,
        frequency: frequency
            .parse()
            .unwrap_or(crate::domain::CostFrequency::OneTime),
        start_date: start.as_deref().and_then(parse_date),
        end_date: end.as_deref().and_then(parse_date),
        is_active: row.get(9)?,
        tags: tags.as_deref().map(parse_duckdb_array).unwrap_or_default(),
        notes: row.get(11)?,
        related_employee_id: employee.and_then(|e| Uuid::parse_str(&e).ok()),
        created_at: parse_timestamp(&created),
        updated_at: parse_timestamp(&updated),
    })
}

fn row_to_employee(row: &duckdb::Row) -> duckdb::Result<Employee> {
    let id: String = row.get(0)?;
    let hire_date: String = row.get(7)?;
    let employment_type: String = row.get(8)?;
    let status: String = row.get(9)?;
    let monthly: String = row.get(10)?;
    let yearly: String = row.get(11)?;
    let created: String = row.get(12)?;
    let updated: String = row.get(13)?;

    Ok(Employee {
        id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::new_v4()),
        owner_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        position: row.get(5)?,
        department: row.get(6)?,
        hire_date: parse_date(&hire_date).unwrap_or_else(|| Utc::now().date_naive()),
        employment_type: employment_type
            .parse()
            .unwrap_or(crate::domain::EmploymentType::FullTime),
        status: status.parse().unwrap_or_default(),
        costs: Vec::new(),
        total_monthly_cost: monthly.parse().unwrap_or_default(),
        total_yearly_cost: yearly.parse().unwrap_or_default(),
        created_at: parse_timestamp(&created),
        updated_at: parse_timestamp(&updated),
    })
}

fn row_to_employee_cost(row: &duckdb::Row) -> duckdb::Result<EmployeeCost> {
    let id: String = row.get(0)?;
    let amount: String = row.get(2)?;
    let period: String = row.get(3)?;
    let category: String = row.get(4)?;

    Ok(EmployeeCost {
        id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::new_v4()),
        name: row.get(1)?,
        amount: amount.parse().unwrap_or_default(),
        period: period.parse().unwrap_or(crate::domain::CostPeriod::Monthly),
        category: category
            .parse()
            .unwrap_or(crate::domain::EmployeeCostCategory::Other),
        tax_deductible: row.get(5)?,
        notes: row.get(6)?,
    })
}

// Helper functions

/// UTC timestamp in the form DuckDB casts straight to TIMESTAMP
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Format tags as a DuckDB array literal: ['tag1', 'tag2']
fn format_tags_array(tags: &[String]) -> String {
    if tags.is_empty() {
        return "[]::VARCHAR[]".to_string();
    }
    let escaped: Vec<String> = tags
        .iter()
        .map(|t| format!("'{}'", t.replace('\'', "''")))
        .collect();
    format!("[{}]", escaped.join(", "))
}

/// Parse DuckDB's VARCHAR rendering of a list: [a, b] or ['a', 'b']
fn parse_duckdb_array(s: &str) -> Vec<String> {
    let inner = s.trim().trim_start_matches('[').trim_end_matches(']');
    inner
        .split(',')
        .map(|item| item.trim().trim_matches('\'').trim_matches('"').to_string())
        .filter(|item| !item.is_empty() && item != "NULL")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(is_retryable_error("IO Error: Could not set lock on file: Resource temporarily unavailable"));
        assert!(is_retryable_error("The process cannot access the file because it is being used by another process"));
        assert!(!is_retryable_error("Catalog Error: Table with name foo does not exist"));
    }

    #[test]
    fn test_tags_round_trip_helpers() {
        let tags = vec!["bureau".to_string(), "l'agence".to_string()];
        assert_eq!(format_tags_array(&tags), "['bureau', 'l''agence']");
        assert_eq!(parse_duckdb_array("[bureau, loyer]"), vec!["bureau", "loyer"]);
        assert!(parse_duckdb_array("[]").is_empty());
    }

    #[test]
    fn test_timestamp_format_parses_back() {
        let now = Utc::now();
        let parsed = parse_timestamp(&format_timestamp(&now));
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_filter_clause() {
        let filter = TransactionFilter {
            category: Some("logiciels".to_string()),
            direction: Some(crate::domain::Direction::Expense),
            ..Default::default()
        };
        let (clause, args) = filter_clause("owner-1", &filter);
        assert_eq!(clause, "owner_id = ? AND category = ? AND direction = ?");
        assert_eq!(args, vec!["owner-1", "logiciels", "expense"]);
    }
}
