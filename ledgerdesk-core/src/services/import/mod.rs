//! Import service - spreadsheet ingestion
//!
//! An upload goes through these steps:
//! 1. Refuse unsupported extensions and oversized files
//! 2. Read the first sheet into raw rows
//! 3. Detect which header feeds each transaction field
//! 4. Normalize each row, dropping rows without a date or with a zero amount
//! 5. Drop rows the owner already has (same date, amount and description)
//! 6. Insert the rest together with the import batch record, all or nothing

mod columns;
mod fingerprint;
mod normalize;
mod payment;

pub use columns::{detect_columns, detect_columns_with, ColumnMapping, ColumnRule, Field, COLUMN_RULES};
pub use fingerprint::fingerprint;
pub use normalize::{
    classify_direction, excel_serial_to_date, normalize_row, parse_amount, parse_date,
    NormalizeOptions, NormalizedRow, UNKNOWN_SOURCE,
};
pub use payment::map_payment_method;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::ImportSettings;
use crate::domain::result::Error;
use crate::domain::{RawTable, Transaction};
use crate::ports::{ImportBatch, TableReader, TransactionStore};
use crate::services::logging::{LogEvent, LoggingService};

/// Outcome of one upload
#[derive(Debug, Clone, Serialize)]
pub struct ImportResult {
    pub batch_id: String,
    pub file_name: String,
    /// Data rows read from the file
    pub rows_read: usize,
    /// Rows that normalized into a valid transaction
    pub discovered: usize,
    /// Rows dropped for a missing date or zero amount
    pub rejected: usize,
    /// Valid rows the owner already had
    pub duplicates: usize,
    pub imported: usize,
    /// True when nothing was written
    pub preview: bool,
    pub mapping: ColumnMapping,
    /// Records written (or that would be written, in preview)
    pub transactions: Vec<Transaction>,
}

pub struct ImportService {
    store: Arc<dyn TransactionStore>,
    reader: Arc<dyn TableReader>,
    settings: ImportSettings,
    logger: Option<Arc<LoggingService>>,
}

impl ImportService {
    pub fn new(
        store: Arc<dyn TransactionStore>,
        reader: Arc<dyn TableReader>,
        settings: ImportSettings,
    ) -> Self {
        Self {
            store,
            reader,
            settings,
            logger: None,
        }
    }

    /// Emit `import_completed` / `import_failed` events to this logger
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Import a spreadsheet for `owner_id`.
    ///
    /// With `preview_only` the pipeline runs in full, duplicate check
    /// included, but nothing is written.
    pub fn import(&self, owner_id: &str, file_path: &Path, preview_only: bool) -> Result<ImportResult> {
        let file_format = file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        let result = self.run_import(owner_id, file_path, preview_only);

        if let Some(logger) = &self.logger {
            let event = match &result {
                Ok(r) => LogEvent::new("import_completed")
                    .with_file_format(&file_format)
                    .with_count(r.imported as i64),
                Err(e) => LogEvent::new("import_failed")
                    .with_file_format(&file_format)
                    .with_error(e.to_string()),
            };
            // Logging must never fail an import
            let _ = logger.log(event);
        }

        result
    }

    fn run_import(&self, owner_id: &str, file_path: &Path, preview_only: bool) -> Result<ImportResult> {
        if !self.reader.supports(file_path) {
            let ext = file_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_string();
            return Err(Error::UnsupportedFormat(ext).into());
        }

        let metadata = std::fs::metadata(file_path)
            .map_err(|e| Error::read(format!("{}: {}", file_path.display(), e)))?;
        if metadata.len() > self.settings.max_file_size_bytes() {
            return Err(Error::validation(format!(
                "File is {} bytes, above the {} MB limit",
                metadata.len(),
                self.settings.max_file_size_mb
            ))
            .into());
        }

        let table = self.reader.read_table(file_path)?;

        let file_name = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_SOURCE)
            .to_string();

        let options = NormalizeOptions {
            day_first: self.settings.day_first,
            default_category: self.settings.default_category.clone(),
            source_file: file_name.clone(),
        };
        let (mapping, rows) = normalize_table(&table, &options);

        let rows_read = table.rows.len();
        let discovered = rows.len();
        let batch_id = new_batch_id();

        let candidates: Vec<Transaction> = rows
            .into_iter()
            .map(|row| row.into_transaction(owner_id, &batch_id))
            .collect();
        let (fresh, duplicates) = filter_duplicates(self.store.as_ref(), owner_id, candidates)
            .context("Duplicate check failed")?;

        let imported = if preview_only {
            0
        } else {
            let batch = ImportBatch {
                batch_id: batch_id.clone(),
                owner_id: owner_id.to_string(),
                file_name: file_name.clone(),
                checksum: file_checksum(file_path)?,
                row_count: rows_read as i64,
                imported_count: fresh.len() as i64,
                start_date: fresh.iter().map(|t| t.date).min(),
                end_date: fresh.iter().map(|t| t.date).max(),
                created_at: Utc::now(),
            };
            self.store
                .commit_import(&fresh, &batch)
                .context("Failed to save imported transactions")?
        };

        Ok(ImportResult {
            batch_id,
            file_name,
            rows_read,
            discovered,
            rejected: rows_read - discovered,
            duplicates,
            imported,
            preview: preview_only,
            mapping,
            transactions: fresh,
        })
    }
}

/// Detect columns from the header row and normalize every data row.
///
/// Rows that fail normalization are left out; the caller derives the
/// rejected count from the lengths.
pub fn normalize_table(table: &RawTable, options: &NormalizeOptions) -> (ColumnMapping, Vec<NormalizedRow>) {
    let mapping = detect_columns(&table.headers);
    let rows = table
        .rows
        .iter()
        .filter_map(|row| normalize_row(row, &mapping, options))
        .collect();
    (mapping, rows)
}

/// Split candidates into the ones the owner does not have yet, plus the
/// number of duplicates dropped. Candidates are not compared with each other.
pub fn filter_duplicates(
    store: &dyn TransactionStore,
    owner_id: &str,
    candidates: Vec<Transaction>,
) -> crate::domain::result::Result<(Vec<Transaction>, usize)> {
    if candidates.is_empty() {
        return Ok((candidates, 0));
    }
    let keys: Vec<_> = candidates.iter().map(Transaction::duplicate_key).collect();
    let existing = store.find_existing_keys(owner_id, &keys)?;

    let total = candidates.len();
    let fresh: Vec<Transaction> = candidates
        .into_iter()
        .filter(|tx| !existing.contains(&tx.duplicate_key()))
        .collect();
    let duplicates = total - fresh.len();
    Ok((fresh, duplicates))
}

fn new_batch_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("import_{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), &suffix[..8])
}

fn file_checksum(path: &Path) -> crate::domain::result::Result<String> {
    let bytes = std::fs::read(path)
        .map_err(|e| Error::read(format!("{}: {}", path.display(), e)))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use crate::domain::result::Result as CoreResult;
    use crate::domain::{CellValue, Direction, DuplicateKey, PaymentMethod};

    #[derive(Default)]
    struct MemoryStore {
        rows: Mutex<Vec<Transaction>>,
        batches: Mutex<Vec<ImportBatch>>,
        fail_batch_write: bool,
    }

    impl TransactionStore for MemoryStore {
        fn exists_by_owner_date_amount_description(
            &self,
            owner_id: &str,
            date: NaiveDate,
            amount: Decimal,
            description: &str,
        ) -> CoreResult<bool> {
            let key = DuplicateKey::new(date, amount, description);
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .any(|t| t.owner_id == owner_id && t.duplicate_key() == key))
        }

        fn find_existing_keys(
            &self,
            owner_id: &str,
            keys: &[DuplicateKey],
        ) -> CoreResult<HashSet<DuplicateKey>> {
            let rows = self.rows.lock().unwrap();
            Ok(keys
                .iter()
                .filter(|k| rows.iter().any(|t| t.owner_id == owner_id && t.duplicate_key() == **k))
                .cloned()
                .collect())
        }

        fn bulk_insert(&self, transactions: &[Transaction]) -> CoreResult<usize> {
            self.rows.lock().unwrap().extend_from_slice(transactions);
            Ok(transactions.len())
        }

        fn commit_import(&self, transactions: &[Transaction], batch: &ImportBatch) -> CoreResult<usize> {
            if self.fail_batch_write {
                return Err(Error::database("disk full"));
            }
            self.batches.lock().unwrap().push(batch.clone());
            self.bulk_insert(transactions)
        }
    }

    /// Returns a fixed table whatever the file holds
    struct FixedReader(RawTable);

    impl TableReader for FixedReader {
        fn supported_extensions(&self) -> &[&str] {
            &["csv", "xlsx"]
        }

        fn read_table(&self, _path: &Path) -> CoreResult<RawTable> {
            Ok(self.0.clone())
        }
    }

    struct FailingReader;

    impl TableReader for FailingReader {
        fn supported_extensions(&self) -> &[&str] {
            &["xlsx"]
        }

        fn read_table(&self, _path: &Path) -> CoreResult<RawTable> {
            Err(Error::read("zip archive is truncated"))
        }
    }

    fn bank_statement() -> RawTable {
        let mut table = RawTable::new(vec![
            "Date Comptable".to_string(),
            "Montant".to_string(),
            "Description".to_string(),
            "Mode de paiement".to_string(),
        ]);
        table.push_row(vec!["05/01/2024".into(), "-45.00".into(), "EDF Facture".into()]);
        table.push_row(vec![
            "06/01/2024".into(),
            "120".into(),
            "Client Dupont".into(),
            "Virement bancaire".into(),
        ]);
        // No date: dropped
        table.push_row(vec![CellValue::Empty, "10".into(), "Sans date".into()]);
        // Zero amount: dropped
        table.push_row(vec!["07/01/2024".into(), "0".into(), "Rien".into()]);
        table
    }

    fn service(store: Arc<MemoryStore>, reader: Arc<dyn TableReader>) -> ImportService {
        ImportService::new(store, reader, ImportSettings::default())
    }

    fn upload(dir: &TempDir, name: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, "placeholder").unwrap();
        path
    }

    #[test]
    fn test_import_normalizes_and_rejects() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::default());
        let svc = service(store.clone(), Arc::new(FixedReader(bank_statement())));

        let result = svc.import("user-1", &upload(&dir, "releve.csv"), false).unwrap();

        assert_eq!(result.rows_read, 4);
        assert_eq!(result.discovered, 2);
        assert_eq!(result.rejected, 2);
        assert_eq!(result.imported, 2);
        assert_eq!(result.mapping.date.as_deref(), Some("Date Comptable"));

        let edf = &result.transactions[0];
        assert_eq!(edf.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(edf.amount, Decimal::new(4500, 2));
        assert_eq!(edf.direction, Direction::Expense);
        assert_eq!(edf.category, "Uncategorized");
        assert_eq!(edf.payment_method, PaymentMethod::Other);
        assert_eq!(edf.source_file.as_deref(), Some("releve.csv"));
        assert_eq!(edf.owner_id, "user-1");

        let client = &result.transactions[1];
        assert_eq!(client.direction, Direction::Income);
        assert_eq!(client.payment_method, PaymentMethod::Transfer);

        let batches = store.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].row_count, 4);
        assert_eq!(batches[0].imported_count, 2);
        assert_eq!(batches[0].checksum.len(), 64);
        assert_eq!(batches[0].start_date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(batches[0].end_date, NaiveDate::from_ymd_opt(2024, 1, 6));
    }

    #[test]
    fn test_second_upload_imports_nothing() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::default());
        let svc = service(store.clone(), Arc::new(FixedReader(bank_statement())));
        let path = upload(&dir, "releve.csv");

        svc.import("user-1", &path, false).unwrap();
        let second = svc.import("user-1", &path, false).unwrap();

        assert_eq!(second.imported, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(store.rows.lock().unwrap().len(), 2);

        // Another owner is not affected by the first owner's records
        let other = svc.import("user-2", &path, false).unwrap();
        assert_eq!(other.imported, 2);
    }

    #[test]
    fn test_preview_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::default());
        let svc = service(store.clone(), Arc::new(FixedReader(bank_statement())));

        let result = svc.import("user-1", &upload(&dir, "releve.csv"), true).unwrap();

        assert!(result.preview);
        assert_eq!(result.imported, 0);
        assert_eq!(result.transactions.len(), 2);
        assert!(store.rows.lock().unwrap().is_empty());
        assert!(store.batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_commit_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore {
            fail_batch_write: true,
            ..Default::default()
        });
        let svc = service(store.clone(), Arc::new(FixedReader(bank_statement())));

        let err = svc.import("user-1", &upload(&dir, "releve.csv"), false).unwrap_err();

        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Database(_))));
        assert!(store.rows.lock().unwrap().is_empty());
        assert!(store.batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_empty_table_imports_nothing() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::default());
        let svc = service(store, Arc::new(FixedReader(RawTable::default())));

        let result = svc.import("user-1", &upload(&dir, "vide.csv"), false).unwrap();
        assert_eq!(result.imported, 0);
        assert!(result.mapping.is_empty());
    }

    #[test]
    fn test_unsupported_extension_refused() {
        let dir = TempDir::new().unwrap();
        let svc = service(Arc::new(MemoryStore::default()), Arc::new(FixedReader(bank_statement())));

        let err = svc.import("user-1", &upload(&dir, "releve.pdf"), false).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::UnsupportedFormat(_))));
    }

    #[test]
    fn test_oversized_file_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gros.csv");
        std::fs::write(&path, vec![b'x'; 2 * 1024 * 1024]).unwrap();

        let settings = ImportSettings {
            max_file_size_mb: 1,
            ..Default::default()
        };
        let svc = ImportService::new(
            Arc::new(MemoryStore::default()),
            Arc::new(FixedReader(bank_statement())),
            settings,
        );

        let err = svc.import("user-1", &path, false).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Validation(_))));
    }

    #[test]
    fn test_read_failure_aborts_upload() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::default());
        let svc = service(store.clone(), Arc::new(FailingReader));

        let err = svc.import("user-1", &upload(&dir, "casse.xlsx"), false).unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Read(_))));
        assert!(store.batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_filter_duplicates_keeps_in_file_repeats() {
        let store = MemoryStore::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let mut a = Transaction::new(Uuid::new_v4(), "u", date, Decimal::new(100, 0), Direction::Expense);
        a.description = "Café".to_string();
        let b = Transaction {
            id: Uuid::new_v4(),
            ..a.clone()
        };

        let (fresh, duplicates) = filter_duplicates(&store, "u", vec![a, b]).unwrap();
        assert_eq!(fresh.len(), 2);
        assert_eq!(duplicates, 0);
    }

    #[test]
    fn test_batch_ids_are_unique() {
        let a = new_batch_id();
        let b = new_batch_id();
        assert!(a.starts_with("import_"));
        assert_ne!(a, b);
    }
}
