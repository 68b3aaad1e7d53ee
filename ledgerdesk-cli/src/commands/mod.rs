//! CLI command implementations

pub mod categories;
pub mod categorize;
pub mod costs;
pub mod employees;
pub mod import;
pub mod logs;
pub mod transactions;

use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use ledgerdesk_core::{EntryPoint, LedgerContext, LogEvent, LoggingService};
use uuid::Uuid;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let data_dir = get_ledgerdesk_dir().ok()?;
    std::fs::create_dir_all(&data_dir).ok()?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Data directory: `LEDGERDESK_DIR`, else `~/.ledgerdesk`
pub fn get_ledgerdesk_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("LEDGERDESK_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".ledgerdesk"))
        .context("Could not find home directory; set LEDGERDESK_DIR")
}

/// Open the ledger, creating the data directory on first use.
/// Import events go to the log database when it can be opened.
pub fn get_context() -> Result<LedgerContext> {
    let data_dir = get_ledgerdesk_dir()?;

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

    let context = match get_logger() {
        Some(logger) => LedgerContext::with_logger(&data_dir, Arc::new(logger)),
        None => LedgerContext::new(&data_dir),
    };
    context.context("Failed to initialize ledger")
}

/// Transaction ids from `--ids`, or from stdin when piped.
///
/// Piped input is split on newlines when it has any, otherwise on commas.
pub fn collect_ids(ids: Vec<String>) -> Result<Vec<Uuid>> {
    let raw: Vec<String> = if ids.is_empty() && atty::isnt(atty::Stream::Stdin) {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        let trimmed = buffer.trim();
        let parts: Vec<&str> = if trimmed.contains('\n') {
            trimmed.lines().collect()
        } else {
            trimmed.split(',').collect()
        };
        parts
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        ids
    };

    if raw.is_empty() {
        anyhow::bail!("No transaction IDs provided. Use --ids or pipe IDs from stdin.");
    }

    raw.iter()
        .map(|s| Uuid::parse_str(s).with_context(|| format!("Invalid transaction ID: {}", s)))
        .collect()
}
