//! Logs command - inspect and prune the event log

use anyhow::Result;
use chrono::{Duration, TimeZone, Utc};
use clap::Subcommand;
use colored::Colorize;
use ledgerdesk_core::{EntryPoint, LogEntry, LoggingService};

use super::get_ledgerdesk_dir;
use crate::output::{confirm, create_table, print_json, success};

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only errors
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete old log entries
    Clear {
        /// Delete entries older than N days
        #[arg(long, default_value = "30")]
        older_than_days: u32,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show entry counts and where the log lives
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn open_log() -> Result<LoggingService> {
    let data_dir = get_ledgerdesk_dir()?;
    std::fs::create_dir_all(&data_dir)?;
    LoggingService::new(&data_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
}

fn format_millis(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Command, file format and row count, whichever are set
fn context_column(entry: &LogEntry) -> String {
    let mut parts: Vec<String> = Vec::new();
    parts.extend(entry.command.clone());
    parts.extend(entry.file_format.clone());
    if let Some(count) = entry.record_count {
        parts.push(format!("{} rows", count));
    }
    parts.join(", ")
}

pub fn run(command: LogsCommands) -> Result<()> {
    let log = open_log()?;

    match command {
        LogsCommands::List { limit, errors, json } => {
            let entries = if errors { log.get_errors(limit)? } else { log.get_recent(limit)? };
            if json {
                return print_json(&entries);
            }
            if entries.is_empty() {
                println!("No log entries found.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["Time", "Entry", "Event", "Context", "Error"]);
            for entry in &entries {
                table.add_row(vec![
                    format_millis(entry.timestamp),
                    entry.entry_point.clone(),
                    entry.event.clone(),
                    context_column(entry),
                    entry.error_message.as_deref().unwrap_or_default().red().to_string(),
                ]);
            }
            println!("{}", table);
        }
        LogsCommands::Clear { older_than_days, force, json } => {
            let cutoff = Utc::now() - Duration::days(i64::from(older_than_days));
            let prompt = format!("Delete log entries older than {} days?", older_than_days);
            if !confirm(&prompt, force || json)? {
                return Ok(());
            }

            let deleted = log.delete_before(cutoff.timestamp_millis())?;
            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                success(&format!("Deleted {} log entries", deleted));
            }
        }
        LogsCommands::Stats { json } => {
            let stats = log.stats()?;
            if json {
                return print_json(&stats);
            }

            println!("{}", "Event log".bold());
            println!("  Entries:  {}", stats.total_entries);
            println!("  Errors:   {}", stats.error_count);
            if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
                println!("  Span:     {} to {}", format_millis(oldest), format_millis(newest));
            }
            println!("  Database: {}", stats.database_path.display());
            println!("  Size:     {} bytes", stats.database_size_bytes);
        }
    }

    Ok(())
}
