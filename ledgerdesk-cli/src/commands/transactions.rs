//! Transactions command - list, inspect, delete and export records

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Subcommand;
use colored::Colorize;
use ledgerdesk_core::domain::{Direction, TransactionFilter};
use uuid::Uuid;

use super::{collect_ids, get_context};
use crate::output::{confirm, create_table, format_amount, print_json, success};

#[derive(Subcommand)]
pub enum TransactionsCommands {
    /// List transactions, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: u32,
        /// Rows per page
        #[arg(long, default_value = "10")]
        limit: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one transaction
    Show {
        id: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete one transaction
    Delete {
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
    /// Delete several transactions (ids from --ids or stdin)
    BulkDelete {
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export transactions as CSV
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
pub struct FilterArgs {
    /// Earliest date (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Latest date (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
    #[arg(long)]
    category: Option<String>,
    /// income or expense
    #[arg(long = "type")]
    direction: Option<Direction>,
}

impl FilterArgs {
    fn into_filter(self, page: u32, limit: u32) -> TransactionFilter {
        TransactionFilter {
            start_date: self.from,
            end_date: self.to,
            category: self.category,
            direction: self.direction,
            page,
            limit,
        }
    }
}

pub fn run(owner: &str, command: TransactionsCommands) -> Result<()> {
    let ctx = get_context()?;
    let service = &ctx.transaction_service;

    match command {
        TransactionsCommands::List { filter, page, limit, json } => {
            let result = service.list(owner, &filter.into_filter(page, limit))?;

            if json {
                return print_json(&result);
            }
            if result.items.is_empty() {
                println!("No transactions found.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["ID", "Date", "Description", "Amount", "Category", "Payment"]);
            for tx in &result.items {
                table.add_row(vec![
                    tx.id.to_string(),
                    tx.date.to_string(),
                    tx.description.clone(),
                    format_amount(tx.amount, tx.direction),
                    tx.category.clone(),
                    tx.payment_method.to_string(),
                ]);
            }
            println!("{}", table);
            println!(
                "{}",
                format!("Page {} of {} ({} transactions)", result.page, result.pages, result.total).dimmed()
            );
        }
        TransactionsCommands::Show { id, json } => {
            let tx = service.get(owner, id)?;
            if json {
                return print_json(&tx);
            }

            println!("{}", tx.description.bold());
            println!("  ID:        {}", tx.id);
            println!("  Date:      {}", tx.date);
            println!("  Amount:    {}", format_amount(tx.amount, tx.direction));
            println!("  Category:  {}", tx.category);
            println!("  Payment:   {}", tx.payment_method);
            if !tx.reference.is_empty() {
                println!("  Reference: {}", tx.reference);
            }
            if let Some(notes) = &tx.notes {
                println!("  Notes:     {}", notes);
            }
            if let Some(source) = &tx.source_file {
                println!("  Source:    {}", source.dimmed());
            }
        }
        TransactionsCommands::Delete { id, force } => {
            let tx = service.get(owner, id)?;
            let prompt = format!("Delete '{}' ({}, {})?", tx.description, tx.date, tx.amount);
            if !confirm(&prompt, force)? {
                return Ok(());
            }
            service.delete(owner, id)?;
            success("Transaction deleted");
        }
        TransactionsCommands::BulkDelete { ids, force, json } => {
            let ids = collect_ids(ids)?;
            // Piped ids leave no terminal to prompt on
            let force = force || json || atty::isnt(atty::Stream::Stdin);
            if !confirm(&format!("Delete {} transaction(s)?", ids.len()), force)? {
                return Ok(());
            }
            let deleted = service.bulk_delete(owner, &ids)?;
            if json {
                println!("{}", serde_json::json!({ "deleted": deleted }));
            } else {
                success(&format!("Deleted {} transaction(s)", deleted));
            }
        }
        TransactionsCommands::Export { filter, output } => {
            let filter = filter.into_filter(1, 0);
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    let written = service.export_csv(owner, &filter, BufWriter::new(file))?;
                    success(&format!("Exported {} transaction(s) to {}", written, path.display()));
                }
                None => {
                    service.export_csv(owner, &filter, std::io::stdout().lock())?;
                }
            }
        }
    }

    Ok(())
}
