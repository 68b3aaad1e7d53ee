//! LedgerDesk CLI - small-business bookkeeping in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ledgerdesk_core::{Error, LogEvent};

mod commands;
mod output;

use commands::{
    categories, categorize, costs, employees, get_logger, import, log_event, logs, transactions,
};

/// LedgerDesk - import bank statements and keep the books
#[derive(Parser)]
#[command(name = "ldesk", version, about, long_about = None)]
struct Cli {
    /// Owner whose records are read and written
    #[arg(long, global = true, env = "LEDGERDESK_OWNER", default_value = "default")]
    owner: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import transactions from a CSV or spreadsheet file
    Import {
        /// Path to a .csv, .xlsx, .xls or .ods file
        file: PathBuf,
        /// Show what would be imported without saving
        #[arg(long)]
        preview: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Browse and manage transactions
    Transactions {
        #[command(subcommand)]
        command: transactions::TransactionsCommands,
    },

    /// Manage categories
    Categories {
        #[command(subcommand)]
        command: categories::CategoriesCommands,
    },

    /// Suggest and apply categories for transactions
    Categorize {
        /// Transaction IDs (reads stdin when omitted)
        #[arg(long, value_delimiter = ',')]
        ids: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage recurring business costs
    Costs {
        #[command(subcommand)]
        command: costs::CostsCommands,
    },

    /// Manage employees and their costs
    Employees {
        #[command(subcommand)]
        command: employees::EmployeesCommands,
    },

    /// View and manage application logs
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Import { .. } => "import",
            Commands::Transactions { .. } => "transactions",
            Commands::Categories { .. } => "categories",
            Commands::Categorize { .. } => "categorize",
            Commands::Costs { .. } => "costs",
            Commands::Employees { .. } => "employees",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let logger = get_logger();
    let name = cli.command.name();

    let result = run(cli);

    match result {
        Ok(()) => {
            log_event(&logger, LogEvent::new("command_run").with_command(name));
            ExitCode::SUCCESS
        }
        Err(e) => {
            log_event(
                &logger,
                LogEvent::new("command_failed")
                    .with_command(name)
                    .with_error(e.to_string())
                    .with_error_details(format!("{:?}", e)),
            );
            eprintln!("{:#}", e);
            // 2 for bad input (missing record, rejected upload), 1 for everything else
            match e.downcast_ref::<Error>() {
                Some(err) if err.is_client_error() => ExitCode::from(2),
                _ => ExitCode::FAILURE,
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let owner = cli.owner;
    match cli.command {
        Commands::Import { file, preview, json } => import::run(&owner, &file, preview, json),
        Commands::Transactions { command } => transactions::run(&owner, command),
        Commands::Categories { command } => categories::run(command),
        Commands::Categorize { ids, json } => categorize::run(&owner, ids, json),
        Commands::Costs { command } => costs::run(&owner, command),
        Commands::Employees { command } => employees::run(&owner, command),
        Commands::Logs { command } => logs::run(command),
    }
}
