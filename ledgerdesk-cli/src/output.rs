//! Output formatting utilities

use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use dialoguer::Confirm;
use ledgerdesk_core::domain::Direction;
use rust_decimal::Decimal;

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Signed, colored amount: green for income, red for expenses
pub fn format_amount(amount: Decimal, direction: Direction) -> String {
    match direction {
        Direction::Income => format!("+{:.2}", amount).green().to_string(),
        Direction::Expense => format!("-{:.2}", amount).red().to_string(),
    }
}

/// Ask before a destructive action; `force` skips the prompt
pub fn confirm(prompt: &str, force: bool) -> Result<bool> {
    if force {
        return Ok(true);
    }
    let confirmed = Confirm::new().with_prompt(prompt).default(false).interact()?;
    if !confirmed {
        println!("{}", "Cancelled".dimmed());
    }
    Ok(confirmed)
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
