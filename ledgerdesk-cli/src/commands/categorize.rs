//! Categorize command - apply suggested categories to transactions

use anyhow::Result;
use colored::Colorize;

use super::{collect_ids, get_context};
use crate::output::{create_table, print_json, success, warning};

pub fn run(owner: &str, ids: Vec<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let ids = collect_ids(ids)?;

    if ctx.config.categorization.rules.is_empty() && !json {
        warning("No categorization rules configured in settings.json; nothing will be suggested.");
    }

    let result = ctx.categorize_service.categorize(owner, &ids)?;

    if json {
        return print_json(&result);
    }

    if result.entries.is_empty() {
        println!("No matching transactions found.");
        return Ok(());
    }

    let mut table = create_table();
    table.set_header(vec!["Description", "Before", "Suggested", "Confidence", ""]);
    for entry in &result.entries {
        table.add_row(vec![
            entry.description.clone(),
            entry.previous_category.clone(),
            entry.suggested_category.clone(),
            format!("{:.2}", entry.confidence),
            if entry.applied { "✓".green().to_string() } else { String::new() },
        ]);
    }
    println!("{}", table);
    success(&format!(
        "Updated {} of {} transaction(s) using '{}'",
        result.applied,
        result.entries.len(),
        result.suggester
    ));

    Ok(())
}
