//! Import command - import transactions from a CSV or spreadsheet file

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use super::get_context;
use crate::output::{create_table, format_amount, print_json, success, warning};

pub fn run(owner: &str, file: &Path, preview: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let result = ctx.import_service.import(owner, file, preview)?;

    if json {
        return print_json(&result);
    }

    println!("{}", "Detected columns:".cyan());
    let mapping = &result.mapping;
    for (label, header) in [
        ("Date", &mapping.date),
        ("Description", &mapping.description),
        ("Amount", &mapping.amount),
        ("Type", &mapping.kind),
        ("Category", &mapping.category),
        ("Payment method", &mapping.payment_method),
        ("Reference", &mapping.reference),
    ] {
        if let Some(header) = header {
            println!("  {}: {}", label, header);
        }
    }
    println!();

    if preview {
        warning("PREVIEW MODE - No changes applied");
        println!();

        if !result.transactions.is_empty() {
            let mut table = create_table();
            table.set_header(vec!["Date", "Amount", "Description", "Category", "Payment"]);
            for tx in result.transactions.iter().take(10) {
                table.add_row(vec![
                    tx.date.to_string(),
                    format_amount(tx.amount, tx.direction),
                    tx.description.clone(),
                    tx.category.clone(),
                    tx.payment_method.to_string(),
                ]);
            }
            println!("{}", table);

            if result.transactions.len() > 10 {
                println!("... and {} more", result.transactions.len() - 10);
            }
        }
    } else {
        success(&format!("Imported {}", result.file_name));
    }

    println!();
    println!("  Rows read:  {}", result.rows_read);
    println!("  Imported:   {}", result.imported);
    println!("  Duplicates: {}", result.duplicates);
    println!("  Rejected:   {}", result.rejected);
    if !preview {
        println!("  Batch:      {}", result.batch_id.dimmed());
    }

    Ok(())
}
