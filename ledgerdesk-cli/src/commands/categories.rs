//! Categories command

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use ledgerdesk_core::domain::CategoryKind;

use super::get_context;
use crate::output::{create_table, print_json, success};

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// List active categories
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a category
    Add {
        name: String,
        /// income, expense or both
        #[arg(long = "type", default_value = "both")]
        kind: CategoryKind,
        /// Display color, e.g. #ff9800
        #[arg(long)]
        color: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: CategoriesCommands) -> Result<()> {
    let ctx = get_context()?;

    match command {
        CategoriesCommands::List { json } => {
            let categories = ctx.category_service.list()?;
            if json {
                return print_json(&categories);
            }

            let mut table = create_table();
            table.set_header(vec!["Name", "Type", "Color", ""]);
            for category in &categories {
                table.add_row(vec![
                    category.name.clone(),
                    category.kind.to_string(),
                    category.color.clone(),
                    if category.is_default { "default".dimmed().to_string() } else { String::new() },
                ]);
            }
            println!("{}", table);
        }
        CategoriesCommands::Add { name, kind, color, json } => {
            let category = ctx.category_service.create(&name, kind, color.as_deref())?;
            if json {
                return print_json(&category);
            }
            success(&format!("Category '{}' added", category.name));
        }
    }

    Ok(())
}
