//! Costs command - recurring business costs

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use colored::Colorize;
use ledgerdesk_core::domain::{Cost, CostFrequency, CostUpdate};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::get_context;
use crate::output::{confirm, create_table, print_json, success};

#[derive(Subcommand)]
pub enum CostsCommands {
    /// List costs with their yearly totals
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a cost
    Add {
        name: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        category: String,
        /// one-time, daily, weekly, monthly or yearly
        #[arg(long, default_value = "monthly")]
        frequency: CostFrequency,
        /// Required unless one-time (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of an existing cost
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        amount: Option<Decimal>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        frequency: Option<CostFrequency>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Mark the cost active or inactive
        #[arg(long)]
        active: Option<bool>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a cost
    Remove {
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(owner: &str, command: CostsCommands) -> Result<()> {
    let ctx = get_context()?;
    let service = &ctx.cost_service;

    match command {
        CostsCommands::List { json } => {
            let costs = service.list_costs(owner)?;
            let estimate = service.estimate(owner)?;
            if json {
                return print_json(&serde_json::json!({ "costs": costs, "estimate": estimate }));
            }
            if costs.is_empty() {
                println!("No costs recorded.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["ID", "Name", "Category", "Amount", "Frequency", "Per year"]);
            for cost in &costs {
                let name = if cost.is_active {
                    cost.name.clone()
                } else {
                    format!("{} (inactive)", cost.name).dimmed().to_string()
                };
                table.add_row(vec![
                    cost.id.to_string(),
                    name,
                    cost.category.clone(),
                    format!("{:.2}", cost.amount),
                    cost.frequency.to_string(),
                    format!("{:.2}", cost.annual_total()),
                ]);
            }
            println!("{}", table);
            println!(
                "Estimated spend: {} / month, {} / year",
                format!("{:.2}", estimate.monthly).bold(),
                format!("{:.2}", estimate.yearly).bold()
            );
        }
        CostsCommands::Add {
            name,
            amount,
            category,
            frequency,
            start,
            end,
            description,
            tags,
            json,
        } => {
            let mut cost = Cost::new(owner, &name, amount, &category, frequency);
            cost.start_date = start;
            cost.end_date = end;
            cost.description = description;
            cost.tags = tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();

            let cost = service.add_cost(cost)?;
            if json {
                return print_json(&cost);
            }
            success(&format!("Cost '{}' added ({} per year)", cost.name, cost.annual_total()));
        }
        CostsCommands::Update {
            id,
            name,
            amount,
            category,
            frequency,
            start,
            end,
            description,
            notes,
            active,
            json,
        } => {
            let update = CostUpdate {
                name,
                description,
                amount,
                category,
                frequency,
                start_date: start,
                end_date: end,
                is_active: active,
                notes,
            };
            let cost = service.update_cost(owner, id, &update)?;
            if json {
                return print_json(&cost);
            }
            success(&format!("Cost '{}' updated ({} per year)", cost.name, cost.annual_total()));
        }
        CostsCommands::Remove { id, force } => {
            if !confirm(&format!("Remove cost {}?", id), force)? {
                return Ok(());
            }
            service.remove_cost(owner, id)?;
            success("Cost removed");
        }
    }

    Ok(())
}
