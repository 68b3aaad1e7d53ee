//! Employees command - staff and their cost sheets

use anyhow::Result;
use chrono::NaiveDate;
use clap::Subcommand;
use colored::Colorize;
use ledgerdesk_core::domain::{
    CostPeriod, Employee, EmployeeCost, EmployeeCostCategory, EmployeeCostUpdate, EmployeeStatus,
    EmployeeUpdate, EmploymentType,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::get_context;
use crate::output::{confirm, create_table, print_json, success};

#[derive(Subcommand)]
pub enum EmployeesCommands {
    /// List employees with their cost totals
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an employee
    Add {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        position: String,
        #[arg(long)]
        department: String,
        /// YYYY-MM-DD
        #[arg(long)]
        hire_date: NaiveDate,
        /// full-time, part-time, contract, freelance or intern
        #[arg(long, default_value = "full-time")]
        employment_type: EmploymentType,
        /// Monthly salary, recorded as a salary cost line
        #[arg(long)]
        salary: Option<Decimal>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an employee's details
    Update {
        id: Uuid,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        position: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        hire_date: Option<NaiveDate>,
        #[arg(long)]
        employment_type: Option<EmploymentType>,
        /// active, on-leave or terminated
        #[arg(long)]
        status: Option<EmployeeStatus>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a cost line to an employee
    AddCost {
        employee_id: Uuid,
        name: String,
        #[arg(long)]
        amount: Decimal,
        /// monthly or yearly
        #[arg(long, default_value = "monthly")]
        period: CostPeriod,
        /// salary, benefits, transport, equipment, training or other
        #[arg(long, default_value = "other")]
        category: EmployeeCostCategory,
        #[arg(long)]
        tax_deductible: bool,
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change one of an employee's cost lines
    UpdateCost {
        employee_id: Uuid,
        cost_id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        amount: Option<Decimal>,
        #[arg(long)]
        period: Option<CostPeriod>,
        #[arg(long)]
        category: Option<EmployeeCostCategory>,
        #[arg(long)]
        tax_deductible: Option<bool>,
        #[arg(long)]
        notes: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove one of an employee's cost lines
    RemoveCost {
        employee_id: Uuid,
        cost_id: Uuid,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an employee and their cost lines
    Remove {
        id: Uuid,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(owner: &str, command: EmployeesCommands) -> Result<()> {
    let ctx = get_context()?;
    let service = &ctx.cost_service;

    match command {
        EmployeesCommands::List { json } => {
            let employees = service.list_employees(owner)?;
            if json {
                return print_json(&employees);
            }
            if employees.is_empty() {
                println!("No employees recorded.");
                return Ok(());
            }

            let mut table = create_table();
            table.set_header(vec!["ID", "Name", "Position", "Status", "Monthly", "Yearly"]);
            for employee in &employees {
                table.add_row(vec![
                    employee.id.to_string(),
                    employee.full_name(),
                    format!("{} ({})", employee.position, employee.department),
                    employee.status.as_str().to_string(),
                    format!("{:.2}", employee.total_monthly_cost),
                    format!("{:.2}", employee.total_yearly_cost),
                ]);
            }
            println!("{}", table);

            let yearly: Decimal = employees.iter().map(|e| e.total_yearly_cost).sum();
            println!("Total staff cost: {} / year", format!("{:.2}", yearly).bold());
        }
        EmployeesCommands::Add {
            first_name,
            last_name,
            email,
            position,
            department,
            hire_date,
            employment_type,
            salary,
            json,
        } => {
            let mut employee = Employee::new(
                owner,
                &first_name,
                &last_name,
                &email,
                &position,
                &department,
                hire_date,
                employment_type,
            );
            if let Some(salary) = salary {
                employee.costs.push(EmployeeCost::new(
                    "Salary",
                    salary,
                    CostPeriod::Monthly,
                    EmployeeCostCategory::Salary,
                ));
            }

            let employee = service.add_employee(employee)?;
            if json {
                return print_json(&employee);
            }
            success(&format!(
                "Employee '{}' added ({:.2} per month)",
                employee.full_name(),
                employee.total_monthly_cost
            ));
        }
        EmployeesCommands::Update {
            id,
            first_name,
            last_name,
            email,
            position,
            department,
            hire_date,
            employment_type,
            status,
            json,
        } => {
            let update = EmployeeUpdate {
                first_name,
                last_name,
                email,
                position,
                department,
                hire_date,
                employment_type,
                status,
            };
            let employee = service.update_employee(owner, id, &update)?;
            return report(&employee, "updated", json);
        }
        EmployeesCommands::AddCost {
            employee_id,
            name,
            amount,
            period,
            category,
            tax_deductible,
            notes,
            json,
        } => {
            let mut cost = EmployeeCost::new(&name, amount, period, category);
            cost.tax_deductible = tax_deductible;
            cost.notes = notes;
            let employee = service.add_employee_cost(owner, employee_id, cost)?;
            return report(&employee, "cost line added", json);
        }
        EmployeesCommands::UpdateCost {
            employee_id,
            cost_id,
            name,
            amount,
            period,
            category,
            tax_deductible,
            notes,
            json,
        } => {
            let update = EmployeeCostUpdate {
                name,
                amount,
                period,
                category,
                tax_deductible,
                notes,
            };
            let employee = service.update_employee_cost(owner, employee_id, cost_id, &update)?;
            return report(&employee, "cost line updated", json);
        }
        EmployeesCommands::RemoveCost { employee_id, cost_id, json } => {
            let employee = service.remove_employee_cost(owner, employee_id, cost_id)?;
            return report(&employee, "cost line removed", json);
        }
        EmployeesCommands::Remove { id, force } => {
            if !confirm(&format!("Remove employee {} and their cost lines?", id), force)? {
                return Ok(());
            }
            service.remove_employee(owner, id)?;
            success("Employee removed");
        }
    }

    Ok(())
}

/// Print the saved employee with its new totals
fn report(employee: &Employee, what: &str, json: bool) -> Result<()> {
    if json {
        return print_json(employee);
    }
    success(&format!(
        "Employee '{}' {} ({:.2} per month, {:.2} per year)",
        employee.full_name(),
        what,
        employee.total_monthly_cost,
        employee.total_yearly_cost
    ));
    Ok(())
}
