//! Cost service - recurring business costs and employee costs

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::{
    Cost, CostUpdate, Employee, EmployeeCost, EmployeeCostUpdate, EmployeeUpdate,
};

/// Expected spend from active costs
#[derive(Debug, Clone, Serialize)]
pub struct CostEstimate {
    pub monthly: Decimal,
    pub yearly: Decimal,
    pub active_costs: usize,
}

pub struct CostService {
    repository: Arc<DuckDbRepository>,
}

impl CostService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    pub fn add_cost(&self, mut cost: Cost) -> Result<Cost> {
        cost.name = cost.name.trim().to_string();
        cost.category = cost.category.trim().to_string();
        cost.validate()?;
        self.repository
            .insert_cost(&cost)
            .with_context(|| format!("Failed to save cost '{}'", cost.name))?;
        Ok(cost)
    }

    pub fn list_costs(&self, owner_id: &str) -> Result<Vec<Cost>> {
        Ok(self.repository.list_costs(owner_id)?)
    }

    pub fn update_cost(&self, owner_id: &str, id: Uuid, update: &CostUpdate) -> Result<Cost> {
        let mut cost = self
            .repository
            .get_cost(owner_id, id)?
            .ok_or_else(|| Error::not_found(format!("Cost {}", id)))?;
        update.apply_to(&mut cost)?;
        if !self.repository.update_cost(&cost)? {
            return Err(Error::not_found(format!("Cost {}", id)).into());
        }
        Ok(cost)
    }

    pub fn remove_cost(&self, owner_id: &str, id: Uuid) -> Result<()> {
        if !self.repository.delete_cost(owner_id, id)? {
            return Err(Error::not_found(format!("Cost {}", id)).into());
        }
        Ok(())
    }

    /// Yearly spend of the active costs; one-time costs count once
    pub fn estimate(&self, owner_id: &str) -> Result<CostEstimate> {
        let costs = self.repository.list_costs(owner_id)?;
        let active: Vec<&Cost> = costs.iter().filter(|c| c.is_active).collect();
        let yearly: Decimal = active.iter().map(|c| c.annual_total()).sum();
        Ok(CostEstimate {
            monthly: (yearly / Decimal::from(12)).round_dp(2),
            yearly: yearly.round_dp(2),
            active_costs: active.len(),
        })
    }

    /// Save an employee; totals are recomputed from the cost lines first
    pub fn add_employee(&self, mut employee: Employee) -> Result<Employee> {
        employee.validate()?;
        employee.recompute_totals();
        self.repository
            .insert_employee(&employee)
            .with_context(|| format!("Failed to save employee '{}'", employee.full_name()))?;
        Ok(employee)
    }

    pub fn list_employees(&self, owner_id: &str) -> Result<Vec<Employee>> {
        Ok(self.repository.list_employees(owner_id)?)
    }

    pub fn update_employee(
        &self,
        owner_id: &str,
        id: Uuid,
        update: &EmployeeUpdate,
    ) -> Result<Employee> {
        self.modify_employee(owner_id, id, |employee| update.apply_to(employee))
    }

    pub fn add_employee_cost(
        &self,
        owner_id: &str,
        employee_id: Uuid,
        mut cost: EmployeeCost,
    ) -> Result<Employee> {
        cost.name = cost.name.trim().to_string();
        if cost.name.is_empty() {
            return Err(Error::validation("Cost name is required").into());
        }
        self.modify_employee(owner_id, employee_id, |employee| {
            employee.costs.push(cost);
            Ok(())
        })
    }

    pub fn update_employee_cost(
        &self,
        owner_id: &str,
        employee_id: Uuid,
        cost_id: Uuid,
        update: &EmployeeCostUpdate,
    ) -> Result<Employee> {
        self.modify_employee(owner_id, employee_id, |employee| {
            update.apply_to(employee.cost_mut(cost_id)?)
        })
    }

    pub fn remove_employee_cost(
        &self,
        owner_id: &str,
        employee_id: Uuid,
        cost_id: Uuid,
    ) -> Result<Employee> {
        self.modify_employee(owner_id, employee_id, |employee| {
            let before = employee.costs.len();
            employee.costs.retain(|c| c.id != cost_id);
            if employee.costs.len() == before {
                return Err(Error::not_found(format!("Employee cost {}", cost_id)));
            }
            Ok(())
        })
    }

    /// Load, edit, re-check and save an employee; totals always follow the cost lines
    fn modify_employee<F>(&self, owner_id: &str, id: Uuid, edit: F) -> Result<Employee>
    where
        F: FnOnce(&mut Employee) -> crate::domain::result::Result<()>,
    {
        let mut employee = self
            .repository
            .get_employee(owner_id, id)?
            .ok_or_else(|| Error::not_found(format!("Employee {}", id)))?;
        edit(&mut employee)?;
        employee.validate()?;
        employee.recompute_totals();
        employee.updated_at = Utc::now();
        let saved = self
            .repository
            .update_employee(&employee)
            .with_context(|| format!("Failed to save employee '{}'", employee.full_name()))?;
        if !saved {
            return Err(Error::not_found(format!("Employee {}", id)).into());
        }
        Ok(employee)
    }

    pub fn remove_employee(&self, owner_id: &str, id: Uuid) -> Result<()> {
        if !self.repository.delete_employee(owner_id, id)? {
            return Err(Error::not_found(format!("Employee {}", id)).into());
        }
        Ok(())
    }
}
