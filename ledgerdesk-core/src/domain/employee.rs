//! Employees and the costs attached to them

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Freelance,
    Intern,
}

impl EmploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentType::FullTime => "full-time",
            EmploymentType::PartTime => "part-time",
            EmploymentType::Contract => "contract",
            EmploymentType::Freelance => "freelance",
            EmploymentType::Intern => "intern",
        }
    }
}

impl FromStr for EmploymentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "full-time" => Ok(EmploymentType::FullTime),
            "part-time" => Ok(EmploymentType::PartTime),
            "contract" => Ok(EmploymentType::Contract),
            "freelance" => Ok(EmploymentType::Freelance),
            "intern" => Ok(EmploymentType::Intern),
            other => Err(Error::validation(format!("Invalid employment type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmployeeStatus {
    #[default]
    Active,
    OnLeave,
    Terminated,
}

impl EmployeeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeStatus::Active => "active",
            EmployeeStatus::OnLeave => "on-leave",
            EmployeeStatus::Terminated => "terminated",
        }
    }
}

impl FromStr for EmployeeStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(EmployeeStatus::Active),
            "on-leave" => Ok(EmployeeStatus::OnLeave),
            "terminated" => Ok(EmployeeStatus::Terminated),
            other => Err(Error::validation(format!("Invalid employee status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostPeriod {
    Monthly,
    Yearly,
}

impl CostPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostPeriod::Monthly => "monthly",
            CostPeriod::Yearly => "yearly",
        }
    }
}

impl FromStr for CostPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "monthly" => Ok(CostPeriod::Monthly),
            "yearly" => Ok(CostPeriod::Yearly),
            other => Err(Error::validation(format!("Invalid cost period: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmployeeCostCategory {
    Salary,
    Benefits,
    Transport,
    Equipment,
    Training,
    Other,
}

impl EmployeeCostCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmployeeCostCategory::Salary => "salary",
            EmployeeCostCategory::Benefits => "benefits",
            EmployeeCostCategory::Transport => "transport",
            EmployeeCostCategory::Equipment => "equipment",
            EmployeeCostCategory::Training => "training",
            EmployeeCostCategory::Other => "other",
        }
    }
}

impl FromStr for EmployeeCostCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "salary" => Ok(EmployeeCostCategory::Salary),
            "benefits" => Ok(EmployeeCostCategory::Benefits),
            "transport" => Ok(EmployeeCostCategory::Transport),
            "equipment" => Ok(EmployeeCostCategory::Equipment),
            "training" => Ok(EmployeeCostCategory::Training),
            "other" => Ok(EmployeeCostCategory::Other),
            other => Err(Error::validation(format!("Invalid employee cost category: {}", other))),
        }
    }
}

/// One cost line on an employee (salary, transport allowance, ...)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeCost {
    pub id: Uuid,
    pub name: String,
    pub amount: Decimal,
    pub period: CostPeriod,
    pub category: EmployeeCostCategory,
    pub tax_deductible: bool,
    pub notes: Option<String>,
}

impl EmployeeCost {
    pub fn new(name: &str, amount: Decimal, period: CostPeriod, category: EmployeeCostCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            amount,
            period,
            category,
            tax_deductible: false,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: Uuid,
    pub owner_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub position: String,
    pub department: String,
    pub hire_date: NaiveDate,
    pub employment_type: EmploymentType,
    pub status: EmployeeStatus,
    pub costs: Vec<EmployeeCost>,
    pub total_monthly_cost: Decimal,
    pub total_yearly_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: impl Into<String>,
        first_name: &str,
        last_name: &str,
        email: &str,
        position: &str,
        department: &str,
        hire_date: NaiveDate,
        employment_type: EmploymentType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email.trim().to_lowercase(),
            position: position.trim().to_string(),
            department: department.trim().to_string(),
            hire_date,
            employment_type,
            status: EmployeeStatus::Active,
            costs: Vec::new(),
            total_monthly_cost: Decimal::ZERO,
            total_yearly_cost: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("First name", &self.first_name),
            ("Last name", &self.last_name),
            ("Email", &self.email),
            ("Position", &self.position),
            ("Department", &self.department),
        ] {
            if value.is_empty() {
                return Err(Error::validation(format!("{} is required", field)));
            }
        }
        if let Some(cost) = self.costs.iter().find(|c| c.amount < Decimal::ZERO) {
            return Err(Error::validation(format!(
                "Employee cost '{}' must not be negative",
                cost.name
            )));
        }
        Ok(())
    }

    pub fn cost_mut(&mut self, cost_id: Uuid) -> Result<&mut EmployeeCost> {
        self.costs
            .iter_mut()
            .find(|c| c.id == cost_id)
            .ok_or_else(|| Error::not_found(format!("Employee cost {}", cost_id)))
    }

    /// Recompute monthly and yearly totals from the cost lines
    pub fn recompute_totals(&mut self) {
        let twelve = Decimal::from(12);
        let mut monthly = Decimal::ZERO;
        let mut yearly = Decimal::ZERO;
        for cost in &self.costs {
            match cost.period {
                CostPeriod::Monthly => {
                    monthly += cost.amount;
                    yearly += cost.amount * twelve;
                }
                CostPeriod::Yearly => {
                    monthly += cost.amount / twelve;
                    yearly += cost.amount;
                }
            }
        }
        self.total_monthly_cost = monthly.round_dp(2);
        self.total_yearly_cost = yearly.round_dp(2);
    }
}

/// Partial edit of an employee's own fields; cost lines have their own edits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub employment_type: Option<EmploymentType>,
    pub status: Option<EmployeeStatus>,
}

impl EmployeeUpdate {
    pub fn apply_to(&self, employee: &mut Employee) -> Result<()> {
        if let Some(first_name) = &self.first_name {
            employee.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = &self.last_name {
            employee.last_name = last_name.trim().to_string();
        }
        if let Some(email) = &self.email {
            employee.email = email.trim().to_lowercase();
        }
        if let Some(position) = &self.position {
            employee.position = position.trim().to_string();
        }
        if let Some(department) = &self.department {
            employee.department = department.trim().to_string();
        }
        if let Some(hire_date) = self.hire_date {
            employee.hire_date = hire_date;
        }
        if let Some(kind) = self.employment_type {
            employee.employment_type = kind;
        }
        if let Some(status) = self.status {
            employee.status = status;
        }
        employee.validate()?;
        employee.updated_at = Utc::now();
        Ok(())
    }
}

/// Partial edit of one cost line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeCostUpdate {
    pub name: Option<String>,
    pub amount: Option<Decimal>,
    pub period: Option<CostPeriod>,
    pub category: Option<EmployeeCostCategory>,
    pub tax_deductible: Option<bool>,
    pub notes: Option<String>,
}

impl EmployeeCostUpdate {
    pub fn apply_to(&self, cost: &mut EmployeeCost) -> Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(Error::validation("Cost name is required"));
            }
            cost.name = name.trim().to_string();
        }
        if let Some(amount) = self.amount {
            cost.amount = amount;
        }
        if let Some(period) = self.period {
            cost.period = period;
        }
        if let Some(category) = self.category {
            cost.category = category;
        }
        if let Some(deductible) = self.tax_deductible {
            cost.tax_deductible = deductible;
        }
        if let Some(notes) = &self.notes {
            cost.notes = Some(notes.trim().to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employee() -> Employee {
        Employee::new(
            "owner-1",
            "Claire",
            "Dubois",
            "  Claire.Dubois@Example.COM ",
            "Accountant",
            "Finance",
            NaiveDate::from_ymd_opt(2023, 9, 1).unwrap(),
            EmploymentType::FullTime,
        )
    }

    #[test]
    fn test_email_is_lowercased() {
        assert_eq!(employee().email, "claire.dubois@example.com");
        assert_eq!(employee().full_name(), "Claire Dubois");
    }

    #[test]
    fn test_recompute_totals() {
        let mut emp = employee();
        emp.costs.push(EmployeeCost::new(
            "Salary",
            Decimal::new(3000, 0),
            CostPeriod::Monthly,
            EmployeeCostCategory::Salary,
        ));
        emp.costs.push(EmployeeCost::new(
            "Training budget",
            Decimal::new(1200, 0),
            CostPeriod::Yearly,
            EmployeeCostCategory::Training,
        ));
        emp.recompute_totals();

        assert_eq!(emp.total_monthly_cost, Decimal::new(3100, 0));
        assert_eq!(emp.total_yearly_cost, Decimal::new(37200, 0));
    }

    #[test]
    fn test_update_trims_and_checks() {
        let mut emp = employee();
        let update = EmployeeUpdate {
            position: Some(" Senior Accountant ".to_string()),
            status: Some(EmployeeStatus::OnLeave),
            ..Default::default()
        };
        update.apply_to(&mut emp).unwrap();
        assert_eq!(emp.position, "Senior Accountant");
        assert_eq!(emp.status, EmployeeStatus::OnLeave);

        let update = EmployeeUpdate {
            email: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(update.apply_to(&mut emp).is_err());
    }

    #[test]
    fn test_cost_line_lookup() {
        let mut emp = employee();
        let line = EmployeeCost::new("Salary", Decimal::new(3000, 0), CostPeriod::Monthly, EmployeeCostCategory::Salary);
        let id = line.id;
        emp.costs.push(line);

        let update = EmployeeCostUpdate {
            amount: Some(Decimal::new(3200, 0)),
            ..Default::default()
        };
        update.apply_to(emp.cost_mut(id).unwrap()).unwrap();
        assert_eq!(emp.costs[0].amount, Decimal::new(3200, 0));

        let err = emp.cost_mut(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_validate_requires_names() {
        let mut emp = employee();
        emp.validate().unwrap();
        emp.department.clear();
        assert!(emp.validate().is_err());
    }
}
