//! Recurring and one-off business costs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CostFrequency {
    OneTime,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl CostFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            CostFrequency::OneTime => "one-time",
            CostFrequency::Daily => "daily",
            CostFrequency::Weekly => "weekly",
            CostFrequency::Monthly => "monthly",
            CostFrequency::Yearly => "yearly",
        }
    }

    /// Occurrences per year (one-time counts once)
    pub fn per_year(&self) -> Decimal {
        match self {
            CostFrequency::OneTime | CostFrequency::Yearly => Decimal::ONE,
            CostFrequency::Daily => Decimal::from(365),
            CostFrequency::Weekly => Decimal::from(52),
            CostFrequency::Monthly => Decimal::from(12),
        }
    }
}

impl fmt::Display for CostFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CostFrequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "one-time" | "onetime" | "once" => Ok(CostFrequency::OneTime),
            "daily" => Ok(CostFrequency::Daily),
            "weekly" => Ok(CostFrequency::Weekly),
            "monthly" => Ok(CostFrequency::Monthly),
            "yearly" => Ok(CostFrequency::Yearly),
            other => Err(Error::validation(format!("Invalid cost frequency: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cost {
    pub id: Uuid,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub category: String,
    pub frequency: CostFrequency,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub related_employee_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cost {
    pub fn new(
        owner_id: impl Into<String>,
        name: &str,
        amount: Decimal,
        category: &str,
        frequency: CostFrequency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            name: name.trim().to_string(),
            description: None,
            amount,
            category: category.trim().to_string(),
            frequency,
            start_date: None,
            end_date: None,
            is_active: true,
            tags: Vec::new(),
            notes: None,
            related_employee_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(Error::validation("Cost name is required"));
        }
        if self.category.is_empty() {
            return Err(Error::validation("Cost category is required"));
        }
        if self.amount < Decimal::ZERO {
            return Err(Error::validation("Cost amount must not be negative"));
        }
        if self.frequency != CostFrequency::OneTime && self.start_date.is_none() {
            return Err(Error::validation("Start date is required for recurring costs"));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end <= start {
                return Err(Error::validation("End date must be after start date"));
            }
        }
        Ok(())
    }

    /// Cost over one year at the configured frequency
    pub fn annual_total(&self) -> Decimal {
        self.amount * self.frequency.per_year()
    }
}

/// Partial edit of a cost; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub frequency: Option<CostFrequency>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
    pub notes: Option<String>,
}

impl CostUpdate {
    /// Apply the edit and re-check the whole cost
    pub fn apply_to(&self, cost: &mut Cost) -> Result<()> {
        if let Some(name) = &self.name {
            cost.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            cost.description = Some(description.trim().to_string());
        }
        if let Some(amount) = self.amount {
            cost.amount = amount;
        }
        if let Some(category) = &self.category {
            cost.category = category.trim().to_string();
        }
        if let Some(frequency) = self.frequency {
            cost.frequency = frequency;
        }
        if let Some(start) = self.start_date {
            cost.start_date = Some(start);
        }
        if let Some(end) = self.end_date {
            cost.end_date = Some(end);
        }
        if let Some(active) = self.is_active {
            cost.is_active = active;
        }
        if let Some(notes) = &self.notes {
            cost.notes = Some(notes.trim().to_string());
        }
        cost.validate()?;
        cost.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_annual_total() {
        let mut cost = Cost::new("o", "Hosting", Decimal::new(10, 0), "it", CostFrequency::Monthly);
        assert_eq!(cost.annual_total(), Decimal::new(120, 0));

        cost.frequency = CostFrequency::Daily;
        assert_eq!(cost.annual_total(), Decimal::new(3650, 0));

        cost.frequency = CostFrequency::Weekly;
        assert_eq!(cost.annual_total(), Decimal::new(520, 0));

        cost.frequency = CostFrequency::OneTime;
        assert_eq!(cost.annual_total(), Decimal::new(10, 0));
    }

    #[test]
    fn test_recurring_cost_needs_start_date() {
        let mut cost = Cost::new("o", "Rent", Decimal::new(900, 0), "loyer", CostFrequency::Monthly);
        assert!(cost.validate().is_err());

        cost.start_date = Some(date(2024, 1, 1));
        cost.validate().unwrap();

        cost.end_date = Some(date(2024, 1, 1));
        assert!(cost.validate().is_err());
    }

    #[test]
    fn test_one_time_cost_without_dates() {
        let cost = Cost::new("o", "Laptop", Decimal::new(1500, 0), "equipment", CostFrequency::OneTime);
        cost.validate().unwrap();
    }

    #[test]
    fn test_update_revalidates() {
        let mut cost = Cost::new("o", "Laptop", Decimal::new(1500, 0), "equipment", CostFrequency::OneTime);

        let update = CostUpdate {
            frequency: Some(CostFrequency::Monthly),
            ..Default::default()
        };
        assert!(update.apply_to(&mut cost.clone()).is_err());

        let update = CostUpdate {
            frequency: Some(CostFrequency::Monthly),
            start_date: Some(date(2024, 3, 1)),
            amount: Some(Decimal::new(45, 0)),
            ..Default::default()
        };
        update.apply_to(&mut cost).unwrap();
        assert_eq!(cost.annual_total(), Decimal::new(540, 0));
    }

    #[test]
    fn test_frequency_parsing() {
        assert_eq!("one-time".parse::<CostFrequency>().unwrap(), CostFrequency::OneTime);
        assert!("hourly".parse::<CostFrequency>().is_err());
    }
}
