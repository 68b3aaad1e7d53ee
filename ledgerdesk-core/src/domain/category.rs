//! Category domain model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

pub const DEFAULT_COLOR: &str = "#1976d2";
pub const DEFAULT_ICON: &str = "category";

/// Which side of the ledger a category applies to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    Expense,
    #[default]
    Both,
}

impl CategoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Income => "income",
            CategoryKind::Expense => "expense",
            CategoryKind::Both => "both",
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CategoryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(CategoryKind::Income),
            "expense" => Ok(CategoryKind::Expense),
            "both" => Ok(CategoryKind::Both),
            other => Err(Error::validation(format!("Invalid category type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub kind: CategoryKind,
    pub is_default: bool,
    pub is_active: bool,
    pub color: String,
    pub icon: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// New user-defined category; the name is trimmed and must not be empty
    pub fn new(name: &str, kind: CategoryKind) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Category name is required"));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
            is_default: false,
            is_active: true,
            color: DEFAULT_COLOR.to_string(),
            icon: DEFAULT_ICON.to_string(),
            parent_id: None,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_category_defaults() {
        let cat = Category::new("  Loyer ", CategoryKind::Expense).unwrap();
        assert_eq!(cat.name, "Loyer");
        assert_eq!(cat.color, "#1976d2");
        assert_eq!(cat.icon, "category");
        assert!(cat.is_active);
        assert!(!cat.is_default);
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(Category::new("   ", CategoryKind::Both).is_err());
    }
}
