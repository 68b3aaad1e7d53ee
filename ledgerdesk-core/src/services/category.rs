//! Category service

use std::sync::Arc;

use anyhow::Result;

use crate::adapters::duckdb::DuckDbRepository;
use crate::domain::result::Error;
use crate::domain::{Category, CategoryKind};

pub struct CategoryService {
    repository: Arc<DuckDbRepository>,
}

impl CategoryService {
    pub fn new(repository: Arc<DuckDbRepository>) -> Self {
        Self { repository }
    }

    /// Active categories, defaults first
    pub fn list(&self) -> Result<Vec<Category>> {
        Ok(self.repository.list_categories(false)?)
    }

    /// Add a category; names are unique ignoring case
    pub fn create(&self, name: &str, kind: CategoryKind, color: Option<&str>) -> Result<Category> {
        let mut category = Category::new(name, kind)?;
        if let Some(color) = color {
            category.color = color.to_string();
        }
        if self.repository.category_name_exists(&category.name)? {
            return Err(Error::validation(format!("Category '{}' already exists", category.name)).into());
        }
        self.repository.insert_category(&category)?;
        Ok(category)
    }
}
