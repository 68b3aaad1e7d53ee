//! Configuration management
//!
//! Settings live in `<data dir>/settings.json`:
//! ```json
//! {
//!   "import": { "maxFileSizeMb": 10, "dayFirst": true, "defaultCategory": "Uncategorized" },
//!   "categorization": {
//!     "minConfidence": 0.0,
//!     "rules": [{ "pattern": "edf", "matchType": "contains", "category": "Energie" }]
//!   }
//! }
//! ```
//! Keys this crate does not manage are kept as-is on save.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::UNCATEGORIZED;

const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    import: ImportSettings,
    #[serde(default)]
    categorization: CategorizationSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Upload limits and parsing preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSettings {
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
    /// Read `01/02/2024` as 1 February rather than 2 January
    #[serde(default = "default_true")]
    pub day_first: bool,
    #[serde(default = "default_category")]
    pub default_category: String,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            day_first: true,
            default_category: UNCATEGORIZED.to_string(),
        }
    }
}

impl ImportSettings {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizationSettings {
    /// Suggestions below this confidence are not applied
    #[serde(default)]
    pub min_confidence: f64,
    #[serde(default)]
    pub rules: Vec<CategoryRule>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Contains,
    StartsWith,
    Regex,
}

/// Description pattern that maps to a category; first matching rule wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRule {
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
    pub category: String,
}

fn default_max_file_size_mb() -> u64 {
    DEFAULT_MAX_FILE_SIZE_MB
}

fn default_true() -> bool {
    true
}

fn default_category() -> String {
    UNCATEGORIZED.to_string()
}

/// LedgerDesk configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub import: ImportSettings,
    pub categorization: CategorizationSettings,
}

impl Config {
    /// Load config from the data directory
    ///
    /// `LEDGERDESK_MAX_FILE_SIZE` (megabytes) overrides the upload limit.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;

        let mut import = raw.import;
        if let Ok(value) = std::env::var("LEDGERDESK_MAX_FILE_SIZE") {
            import.max_file_size_mb = value
                .trim()
                .parse()
                .with_context(|| format!("Invalid LEDGERDESK_MAX_FILE_SIZE: {}", value))?;
        }

        Ok(Self {
            import,
            categorization: raw.categorization,
        })
    }

    /// Save config to the data directory
    /// Preserves other settings this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");

        let mut settings = read_settings(data_dir)?;
        settings.import = self.import.clone();
        settings.categorization = self.categorization.clone();

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();

        assert_eq!(config.import.max_file_size_mb, 10);
        assert!(config.import.day_first);
        assert_eq!(config.import.default_category, "Uncategorized");
        assert!(config.categorization.rules.is_empty());
    }

    #[test]
    fn test_partial_settings_keep_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"import": {"dayFirst": false}, "categorization": {"rules": [
                {"pattern": "EDF", "category": "Energie"},
                {"pattern": "^AMZ", "matchType": "regex", "category": "Fournitures"}
            ]}}"#,
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert!(!config.import.day_first);
        assert_eq!(config.import.max_file_size_mb, 10);
        assert_eq!(config.categorization.rules.len(), 2);
        assert_eq!(config.categorization.rules[0].match_type, MatchType::Contains);
        assert_eq!(config.categorization.rules[1].match_type, MatchType::Regex);
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"theme": "dark", "import": {"maxFileSizeMb": 5}}"#,
        )
        .unwrap();

        let mut config = Config::load(dir.path()).unwrap();
        config.import.default_category = "Divers".to_string();
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["import"]["maxFileSizeMb"], 5);
        assert_eq!(value["import"]["defaultCategory"], "Divers");
    }
}
