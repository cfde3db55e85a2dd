use std::{collections::HashMap, fs, path::Path};

use anyhow::{Context, Result};
use qfilter::{Options, SQL_ADAPTER};
use serde::Deserialize;

/// Settings read from a TOML file. Command line flags take precedence over every entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub adapter: String,
    pub table: Option<String>,
    pub ignore: Vec<String>,
    pub allow: Vec<String>,
    /// Enforce `allow` even when it is empty.
    pub whitelist: bool,
    pub select: Vec<String>,
    pub group_by: Vec<String>,
    /// Relation name → collection it is loaded from.
    pub collections: HashMap<String, String>,
    pub options: Option<Options>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adapter: SQL_ADAPTER.to_string(),
            table: None,
            ignore: Vec::new(),
            allow: Vec::new(),
            whitelist: false,
            select: Vec::new(),
            group_by: Vec::new(),
            collections: HashMap::new(),
            options: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Options from the file, falling back to the `QFILTER_*` environment.
    pub fn options(&self) -> Options {
        self.options.clone().unwrap_or_else(Options::from_env)
    }
}

#[cfg(test)]
mod tests {
    use qfilter::{NamingStrategy, ValidationMode};

    use super::*;

    #[test]
    fn test_parse_config() {
        let config: Config = toml::from_str(
            r#"
            adapter = "postgres"
            table = "invoices"
            ignore = ["bank_id"]
            group-by = ["vendor_id"]

            [collections]
            lines = "invoice_lines"

            [options]
            naming-strategy = "as-is"
            validation = "repair"
            "#,
        )
        .unwrap();
        assert_eq!(config.adapter, "postgres");
        assert_eq!(config.table.as_deref(), Some("invoices"));
        assert_eq!(config.ignore, vec!["bank_id"]);
        assert_eq!(config.group_by, vec!["vendor_id"]);
        assert_eq!(config.collections["lines"], "invoice_lines");
        let options = config.options();
        assert_eq!(options.naming_strategy, NamingStrategy::AsIs);
        assert_eq!(options.validation, ValidationMode::Repair);
    }

    #[test]
    fn test_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.adapter, SQL_ADAPTER);
        assert!(config.options.is_none());
    }
}
