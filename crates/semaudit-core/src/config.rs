//! Configuration schema (semaudit.toml)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Truncation limits for expression text in report rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLimits {
    /// Max characters of M/DAX text in inventory and dependency rows
    #[serde(default = "default_expression_limit")]
    pub expression: usize,

    /// Max characters of DAX text in hardcoded-measure rows
    #[serde(default = "default_hardcoded_limit")]
    pub hardcoded: usize,
}

fn default_expression_limit() -> usize {
    5000
}

fn default_hardcoded_limit() -> usize {
    100
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            expression: default_expression_limit(),
            hardcoded: default_hardcoded_limit(),
        }
    }
}

/// Tables excluded from lineage and usage sheets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableFilter {
    /// Table names or glob patterns (e.g. `LocalDateTable_*`)
    #[serde(default)]
    pub skip_tables: Vec<String>,
}

impl TableFilter {
    /// Check if a table should be skipped
    pub fn is_table_skipped(&self, table: &str) -> bool {
        self.skip_tables.iter().any(|pattern| {
            if pattern.contains(['*', '?', '[']) {
                glob_match(pattern, table)
            } else {
                pattern == table
            }
        })
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Model definition folder (the `*.SemanticModel/definition` directory)
    #[serde(default)]
    pub model_root: Option<PathBuf>,

    /// Output file for the JSON report
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Optional Markdown rendering of the report
    #[serde(default)]
    pub markdown: Option<PathBuf>,

    /// Expression truncation limits
    #[serde(default)]
    pub limits: ReportLimits,

    /// Table filter
    #[serde(default)]
    pub filter: TableFilter,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

fn default_output() -> PathBuf {
    PathBuf::from("audit.json")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_root: None,
            output: default_output(),
            markdown: None,
            limits: ReportLimits::default(),
            filter: TableFilter::default(),
            project_root: std::env::current_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Model root resolved against the project root
    pub fn resolved_model_root(&self) -> Option<PathBuf> {
        self.model_root.as_ref().map(|root| {
            if root.is_relative() {
                self.project_root.join(root)
            } else {
                root.clone()
            }
        })
    }
}

/// Glob matching for table names; a pattern that fails to compile only
/// matches itself
fn glob_match(pattern: &str, text: &str) -> bool {
    match globset::Glob::new(pattern) {
        Ok(glob) => glob.compile_matcher().is_match(text),
        Err(_) => pattern == text,
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.output, PathBuf::from("audit.json"));
        assert_eq!(config.limits.expression, 5000);
        assert_eq!(config.limits.hardcoded, 100);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config = Config::from_toml(
            r#"
            model_root = "Sales.SemanticModel/definition"

            [limits]
            expression = 200

            [filter]
            skip_tables = ["LocalDateTable_*", "DateTableTemplate_*"]
            "#,
        )
        .unwrap();

        assert_eq!(config.limits.expression, 200);
        assert_eq!(config.limits.hardcoded, 100);
        assert!(config.filter.is_table_skipped("LocalDateTable_1b2c"));
        assert!(!config.filter.is_table_skipped("Sales"));
    }

    #[test]
    fn relative_model_root_resolves_against_project() {
        let mut config = Config::from_toml(r#"model_root = "model""#).unwrap();
        config.project_root = PathBuf::from("/work");
        assert_eq!(config.resolved_model_root(), Some(PathBuf::from("/work/model")));
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let err = Config::from_toml("limits = 3").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn glob_matching() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("LocalDateTable_*", "LocalDateTable_abc"));
        assert!(glob_match("*_staging", "orders_staging"));
        assert!(!glob_match("LocalDateTable_*", "Sales"));
    }

    #[test]
    fn glob_with_several_stars() {
        assert!(glob_match("*Template*", "DateTableTemplate_1"));
        assert!(glob_match("Local*Table_*", "LocalDateTable_x"));
        assert!(!glob_match("ab*ba", "aba"));
        assert!(glob_match("ab*ba", "abba"));
    }

    #[test]
    fn unparsable_pattern_matches_only_itself() {
        let filter = TableFilter {
            skip_tables: vec!["Bad[".to_string()],
        };
        assert!(filter.is_table_skipped("Bad["));
        assert!(!filter.is_table_skipped("Bad"));
    }
}
