//! User settings and preferences
//!
//! Manages application settings stored in ~/.soqlx/config.toml

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Delimiter used by the CSV copy/export format
    #[serde(default = "default_csv_separator")]
    pub csv_separator: String,

    /// REST API version used in request paths
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Show per-batch timing after an export
    #[serde(default = "default_true")]
    pub display_performance: bool,

    /// Row limit of the opt-in distinct value lookup query
    #[serde(default = "default_value_lookup_limit")]
    pub value_lookup_limit: usize,

    #[serde(default = "default_query_templates")]
    pub query_templates: Vec<String>,

    #[serde(default = "default_query")]
    pub default_query: String,
}

fn default_csv_separator() -> String {
    ",".to_string()
}

/// API version used when the config file sets none
pub const DEFAULT_API_VERSION: &str = "61.0";

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_true() -> bool {
    true
}

fn default_value_lookup_limit() -> usize {
    100
}

fn default_query_templates() -> Vec<String> {
    [
        "SELECT Id FROM ",
        "SELECT Id FROM WHERE",
        "SELECT Id FROM WHERE IN",
        "SELECT Id FROM WHERE LIKE",
        "SELECT Id FROM WHERE ORDER BY",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

fn default_query() -> String {
    "SELECT Id FROM Account LIMIT 200".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            csv_separator: default_csv_separator(),
            api_version: default_api_version(),
            display_performance: default_true(),
            value_lookup_limit: default_value_lookup_limit(),
            query_templates: default_query_templates(),
            default_query: default_query(),
        }
    }
}

impl Settings {
    /// The configured CSV delimiter as a single character.
    pub fn csv_delimiter(&self) -> ConfigResult<char> {
        let mut chars = self.csv_separator.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(ConfigError::Invalid(format!(
                "csv_separator must be a single character, got {:?}",
                self.csv_separator
            ))),
        }
    }
}

/// Get the configuration directory path
pub fn config_dir() -> ConfigResult<PathBuf> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(".soqlx"))
}

/// Load settings from config file
pub fn load_settings() -> ConfigResult<Settings> {
    load_settings_from(&config_dir()?.join("config.toml"))
}

/// Load settings from an explicit path; a missing file yields defaults.
pub fn load_settings_from(path: &Path) -> ConfigResult<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    let settings: Settings = toml::from_str(&content)?;
    settings.csv_delimiter()?;
    Ok(settings)
}
