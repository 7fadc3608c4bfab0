//! Naming conventions and SQL logging settings.
//!
//! Configuration is consumed once, when a [`Registry`](crate::Registry) is built:
//! it derives column names from attribute names and default foreign-key and
//! join-table names for relations that do not spell them out.
//!
//! ```toml
//! [naming]
//! column_case = "snake"
//! primary_key = "id"
//! foreign_key_suffix = "_id"
//!
//! [log]
//! level = "info"
//! max_sql_length = 500
//! ```

use crate::error::{OrmError, OrmResult};
use heck::{ToLowerCamelCase, ToSnakeCase};
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document.
    pub fn from_toml_str(raw: &str) -> OrmResult<Self> {
        toml::from_str(raw).map_err(|e| OrmError::Config(format!("failed to parse config: {e}")))
    }

    /// Read and parse a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> OrmResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OrmError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn with_naming(mut self, naming: NamingConfig) -> Self {
        self.naming = naming;
        self
    }

    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

/// How attribute names map to column names when no explicit column is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnCase {
    /// `authorId` → `author_id`
    #[default]
    Snake,
    /// Column name equals the attribute name.
    AsIs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamingConfig {
    #[serde(default)]
    pub column_case: ColumnCase,
    /// Primary-key attribute for models that do not declare one.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default = "default_foreign_key_suffix")]
    pub foreign_key_suffix: String,
    #[serde(default = "default_join_table_separator")]
    pub join_table_separator: String,
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_foreign_key_suffix() -> String {
    "_id".to_string()
}

fn default_join_table_separator() -> String {
    "_".to_string()
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            column_case: ColumnCase::default(),
            primary_key: default_primary_key(),
            foreign_key_suffix: default_foreign_key_suffix(),
            join_table_separator: default_join_table_separator(),
        }
    }
}

impl NamingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column_case(mut self, case: ColumnCase) -> Self {
        self.column_case = case;
        self
    }

    pub fn primary_key(mut self, attribute: impl Into<String>) -> Self {
        self.primary_key = attribute.into();
        self
    }

    pub fn foreign_key_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.foreign_key_suffix = suffix.into();
        self
    }

    /// Column name for an attribute.
    pub fn column_for(&self, attribute: &str) -> String {
        match self.column_case {
            ColumnCase::Snake => attribute.to_snake_case(),
            ColumnCase::AsIs => attribute.to_string(),
        }
    }

    /// Foreign-key attribute pointing at `model`: `Author` → `authorId`.
    pub fn foreign_key_attribute(&self, model: &str) -> String {
        match self.column_case {
            ColumnCase::Snake => format!("{model}{}", self.foreign_key_suffix).to_lower_camel_case(),
            ColumnCase::AsIs => self.foreign_key_column(model),
        }
    }

    /// Foreign-key column pointing at `model`: `Author` → `author_id`.
    pub fn foreign_key_column(&self, model: &str) -> String {
        format!("{}{}", model.to_snake_case(), self.foreign_key_suffix)
    }

    /// Join table for a many-to-many pair, independent of declaration side.
    pub fn join_table_for(&self, a: &str, b: &str) -> String {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        format!("{first}{}{second}", self.join_table_separator)
    }
}

/// SQL event logging.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `error`, `warn`, `info`, `debug` or `trace`.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Truncate logged SQL (in bytes). `None` means no truncation.
    #[serde(default = "default_max_sql_length")]
    pub max_sql_length: Option<usize>,
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_max_sql_length() -> Option<usize> {
    Some(200)
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_sql_length: default_max_sql_length(),
        }
    }
}
