//! TOML configuration for anytable connections.
//!
//! ```toml
//! safe = true
//! adapters = ["memory", "generator"]
//!
//! [adapter.generator]
//! max_rows = 100
//! ```

use anytable_core::{
    adapter::{AdapterConfig, ArgValue},
    session::ConnectionOptions,
};
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};
use thiserror::Error as ThisError;
use tracing::debug;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value for '{key}': {reason}")]
    Invalid { key: String, reason: String },
}

///
/// AnytableConfig
///
/// `adapters == None` means every registered adapter outside safe mode and
/// none in safe mode.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AnytableConfig {
    #[serde(default)]
    pub safe: bool,

    #[serde(default)]
    pub adapters: Option<Vec<String>>,

    #[serde(default)]
    pub adapter: BTreeMap<String, toml::Table>,
}

impl AnytableConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        debug!(path = %path.display(), "loading config");

        Self::from_toml_str(&source)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let Some(adapters) = &self.adapters else {
            return Ok(());
        };

        for (i, name) in adapters.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    key: "adapters".to_string(),
                    reason: "adapter names must not be empty".to_string(),
                });
            }
            if adapters[..i].contains(name) {
                return Err(ConfigError::Invalid {
                    key: "adapters".to_string(),
                    reason: format!("'{name}' is listed twice"),
                });
            }
        }

        Ok(())
    }

    /// Keyword configuration per adapter, in argument form.
    #[must_use]
    pub fn adapter_config(&self) -> BTreeMap<String, AdapterConfig> {
        self.adapter
            .iter()
            .map(|(name, table)| (name.clone(), table_to_config(table)))
            .collect()
    }

    #[must_use]
    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            safe: self.safe,
            adapters: self.adapters.clone(),
            adapter_config: self.adapter_config(),
        }
    }
}

fn table_to_config(table: &toml::Table) -> AdapterConfig {
    table
        .iter()
        .map(|(key, value)| (key.clone(), to_arg(value)))
        .collect()
}

fn to_arg(value: &toml::Value) -> ArgValue {
    match value {
        toml::Value::String(v) => ArgValue::Text(v.clone()),
        toml::Value::Integer(v) => ArgValue::Integer(*v),
        toml::Value::Float(v) => ArgValue::Float(*v),
        toml::Value::Boolean(v) => ArgValue::Bool(*v),
        toml::Value::Datetime(v) => ArgValue::Text(v.to_string()),
        toml::Value::Array(items) => ArgValue::List(items.iter().map(to_arg).collect()),
        toml::Value::Table(table) => ArgValue::Map(table_to_config(table)),
    }
}
