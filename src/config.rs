//! Configuration file management for certpoller.
//!
//! This module handles loading, validating and merging configuration from a
//! YAML file and command-line arguments.
//!
//! # Configuration Precedence
//!
//! 1. Default values (lowest priority)
//! 2. Configuration file (given with --config)
//! 3. Command-line arguments (highest priority)
//!
//! # Example Configuration File
//!
//! ```yaml
//! warning_days: 14
//! timeout_secs: 10
//! urls:
//!   - https://example.com
//!   - name: Google
//!     url: https://google.com
//! ```

use crate::evaluator::DEFAULT_WARNING_DAYS;
use crate::fetcher::DEFAULT_TIMEOUT;
use crate::outcome::Target;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// One entry of the `urls` list: a bare URL or a named one.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum UrlEntry {
    Url(String),
    Named {
        url: Option<String>,
        name: Option<String>,
    },
}

impl UrlEntry {
    /// Converts the entry to a [`Target`], naming it after its URL when no
    /// name is given.
    pub fn to_target(&self) -> Result<Target, ConfigError> {
        let (url, name) = match self {
            UrlEntry::Url(url) => (Some(url), None),
            UrlEntry::Named { url, name } => (url.as_ref(), name.as_ref()),
        };
        let url = match url {
            Some(url) if !url.trim().is_empty() => url,
            _ => {
                return Err(ConfigError::Validation(
                    "URL cannot be nil or empty".to_string(),
                ))
            }
        };
        let name = name.filter(|n| !n.trim().is_empty()).unwrap_or(url);
        Ok(Target::new(name.as_str(), url.as_str()))
    }
}

/// Main configuration structure for certpoller.
///
/// All fields are optional to support partial configuration and merging.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// Hosts to check
    pub urls: Option<Vec<UrlEntry>>,
    /// Days before expiration at which a certificate is reported
    pub warning_days: Option<i64>,
    /// Connect and handshake timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    /// `urls` unset, `warning_days` 30, `timeout_secs` 30.
    fn default() -> Self {
        Config {
            urls: None,
            warning_days: Some(DEFAULT_WARNING_DAYS),
            timeout_secs: Some(DEFAULT_TIMEOUT.as_secs()),
        }
    }
}

impl Config {
    /// Loads and validates configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// * `ConfigError::NotFound` - the file does not exist
    /// * `ConfigError::Io` - the file could not be read
    /// * `ConfigError::Parse` - the file is not valid YAML
    /// * `ConfigError::Validation` - the `urls` list is missing or malformed, or `timeout_secs` is 0
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parses and validates configuration from a YAML string.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Err(ConfigError::Validation("Config file is empty".to_string()));
        }
        let value: Value = serde_yaml::from_str(content).map_err(|e| {
            ConfigError::Parse(format!("Invalid YAML syntax in config file: {}", e))
        })?;
        validate(&value)?;
        serde_yaml::from_value(value).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Merges this configuration with another, prioritizing the other's values.
    pub fn merge_with(mut self, other: Config) -> Self {
        if other.urls.is_some() {
            self.urls = other.urls;
        }
        if other.warning_days.is_some() {
            self.warning_days = other.warning_days;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        self
    }

    /// Creates a Config from command-line overrides for merging.
    pub fn from_cli_args(warning_days: Option<i64>, timeout_secs: Option<u64>) -> Self {
        Config {
            urls: None,
            warning_days,
            timeout_secs,
        }
    }

    /// The configured targets, in file order.
    pub fn targets(&self) -> Result<Vec<Target>, ConfigError> {
        match &self.urls {
            Some(urls) if !urls.is_empty() => urls.iter().map(UrlEntry::to_target).collect(),
            Some(_) => Err(ConfigError::Validation(
                "URLs array cannot be empty".to_string(),
            )),
            None => Err(ConfigError::Validation(
                "Config must contain 'urls' key".to_string(),
            )),
        }
    }

    /// Generates an example configuration file.
    pub fn example_yaml() -> String {
        let example = Config {
            urls: Some(vec![
                UrlEntry::Url("https://example.com".to_string()),
                UrlEntry::Named {
                    url: Some("https://google.com".to_string()),
                    name: Some("Google".to_string()),
                },
                UrlEntry::Url("expired.badssl.com".to_string()),
            ]),
            warning_days: Some(DEFAULT_WARNING_DAYS),
            timeout_secs: Some(DEFAULT_TIMEOUT.as_secs()),
        };

        serde_yaml::to_string(&example).unwrap_or_else(|_| "# Error generating example".to_string())
    }
}

fn validate(value: &Value) -> Result<(), ConfigError> {
    let mapping = match value {
        Value::Null => return Err(ConfigError::Validation("Config file is empty".to_string())),
        Value::Mapping(mapping) if mapping.is_empty() => {
            return Err(ConfigError::Validation("Config file is empty".to_string()))
        }
        Value::Mapping(mapping) => mapping,
        _ => {
            return Err(ConfigError::Validation(
                "Config must be a mapping".to_string(),
            ))
        }
    };

    let urls = mapping
        .get("urls")
        .ok_or_else(|| ConfigError::Validation("Config must contain 'urls' key".to_string()))?;
    let entries = urls
        .as_sequence()
        .ok_or_else(|| ConfigError::Validation("URLs must be an array".to_string()))?;
    if entries.is_empty() {
        return Err(ConfigError::Validation(
            "URLs array cannot be empty".to_string(),
        ));
    }

    if let Some(timeout) = mapping.get("timeout_secs") {
        if timeout.as_u64() == Some(0) {
            return Err(ConfigError::Validation(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
    }

    for entry in entries {
        match entry {
            Value::String(url) if url.trim().is_empty() => {
                return Err(ConfigError::Validation(
                    "URL cannot be nil or empty".to_string(),
                ))
            }
            Value::String(_) | Value::Mapping(_) => {}
            other => {
                return Err(ConfigError::Validation(format!(
                    "Invalid URL entry: {:?}",
                    other
                )))
            }
        }
    }
    Ok(())
}

/// Errors that can occur during configuration loading and parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file does not exist
    #[error("Config file not found: {0}")]
    NotFound(String),
    /// I/O error (permission denied, etc.)
    #[error("IO Error: {0}")]
    Io(String),
    /// YAML parsing error (invalid syntax, type mismatch, etc.)
    #[error("Parse Error: {0}")]
    Parse(String),
    /// Validation error (missing required fields, invalid values, etc.)
    #[error("Validation Error: {0}")]
    Validation(String),
}
