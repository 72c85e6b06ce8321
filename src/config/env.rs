//! Environment Variable Configuration Provider
//!
//! Read-only access to settings stored in environment variables.
//! Empty variables are treated as unset.

use std::str::FromStr;

use super::{ConfigError, ConfigResult};

/// Read-only environment variable configuration provider.
#[derive(Debug, Clone, Default)]
pub struct EnvConfigProvider {
    prefix: Option<String>,
}

impl EnvConfigProvider {
    /// Create a new environment provider with no prefix
    pub fn new() -> Self {
        Self { prefix: None }
    }

    /// Create an environment provider with a prefix
    pub fn prefixed(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Get the full environment variable name
    fn env_key(&self, key: &str) -> String {
        let key = key.to_uppercase().replace('.', "_");
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, key),
            None => key,
        }
    }

    /// Get a raw value; unset and empty variables yield `None`.
    pub fn get_raw(&self, key: &str) -> ConfigResult<Option<String>> {
        let env_key = self.env_key(key);
        match std::env::var(&env_key) {
            Ok(value) if value.is_empty() => Ok(None),
            Ok(value) => Ok(Some(value)),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(ConfigError::InvalidValue {
                key: env_key,
                message: e.to_string(),
            }),
        }
    }

    /// Get a boolean value (`true/false`, `1/0`, `yes/no`).
    pub fn get_bool(&self, key: &str) -> ConfigResult<Option<bool>> {
        let Some(raw) = self.get_raw(key)? else {
            return Ok(None);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Some(true)),
            "false" | "0" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                key: self.env_key(key),
                message: format!("expected a boolean, got '{}'", raw),
            }),
        }
    }

    /// Get a value parsed with [`FromStr`].
    pub fn get_parsed<T>(&self, key: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_raw(key)? {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key: self.env_key(key),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }
}
