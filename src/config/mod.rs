//! Client configuration and platform settings.
//!
//! ```rust,no_run
//! use platform_client::config::{ClientConfiguration, ClientType, PlatformSettings};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = PlatformSettings::from_env()?;
//! let configuration = ClientConfiguration::new(ClientType::BearerTokenCf, "https://api.example/v2")?
//!     .with_credentials("admin", "secret");
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod env;
pub mod kubernetes;
pub mod network;
pub mod settings;

pub use client::{ClientConfiguration, ClientType};
pub use env::EnvConfigProvider;
pub use kubernetes::KubernetesConfigurationProvider;
pub use network::{ClientCertConfig, ProxyConfig};
pub use settings::{JumpHostSettings, PlatformSettings};

use thiserror::Error;

/// Errors that can occur while building configuration values
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required property is missing or empty
    #[error("Property '{property}' can not be empty")]
    EmptyProperty {
        /// The offending property
        property: &'static str,
    },

    /// Key not found
    #[error("Key not found: {key}")]
    NotFound {
        /// The key that was not found
        key: String,
    },

    /// Invalid configuration value
    #[error("Invalid value for {key}: {message}")]
    InvalidValue {
        /// The key with invalid value
        key: String,
        /// Error message
        message: String,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML document could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_bw::Error),
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::EmptyProperty {
            property: "base_url",
        };
        assert_eq!(err.to_string(), "Property 'base_url' can not be empty");

        let err = ConfigError::NotFound {
            key: "TAP_DOMAIN".to_string(),
        };
        assert!(err.to_string().contains("TAP_DOMAIN"));
    }
}
