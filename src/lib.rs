//! # platform-client
//!
//! Authenticated HTTP clients for a multi-tenant cloud platform.
//!
//! A [`ClientRegistry`] hands out one cached [`Client`] per configuration
//! identity. Each client authenticates lazily with the protocol its
//! [`ClientType`] names (HTTP Basic, login page with CSRF, or one of the
//! bearer-token flavors), renews expired tokens before a call and
//! re-authenticates once when the service reports a timed-out session.
//! WebHDFS clients additionally follow data-node redirects through an SSH
//! tunnel.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use platform_client::{ApiRequest, ClientConfiguration, ClientRegistry, ClientType, PlatformSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), platform_client::Error> {
//!     let registry = ClientRegistry::new(PlatformSettings::from_env()?);
//!     let configuration =
//!         ClientConfiguration::new(ClientType::BearerTokenCf, "https://api.example.com/v2")?
//!             .with_credentials("admin", "secret");
//!
//!     let client = registry.get(&configuration).await?;
//!     let apps = client.request(ApiRequest::get("apps")).await?;
//!     println!("{:?}", apps.as_json());
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod auth;
pub mod client;
pub mod config;
pub mod observability;
pub mod tunnel;
pub mod webhdfs;

// Re-exports for convenience
pub use auth::{AuthMaterial, AuthStrategy, ClientAuth, Credentials, TokenFlavor};
pub use client::{
    ApiRequest, Client, ClientRegistry, Payload, RawResponse, RequestBody, Session, SessionMode,
    SessionOptions,
};
pub use config::{
    ClientCertConfig, ClientConfiguration, ClientType, ConfigError, KubernetesConfigurationProvider,
    PlatformSettings, ProxyConfig,
};
pub use observability::LogBodyLimit;
pub use tunnel::{SshTunnelOpener, Tunnel, TunnelOpener, TunnelSpec};
pub use webhdfs::{WebhdfsOperation, WebhdfsRedirect};

/// Error type for platform client operations.
///
/// Errors carry the status, body and URL needed to diagnose a failure
/// without re-running with verbose logging.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No authentication strategy exists for the client type.
    #[error("Unsupported client type: {name}")]
    UnsupportedClientType { name: String },

    /// Authentication handshake was rejected.
    #[error("Authentication failed: {message}{}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    Auth {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// Token endpoint answered without the expected field.
    #[error("Token field '{field}' missing in response from {url}")]
    MissingTokenField { field: String, url: String },

    /// Business request answered with a status of 400 or above.
    #[error("Unexpected response (HTTP {status}) from {url}: {body}")]
    UnexpectedResponse {
        status: u16,
        body: String,
        url: String,
    },

    /// WebHDFS redirect handler invoked more often than allowed.
    #[error("Exceeded allowed redirection number ({limit})")]
    RedirectionLimitExceeded { limit: u32 },

    /// SSH tunnel could not be established.
    #[error("SSH tunnel failed: {message}")]
    Tunnel { message: String },

    /// Network connectivity or request failed.
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization or deserialization failed.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// File system or process operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request parameters are invalid.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Error category for unified error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Authentication failures and unusable token responses
    Authorization,
    /// Configuration, parsing, or setup errors
    Configuration,
    /// Network errors that may succeed on retry
    Transient,
    /// The service answered with an error status
    Response,
    /// WebHDFS redirect bound or tunnel failures
    Redirection,
    /// Internal errors (IO, JSON)
    Internal,
}

impl Error {
    pub fn auth(message: impl Into<String>) -> Self {
        Error::Auth {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Auth { .. } | Error::MissingTokenField { .. } => ErrorCategory::Authorization,
            Error::UnexpectedResponse {
                status: 401 | 403, ..
            } => ErrorCategory::Authorization,

            Error::Config(_)
            | Error::UnsupportedClientType { .. }
            | Error::InvalidRequest(_) => ErrorCategory::Configuration,

            Error::Network(_) => ErrorCategory::Transient,
            Error::UnexpectedResponse {
                status: 500..=599, ..
            } => ErrorCategory::Transient,

            Error::UnexpectedResponse { .. } => ErrorCategory::Response,

            Error::RedirectionLimitExceeded { .. } | Error::Tunnel { .. } => {
                ErrorCategory::Redirection
            }

            Error::Io(_) | Error::Json(_) => ErrorCategory::Internal,
        }
    }

    pub fn is_authorization_error(&self) -> bool {
        self.category() == ErrorCategory::Authorization
    }

    pub fn is_configuration_error(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Transient
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedResponse { status: 401, .. } | Error::Auth { .. }
        )
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::UnexpectedResponse { status, .. } => Some(*status),
            Error::Auth { status, .. } => *status,
            Error::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Response body carried by the error, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            Error::UnexpectedResponse { body, .. } => Some(body),
            Error::Auth { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnexpectedResponse {
            status: 404,
            body: "not found".to_string(),
            url: "https://api.example/apps".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("404"));
        assert!(message.contains("https://api.example/apps"));

        let err = Error::Auth {
            message: "login at https://console.example/login.do failed".to_string(),
            status: Some(403),
            body: None,
        };
        assert!(err.to_string().contains("(HTTP 403)"));
        assert!(!Error::auth("bad").to_string().contains("HTTP"));
    }

    #[test]
    fn test_error_is_retryable() {
        let server_error = Error::UnexpectedResponse {
            status: 503,
            body: String::new(),
            url: String::new(),
        };
        assert!(server_error.is_retryable());

        assert!(!Error::auth("Invalid token").is_retryable());
        assert!(!Error::RedirectionLimitExceeded { limit: 3 }.is_retryable());
    }

    #[test]
    fn test_error_categories() {
        let missing = Error::MissingTokenField {
            field: "access_token".to_string(),
            url: "http://uaa.example/oauth/token".to_string(),
        };
        assert!(missing.is_authorization_error());

        let unsupported = Error::UnsupportedClientType {
            name: "Undefined".to_string(),
        };
        assert!(unsupported.is_configuration_error());

        let tunnel = Error::Tunnel {
            message: "refused".to_string(),
        };
        assert_eq!(tunnel.category(), ErrorCategory::Redirection);
    }

    #[test]
    fn test_status_and_body() {
        let err = Error::UnexpectedResponse {
            status: 409,
            body: "conflict".to_string(),
            url: String::new(),
        };
        assert_eq!(err.status_code(), Some(409));
        assert_eq!(err.body(), Some("conflict"));
        assert_eq!(Error::auth("x").status_code(), None);
    }

    #[test]
    fn test_config_error_conversion() {
        let config_err = ConfigError::NotFound {
            key: "PT_TAP_DOMAIN".to_string(),
        };
        let err: Error = config_err.into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.is_configuration_error());
    }
}
