//! Client configuration value object.
//!
//! A [`ClientConfiguration`] names one target client: which authentication
//! protocol it speaks, where it lives, and who it authenticates as. Two
//! configurations with the same `(client_type, base_url, username, password)`
//! are the same client and share one cache entry in the registry.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use secrecy::{ExposeSecret, SecretString};

use super::network::{ClientCertConfig, ProxyConfig};
use super::{ConfigError, ConfigResult};
use crate::Error;

/// Authentication protocol family of a target client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientType {
    /// No authentication material attached.
    NoAuth,
    /// Static HTTP Basic credentials.
    HttpBasic,
    /// Cookie session established through a login form with a CSRF field.
    LoginPage,
    /// Cloud Foundry password-grant bearer token.
    BearerTokenCf,
    /// UAA password-grant bearer token.
    BearerTokenUaa,
    /// UAA client-credentials bearer token.
    UaaClientCredentials,
    /// Kubernetes API service bearer token.
    BearerTokenK8s,
    /// Unauthenticated WebHDFS endpoint with redirect interception.
    Webhdfs,
}

impl ClientType {
    pub const ALL: [ClientType; 8] = [
        ClientType::NoAuth,
        ClientType::HttpBasic,
        ClientType::LoginPage,
        ClientType::BearerTokenCf,
        ClientType::BearerTokenUaa,
        ClientType::UaaClientCredentials,
        ClientType::BearerTokenK8s,
        ClientType::Webhdfs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClientType::NoAuth => "no_auth",
            ClientType::HttpBasic => "http_basic",
            ClientType::LoginPage => "login_page",
            ClientType::BearerTokenCf => "bearer_token_cf",
            ClientType::BearerTokenUaa => "bearer_token_uaa",
            ClientType::UaaClientCredentials => "uaa_client_credentials",
            ClientType::BearerTokenK8s => "bearer_token_k8s",
            ClientType::Webhdfs => "webhdfs",
        }
    }

    /// Whether this client type authenticates with username and password.
    pub fn requires_credentials(&self) -> bool {
        !matches!(self, ClientType::NoAuth | ClientType::Webhdfs)
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClientType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ClientType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| Error::UnsupportedClientType {
                name: s.to_string(),
            })
    }
}

/// Immutable description of a target client.
#[derive(Clone, Debug)]
pub struct ClientConfiguration {
    client_type: ClientType,
    base_url: String,
    username: Option<String>,
    password: Option<SecretString>,
    proxies: Option<ProxyConfig>,
    certificate: Option<ClientCertConfig>,
}

impl ClientConfiguration {
    /// Create a configuration; fails when `base_url` is empty.
    pub fn new(client_type: ClientType, base_url: impl Into<String>) -> ConfigResult<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(ConfigError::EmptyProperty {
                property: "base_url",
            });
        }

        Ok(Self {
            client_type,
            base_url,
            username: None,
            password: None,
            proxies: None,
            certificate: None,
        })
    }

    /// Create a configuration from a client type name, as found in settings files.
    pub fn parse(client_type: &str, base_url: impl Into<String>) -> crate::Result<Self> {
        if client_type.trim().is_empty() {
            return Err(ConfigError::EmptyProperty {
                property: "client_type",
            }
            .into());
        }
        let client_type = client_type.parse()?;
        Ok(Self::new(client_type, base_url)?)
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(SecretString::from(password.into()));
        self
    }

    pub fn with_proxies(mut self, proxies: ProxyConfig) -> Self {
        self.proxies = Some(proxies);
        self
    }

    pub fn with_certificate(mut self, certificate: ClientCertConfig) -> Self {
        self.certificate = Some(certificate);
        self
    }

    pub fn client_type(&self) -> ClientType {
        self.client_type
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&SecretString> {
        self.password.as_ref()
    }

    pub fn proxies(&self) -> Option<&ProxyConfig> {
        self.proxies.as_ref()
    }

    pub fn certificate(&self) -> Option<&ClientCertConfig> {
        self.certificate.as_ref()
    }

    /// Username and password, both non-empty.
    pub fn credentials(&self) -> ConfigResult<(&str, &SecretString)> {
        let username = self
            .username
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::EmptyProperty {
                property: "username",
            })?;
        let password = self
            .password
            .as_ref()
            .filter(|p| !p.expose_secret().is_empty())
            .ok_or(ConfigError::EmptyProperty {
                property: "password",
            })?;
        Ok((username, password))
    }

    fn identity(&self) -> (ClientType, &str, Option<&str>, Option<&str>) {
        (
            self.client_type,
            &self.base_url,
            self.username.as_deref(),
            self.password.as_ref().map(|p| p.expose_secret()),
        )
    }
}

impl PartialEq for ClientConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for ClientConfiguration {}

impl Hash for ClientConfiguration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}
