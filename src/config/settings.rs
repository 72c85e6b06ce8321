//! Process-level platform settings.
//!
//! Everything a registry needs beyond the per-client [`ClientConfiguration`]:
//! token endpoints, TLS validation, log shaping, and the jump host that
//! WebHDFS tunnels go through. Endpoint URLs default to hosts under the
//! platform domain and can each be overridden.
//!
//! [`ClientConfiguration`]: super::ClientConfiguration

use std::path::PathBuf;
use std::time::Duration;

use super::env::EnvConfigProvider;
use super::{ConfigError, ConfigResult};
use crate::auth::TokenFlavor;
use crate::observability::LogBodyLimit;

/// Environment variable prefix for all settings.
pub const ENV_PREFIX: &str = "PT_";

/// Hidden form field carrying the login page CSRF token.
pub const DEFAULT_CSRF_FIELD: &str = "X-Uaa-Csrf";

pub const DEFAULT_JUMPBOX_USERNAME: &str = "ubuntu";

/// SSH jump host used to reach private WebHDFS data nodes.
#[derive(Clone, Debug)]
pub struct JumpHostSettings {
    /// Jump host name; `jump.<domain>` when unset.
    pub hostname: Option<String>,
    pub username: String,
    /// Private key passed to `ssh -i`.
    pub identity_file: Option<PathBuf>,
}

impl Default for JumpHostSettings {
    fn default() -> Self {
        Self {
            hostname: None,
            username: DEFAULT_JUMPBOX_USERNAME.to_string(),
            identity_file: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PlatformSettings {
    /// Platform domain, e.g. `platform.example.com`.
    pub domain: Option<String>,
    /// Verify server TLS certificates.
    pub ssl_validation: bool,
    pub cf_token_url: Option<String>,
    pub uaa_token_url: Option<String>,
    pub k8s_token_url: Option<String>,
    pub csrf_field: String,
    pub log_body_limit: LogBodyLimit,
    /// Default timeout applied to every transport call.
    pub request_timeout: Option<Duration>,
    pub jump_host: JumpHostSettings,
}

impl Default for PlatformSettings {
    fn default() -> Self {
        Self {
            domain: None,
            ssl_validation: false,
            cf_token_url: None,
            uaa_token_url: None,
            k8s_token_url: None,
            csrf_field: DEFAULT_CSRF_FIELD.to_string(),
            log_body_limit: LogBodyLimit::default(),
            request_timeout: None,
            jump_host: JumpHostSettings::default(),
        }
    }
}

impl PlatformSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `PT_`-prefixed environment variables on top of the defaults.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_provider(&EnvConfigProvider::prefixed(ENV_PREFIX))
    }

    pub fn from_provider(env: &EnvConfigProvider) -> ConfigResult<Self> {
        let mut settings = Self::default();

        settings.domain = env.get_raw("tap.domain")?;
        if let Some(ssl) = env.get_bool("ssl.validation")? {
            settings.ssl_validation = ssl;
        }
        settings.cf_token_url = env.get_raw("cf.oauth.token.url")?;
        settings.uaa_token_url = env.get_raw("uaa.oauth.token.url")?;
        settings.k8s_token_url = env.get_raw("ng.as.oauth.token.url")?;
        if let Some(limit) = env.get_parsed::<i64>("logged.response.body.length")? {
            settings.log_body_limit = LogBodyLimit::new(limit);
        }
        settings.request_timeout = env
            .get_parsed::<u64>("request.timeout.secs")?
            .map(Duration::from_secs);

        settings.jump_host.hostname = env.get_raw("jumpbox.hostname")?;
        if let Some(username) = env.get_raw("jumpbox.username")? {
            settings.jump_host.username = username;
        }
        settings.jump_host.identity_file = env.get_raw("jumpbox.key.path")?.map(PathBuf::from);

        Ok(settings)
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_ssl_validation(mut self, enabled: bool) -> Self {
        self.ssl_validation = enabled;
        self
    }

    pub fn with_token_url(mut self, flavor: TokenFlavor, url: impl Into<String>) -> Self {
        let url = Some(url.into());
        match flavor {
            TokenFlavor::CloudFoundry => self.cf_token_url = url,
            TokenFlavor::UaaPassword | TokenFlavor::UaaClientCredentials => {
                self.uaa_token_url = url
            }
            TokenFlavor::KubernetesService => self.k8s_token_url = url,
        }
        self
    }

    pub fn with_log_body_limit(mut self, limit: LogBodyLimit) -> Self {
        self.log_body_limit = limit;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn with_jump_host(mut self, jump_host: JumpHostSettings) -> Self {
        self.jump_host = jump_host;
        self
    }

    /// Token endpoint for a bearer-token flavor.
    pub fn token_url(&self, flavor: TokenFlavor) -> ConfigResult<String> {
        let explicit = match flavor {
            TokenFlavor::CloudFoundry => &self.cf_token_url,
            TokenFlavor::UaaPassword | TokenFlavor::UaaClientCredentials => &self.uaa_token_url,
            TokenFlavor::KubernetesService => &self.k8s_token_url,
        };
        if let Some(url) = explicit {
            return Ok(url.clone());
        }

        let domain = self.require_domain()?;
        Ok(match flavor {
            TokenFlavor::CloudFoundry => format!("https://login.{}/oauth/token", domain),
            TokenFlavor::UaaPassword | TokenFlavor::UaaClientCredentials => {
                format!("http://uaa.{}/oauth/token", domain)
            }
            TokenFlavor::KubernetesService => format!("http://api.{}/api/v1/login", domain),
        })
    }

    /// Jump host name, derived from the domain when not set explicitly.
    pub fn jump_hostname(&self) -> ConfigResult<String> {
        match &self.jump_host.hostname {
            Some(hostname) => Ok(hostname.clone()),
            None => Ok(format!("jump.{}", self.require_domain()?)),
        }
    }

    fn require_domain(&self) -> ConfigResult<&str> {
        self.domain.as_deref().ok_or_else(|| ConfigError::NotFound {
            key: format!("{}TAP_DOMAIN", ENV_PREFIX),
        })
    }
}
