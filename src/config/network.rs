//! Network configuration for proxy and client certificate settings.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Proxy servers keyed by URL scheme.
#[derive(Clone, Debug, Default)]
pub struct ProxyConfig {
    /// HTTPS proxy URL
    pub https: Option<String>,
    /// HTTP proxy URL
    pub http: Option<String>,
}

/// Client certificate configuration for mTLS.
#[derive(Clone, Debug)]
pub struct ClientCertConfig {
    /// Path to client certificate (PEM)
    pub cert_path: PathBuf,
    /// Path to client private key (PEM)
    pub key_path: PathBuf,
}

impl ProxyConfig {
    /// Create with HTTPS proxy.
    pub fn https(url: impl Into<String>) -> Self {
        Self {
            https: Some(url.into()),
            http: None,
        }
    }

    /// Add HTTP proxy.
    pub fn http(mut self, url: impl Into<String>) -> Self {
        self.http = Some(url.into());
        self
    }

    /// Route both schemes through one proxy, e.g. `socks5://localhost:5555`.
    pub fn socks(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            https: Some(url.clone()),
            http: Some(url),
        }
    }

    /// Build from a scheme → proxy URL mapping. Unknown schemes are ignored.
    pub fn from_map(map: &BTreeMap<String, String>) -> Self {
        Self {
            https: map.get("https").cloned(),
            http: map.get("http").cloned(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.https.is_none() && self.http.is_none()
    }

    /// Apply to reqwest ClientBuilder.
    pub fn apply_to_builder(
        &self,
        mut builder: reqwest::ClientBuilder,
    ) -> reqwest::Result<reqwest::ClientBuilder> {
        if let Some(ref https_url) = self.https {
            builder = builder.proxy(reqwest::Proxy::https(https_url)?);
        }
        if let Some(ref http_url) = self.http {
            builder = builder.proxy(reqwest::Proxy::http(http_url)?);
        }
        Ok(builder)
    }
}

impl ClientCertConfig {
    /// Create with certificate paths.
    pub fn new(cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        }
    }

    /// Read both PEM files and combine them into an identity.
    pub async fn identity(&self) -> Result<reqwest::Identity, std::io::Error> {
        let cert_data = tokio::fs::read(&self.cert_path).await?;
        let key_data = tokio::fs::read(&self.key_path).await?;

        let mut pem_data = cert_data;
        pem_data.extend_from_slice(b"\n");
        pem_data.extend_from_slice(&key_data);

        reqwest::Identity::from_pem(&pem_data)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Apply to reqwest ClientBuilder.
    pub async fn apply_to_builder(
        &self,
        builder: reqwest::ClientBuilder,
    ) -> Result<reqwest::ClientBuilder, std::io::Error> {
        Ok(builder.identity(self.identity().await?))
    }
}
