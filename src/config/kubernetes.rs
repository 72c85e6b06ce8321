//! Kubernetes API client configuration from a kubeconfig file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::client::{ClientConfiguration, ClientType};
use super::network::{ClientCertConfig, ProxyConfig};
use super::{ConfigError, ConfigResult};

const DEFAULT_REST_PREFIX: &str = "api";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KubeConfig {
    api_version: String,
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    users: Vec<NamedUser>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    cluster: Cluster,
}

#[derive(Debug, Deserialize)]
struct Cluster {
    server: String,
}

#[derive(Debug, Deserialize)]
struct NamedUser {
    name: String,
    user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct User {
    client_certificate: Option<String>,
    client_key: Option<String>,
}

/// Builds certificate-authenticated `NoAuth` configurations for the
/// Kubernetes API described by a kubeconfig.
#[derive(Debug, Clone)]
pub struct KubernetesConfigurationProvider {
    server: String,
    api_version: String,
    certificate: ClientCertConfig,
    proxies: Option<ProxyConfig>,
}

impl KubernetesConfigurationProvider {
    /// Load the kubeconfig at `path` and select the credentials of `username`.
    pub fn from_kubeconfig(path: impl AsRef<Path>, username: &str) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_yaml(&content, base_dir, username)
    }

    /// Parse kubeconfig content; relative certificate paths resolve against `base_dir`.
    pub fn from_yaml(content: &str, base_dir: &Path, username: &str) -> ConfigResult<Self> {
        let kube_config: KubeConfig = serde_yaml_bw::from_str(content)?;

        let server = kube_config
            .clusters
            .first()
            .map(|c| c.cluster.server.trim_end_matches('/').to_string())
            .ok_or_else(|| ConfigError::NotFound {
                key: "clusters[0].cluster.server".into(),
            })?;

        let user = kube_config
            .users
            .iter()
            .find(|u| u.name == username)
            .ok_or_else(|| ConfigError::NotFound {
                key: format!("users[name={}]", username),
            })?;

        let cert_path = resolve_file(base_dir, user.user.client_certificate.as_deref(), "client-certificate")?;
        let key_path = resolve_file(base_dir, user.user.client_key.as_deref(), "client-key")?;

        Ok(Self {
            server,
            api_version: kube_config.api_version,
            certificate: ClientCertConfig::new(cert_path, key_path),
            proxies: None,
        })
    }

    pub fn with_proxies(mut self, proxies: ProxyConfig) -> Self {
        self.proxies = Some(proxies);
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn certificate(&self) -> &ClientCertConfig {
        &self.certificate
    }

    /// Configuration for `<server>/<rest_prefix>/<api_version>`.
    ///
    /// `None` arguments fall back to `api` and the kubeconfig's `apiVersion`.
    pub fn get(
        &self,
        rest_prefix: Option<&str>,
        api_version: Option<&str>,
    ) -> ConfigResult<ClientConfiguration> {
        let url = format!(
            "{}/{}/{}",
            self.server,
            rest_prefix.unwrap_or(DEFAULT_REST_PREFIX),
            api_version.unwrap_or(&self.api_version)
        );

        let mut configuration = ClientConfiguration::new(ClientType::NoAuth, url)?
            .with_certificate(self.certificate.clone());
        if let Some(ref proxies) = self.proxies {
            configuration = configuration.with_proxies(proxies.clone());
        }
        Ok(configuration)
    }
}

fn resolve_file(base_dir: &Path, value: Option<&str>, key: &str) -> ConfigResult<PathBuf> {
    let value = value.ok_or_else(|| ConfigError::NotFound {
        key: format!("user.{}", key),
    })?;
    let path = base_dir.join(value);
    if !path.is_file() {
        return Err(ConfigError::InvalidValue {
            key: format!("user.{}", key),
            message: format!("No such file {}", path.display()),
        });
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
clusters:
  - name: platform
    cluster:
      server: https://10.0.0.1:6443/
users:
  - name: viewer
    user:
      token: abc
  - name: admin
    user:
      client-certificate: admin.crt
      client-key: admin.key
"#;

    fn kube_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("admin.crt"), "cert").unwrap();
        std::fs::write(dir.path().join("admin.key"), "key").unwrap();
        std::fs::write(dir.path().join("config"), KUBECONFIG).unwrap();
        dir
    }

    #[test]
    fn test_from_kubeconfig() {
        let dir = kube_dir();
        let provider =
            KubernetesConfigurationProvider::from_kubeconfig(dir.path().join("config"), "admin")
                .unwrap();

        assert_eq!(provider.server(), "https://10.0.0.1:6443");
        assert_eq!(provider.api_version(), "v1");
        assert_eq!(provider.certificate().cert_path, dir.path().join("admin.crt"));
    }

    #[test]
    fn test_get_builds_no_auth_configuration() {
        let dir = kube_dir();
        let provider =
            KubernetesConfigurationProvider::from_kubeconfig(dir.path().join("config"), "admin")
                .unwrap()
                .with_proxies(ProxyConfig::socks("socks5://localhost:5555"));

        let configuration = provider.get(None, None).unwrap();
        assert_eq!(configuration.client_type(), ClientType::NoAuth);
        assert_eq!(configuration.base_url(), "https://10.0.0.1:6443/api/v1");
        assert!(configuration.certificate().is_some());
        assert!(configuration.proxies().is_some());

        let configuration = provider.get(Some("apis"), Some("v2")).unwrap();
        assert_eq!(configuration.base_url(), "https://10.0.0.1:6443/apis/v2");
    }

    #[test]
    fn test_unknown_user() {
        let dir = kube_dir();
        let err =
            KubernetesConfigurationProvider::from_kubeconfig(dir.path().join("config"), "nobody")
                .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_user_without_certificate() {
        let dir = kube_dir();
        let err =
            KubernetesConfigurationProvider::from_kubeconfig(dir.path().join("config"), "viewer")
                .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn test_missing_certificate_file() {
        let dir = kube_dir();
        std::fs::remove_file(dir.path().join("admin.key")).unwrap();
        let err =
            KubernetesConfigurationProvider::from_kubeconfig(dir.path().join("config"), "admin")
                .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
