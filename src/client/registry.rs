//! Process-wide cache of authenticated clients.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use super::{Client, Payload};
use crate::Result;
use crate::config::{ClientConfiguration, PlatformSettings};
use crate::tunnel::{SshTunnelOpener, TunnelOpener};
use crate::webhdfs::{WebhdfsRedirect, WebhdfsRedirector};

/// One [`Client`] per configuration identity.
///
/// Entries live until removed or cleared. Clients are built on first `get`
/// but authenticate on their first request.
pub struct ClientRegistry {
    settings: PlatformSettings,
    clients: DashMap<ClientConfiguration, Arc<Client>>,
    redirector: WebhdfsRedirector,
}

impl ClientRegistry {
    pub fn new(settings: PlatformSettings) -> Self {
        let opener = Arc::new(SshTunnelOpener::new());
        Self {
            redirector: WebhdfsRedirector::new(opener),
            settings,
            clients: DashMap::new(),
        }
    }

    /// Replace the tunnel opener used for WebHDFS redirects.
    pub fn with_tunnel_opener(mut self, opener: Arc<dyn TunnelOpener>) -> Self {
        self.redirector = WebhdfsRedirector::new(opener);
        self
    }

    pub fn settings(&self) -> &PlatformSettings {
        &self.settings
    }

    pub fn redirector(&self) -> &WebhdfsRedirector {
        &self.redirector
    }

    /// Cached client for `configuration`, built on a miss.
    ///
    /// Concurrent misses for the same identity may each build a client; only
    /// the first inserted is kept and returned to everyone.
    pub async fn get(&self, configuration: &ClientConfiguration) -> Result<Arc<Client>> {
        if let Some(client) = self.clients.get(configuration) {
            return Ok(Arc::clone(client.value()));
        }

        let client = Client::from_configuration(configuration.clone(), &self.settings).await?;
        tracing::debug!(
            client_type = %configuration.client_type(),
            base_url = %configuration.base_url(),
            "created client"
        );

        let entry = self
            .clients
            .entry(configuration.clone())
            .or_insert_with(|| Arc::new(client));
        Ok(Arc::clone(entry.value()))
    }

    /// Evict `configuration`; the next `get` builds a fresh client.
    pub fn remove(&self, configuration: &ClientConfiguration) -> Option<Arc<Client>> {
        self.clients.remove(configuration).map(|(_, client)| client)
    }

    pub fn contains(&self, configuration: &ClientConfiguration) -> bool {
        self.clients.contains_key(configuration)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn clear(&self) {
        self.clients.clear();
    }

    /// Follow a WebHDFS `307` through an SSH tunnel.
    pub async fn follow_webhdfs_redirect(&self, redirect: WebhdfsRedirect) -> Result<Payload> {
        self.redirector.redirection_handler(self, redirect).await
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("clients", &self.clients.len())
            .field("redirector", &self.redirector)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientType;

    fn configuration(password: &str) -> ClientConfiguration {
        ClientConfiguration::new(ClientType::HttpBasic, "http://localhost:9")
            .unwrap()
            .with_credentials("user", password)
    }

    #[tokio::test]
    async fn test_same_identity_same_client() {
        let registry = ClientRegistry::new(PlatformSettings::new());
        let a = registry.get(&configuration("p")).await.unwrap();
        let b = registry.get(&configuration("p")).await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_different_identity_different_client() {
        let registry = ClientRegistry::new(PlatformSettings::new());
        let a = registry.get(&configuration("p")).await.unwrap();
        let b = registry.get(&configuration("rotated")).await.unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let registry = ClientRegistry::new(PlatformSettings::new());
        let config = configuration("p");
        let first = registry.get(&config).await.unwrap();

        assert!(registry.remove(&config).is_some());
        assert!(!registry.contains(&config));

        let second = registry.get(&config).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        registry.clear();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_failed_build_is_not_cached() {
        let registry = ClientRegistry::new(PlatformSettings::new());
        let config = ClientConfiguration::new(ClientType::HttpBasic, "http://localhost:9").unwrap();

        assert!(registry.get(&config).await.is_err());
        assert!(registry.is_empty());
    }
}
