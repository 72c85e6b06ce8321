//! Authenticated platform HTTP clients.
//!
//! A [`Client`] pairs one authentication strategy with its session. Every
//! [`Client::request`] first makes sure the strategy is authenticated, then
//! sends the request and re-authenticates once if the service answers with
//! the session-expiry sentinel.

mod registry;
mod request;
mod response;
mod session;

pub use registry::ClientRegistry;
pub use request::{ApiRequest, FilePart, RequestBody};
pub use response::{Payload, RawResponse, SESSION_EXPIRED};
pub use session::{Session, SessionMode, SessionOptions, SessionRequest};

use std::fmt;

use serde_json::Value;
use tracing::Instrument;

use crate::Result;
use crate::auth::{AuthStrategy, ClientAuth};
use crate::config::{ClientConfiguration, PlatformSettings};

/// Re-authentications allowed per request after a session-expiry sentinel.
pub const SESSION_EXPIRED_RETRIES: u32 = 1;

pub struct Client {
    configuration: ClientConfiguration,
    auth: ClientAuth,
}

impl Client {
    pub fn new(configuration: ClientConfiguration, auth: ClientAuth) -> Self {
        Self {
            configuration,
            auth,
        }
    }

    /// Build the strategy and session for `configuration` without
    /// contacting any endpoint.
    pub async fn from_configuration(
        configuration: ClientConfiguration,
        settings: &PlatformSettings,
    ) -> Result<Self> {
        let auth = ClientAuth::from_configuration(&configuration, settings).await?;
        Ok(Self::new(configuration, auth))
    }

    pub fn configuration(&self) -> &ClientConfiguration {
        &self.configuration
    }

    pub fn base_url(&self) -> &str {
        self.configuration.base_url()
    }

    pub fn auth(&self) -> &ClientAuth {
        &self.auth
    }

    pub fn session(&self) -> &Session {
        self.auth.session()
    }

    /// Absolute URL for `path`; absolute URLs pass through unchanged.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.base_url().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }

    pub async fn request(&self, request: ApiRequest) -> Result<Payload> {
        self.ensure_authenticated().await?;
        self.perform_with_retry(&request, SESSION_EXPIRED_RETRIES).await
    }

    pub async fn get(&self, path: &str) -> Result<Payload> {
        self.request(ApiRequest::get(path)).await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> Result<Payload> {
        self.request(ApiRequest::post(path).json(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Payload> {
        self.request(ApiRequest::delete(path)).await
    }

    /// Authenticate unless the strategy reports valid material.
    pub async fn ensure_authenticated(&self) -> Result<()> {
        if !self.auth.authenticated().await {
            tracing::debug!(
                strategy = self.auth.name(),
                base_url = %self.base_url(),
                "authenticating before request"
            );
            self.authenticate().await?;
        }
        Ok(())
    }

    async fn authenticate(&self) -> Result<()> {
        let span = self.session().spans().authenticate_span(self.auth.name());
        self.auth.authenticate().instrument(span).await?;
        Ok(())
    }

    /// Send `request`, re-authenticating and resending at most `retries`
    /// times while the response is the session-expiry sentinel. The last
    /// response is returned as is.
    pub async fn perform_with_retry(&self, request: &ApiRequest, retries: u32) -> Result<Payload> {
        let mut remaining = retries;
        loop {
            let payload = self.perform(request).await?;
            if !payload.is_session_expired() || remaining == 0 {
                return Ok(payload);
            }

            remaining -= 1;
            tracing::info!(
                strategy = self.auth.name(),
                path = %request.path,
                "session expired, re-authenticating"
            );
            self.authenticate().await?;
        }
    }

    async fn perform(&self, request: &ApiRequest) -> Result<Payload> {
        let material = self.auth.material().await;
        let request = request.clone();
        let mut session_request = SessionRequest::new(request.method, self.url(&request.path))
            .headers(request.headers)
            .params(request.params)
            .body(request.body)
            .raw(request.raw_response)
            .timeout(request.timeout);
        if let Some(description) = request.description {
            session_request = session_request.describe(description);
        }
        self.session().request(session_request, &material).await
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("client_type", &self.configuration.client_type())
            .field("base_url", &self.configuration.base_url())
            .field("strategy", &self.auth.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientType;

    async fn client(base_url: &str) -> Client {
        let configuration = ClientConfiguration::new(ClientType::NoAuth, base_url).unwrap();
        Client::from_configuration(configuration, &PlatformSettings::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_url_join() {
        let client = client("https://api.example/v2/").await;
        assert_eq!(client.url("apps"), "https://api.example/v2/apps");
        assert_eq!(client.url("/apps"), "https://api.example/v2/apps");
        assert_eq!(client.url(""), "https://api.example/v2");
        assert_eq!(client.url("http://other/x"), "http://other/x");
    }

    #[tokio::test]
    async fn test_debug() {
        let client = client("https://api.example").await;
        let debug = format!("{:?}", client);
        assert!(debug.contains("no_auth"));
        assert!(debug.contains("https://api.example"));
    }
}
