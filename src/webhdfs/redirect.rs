//! Following WebHDFS data-node redirects through SSH tunnels.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use reqwest::Method;
use url::Url;

use super::{TUNNEL_LOCAL_HOST, TUNNEL_LOCAL_PORT, webhdfs_url};
use crate::client::{ApiRequest, ClientRegistry, Payload, RequestBody};
use crate::config::{ClientConfiguration, ClientType};
use crate::tunnel::{Tunnel, TunnelOpener, TunnelSpec};
use crate::{Error, Result};

/// Redirect-handler invocations allowed over a registry's lifetime.
pub const ALLOWED_REDIRECTION_LIMIT: u32 = 3;

/// Counts redirect-handler invocations against a fixed bound.
///
/// The count is shared by every caller of one redirector and never resets;
/// it guards against redirect loops across a whole run.
#[derive(Debug)]
pub struct RedirectionCounter {
    calls: AtomicU32,
    limit: u32,
}

impl RedirectionCounter {
    pub fn new(limit: u32) -> Self {
        Self {
            calls: AtomicU32::new(0),
            limit,
        }
    }

    /// Record one invocation; fails once more than `limit` were recorded.
    pub fn admit(&self) -> Result<u32> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        if call > self.limit {
            return Err(Error::RedirectionLimitExceeded { limit: self.limit });
        }
        Ok(call)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

impl Default for RedirectionCounter {
    fn default() -> Self {
        Self::new(ALLOWED_REDIRECTION_LIMIT)
    }
}

/// Host and optional port of a redirect `Location`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectLocation {
    pub host: String,
    pub port: Option<u16>,
}

impl RedirectLocation {
    pub fn parse(location: &str) -> Result<Self> {
        let url = Url::parse(location).map_err(|e| {
            Error::InvalidRequest(format!("invalid redirect location {}: {}", location, e))
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::InvalidRequest(format!("redirect location without host: {}", location)))?;
        Ok(Self {
            host: host.to_string(),
            port: url.port(),
        })
    }
}

/// A request answered with `307`, plus the `Location` it was sent to.
#[derive(Clone, Debug)]
pub struct WebhdfsRedirect {
    pub method: Method,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub body: RequestBody,
    pub location: String,
}

impl WebhdfsRedirect {
    pub fn new(method: Method, path: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: RequestBody::Empty,
            location: location.into(),
        }
    }

    pub fn params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }
}

/// Re-issues redirected WebHDFS requests through a tunnel to the data node.
pub struct WebhdfsRedirector {
    counter: RedirectionCounter,
    opener: Arc<dyn TunnelOpener>,
    local_host: String,
    default_port: u16,
}

impl WebhdfsRedirector {
    pub fn new(opener: Arc<dyn TunnelOpener>) -> Self {
        Self {
            counter: RedirectionCounter::default(),
            opener,
            local_host: TUNNEL_LOCAL_HOST.to_string(),
            default_port: TUNNEL_LOCAL_PORT,
        }
    }

    pub fn counter(&self) -> &RedirectionCounter {
        &self.counter
    }

    /// Tunnel to the redirect target, resend the request there and close
    /// the tunnel whatever the outcome.
    ///
    /// The counter is checked before anything else, so a call over the
    /// limit touches neither the network nor a tunnel.
    pub async fn redirection_handler(
        &self,
        registry: &ClientRegistry,
        redirect: WebhdfsRedirect,
    ) -> Result<Payload> {
        let call = self.counter.admit()?;

        let target = RedirectLocation::parse(&redirect.location)?;
        let port = target.port.unwrap_or(self.default_port);
        let settings = registry.settings();
        let spec = TunnelSpec {
            local_port: port,
            remote_host: target.host,
            remote_port: port,
            jump_host: settings.jump_hostname()?,
            jump_user: settings.jump_host.username.clone(),
            identity_file: settings.jump_host.identity_file.clone(),
        };
        tracing::info!(
            call,
            limit = self.counter.limit(),
            location = %redirect.location,
            "following webhdfs redirect"
        );

        let mut tunnel = self.opener.open(spec);
        let result = self.through_tunnel(registry, tunnel.as_mut(), redirect, port).await;
        if let Err(e) = tunnel.disconnect().await {
            tracing::warn!(error = %e, "failed to close webhdfs tunnel");
        }
        result
    }

    async fn through_tunnel(
        &self,
        registry: &ClientRegistry,
        tunnel: &mut dyn Tunnel,
        redirect: WebhdfsRedirect,
        port: u16,
    ) -> Result<Payload> {
        tunnel.connect().await.map_err(into_tunnel_error)?;

        let configuration =
            ClientConfiguration::new(ClientType::Webhdfs, webhdfs_url(&self.local_host, port))?;
        let client = registry.get(&configuration).await?;

        let mut params = redirect.params;
        params.push(("namenoderpcaddress".to_string(), "nameservice1".to_string()));
        params.push(("offset".to_string(), "0".to_string()));

        let mut request = ApiRequest::new(redirect.method, redirect.path).params(params);
        request.body = redirect.body;

        client.request(request).await.map_err(|e| {
            if matches!(e, Error::Network(ref inner) if inner.is_connect()) {
                into_tunnel_error(e)
            } else {
                e
            }
        })
    }
}

fn into_tunnel_error(error: Error) -> Error {
    match error {
        Error::Tunnel { .. } => error,
        other => Error::Tunnel {
            message: other.to_string(),
        },
    }
}

impl fmt::Debug for WebhdfsRedirector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhdfsRedirector")
            .field("counter", &self.counter)
            .field("opener", &self.opener)
            .field("local_host", &self.local_host)
            .finish()
    }
}
