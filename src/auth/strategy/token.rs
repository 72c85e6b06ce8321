//! Bearer token authentication strategies.

use std::fmt;

use async_trait::async_trait;
use chrono::Duration;
use reqwest::header::{ACCEPT, HeaderValue};
use secrecy::ExposeSecret;
use serde_json::Value;
use tokio::sync::RwLock;

use super::AuthStrategy;
use crate::auth::{AuthMaterial, Credentials, IssuedToken};
use crate::client::{RawResponse, Session, SessionRequest};
use crate::{Error, Result};

/// Local token lifetime in seconds, a few seconds under the issuer's 300s.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 298;

/// Subtracted from `expires_in` for client-credentials tokens.
pub const EXPIRES_IN_MARGIN_SECS: i64 = 5;

pub const TOKEN_FIELD: &str = "access_token";

/// OAuth client used by Cloud Foundry password grants.
const CF_CLIENT_ID: &str = "cf";

/// Token issuer handshake variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenFlavor {
    /// Password grant against the Cloud Foundry login server.
    CloudFoundry,
    /// Password grant against UAA.
    UaaPassword,
    /// Client-credentials grant against UAA; lifetime comes from `expires_in`.
    UaaClientCredentials,
    /// Service login endpoint queried with Basic credentials.
    KubernetesService,
}

impl TokenFlavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenFlavor::CloudFoundry => "cloud_foundry",
            TokenFlavor::UaaPassword => "uaa_password",
            TokenFlavor::UaaClientCredentials => "uaa_client_credentials",
            TokenFlavor::KubernetesService => "kubernetes_service",
        }
    }
}

impl fmt::Display for TokenFlavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bearer token strategy with local expiry tracking.
#[derive(Debug)]
pub struct TokenStrategy {
    session: Session,
    flavor: TokenFlavor,
    token_url: String,
    credentials: Credentials,
    token: RwLock<Option<IssuedToken>>,
}

impl TokenStrategy {
    pub fn new(
        session: Session,
        flavor: TokenFlavor,
        token_url: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            session,
            flavor,
            token_url: token_url.into(),
            credentials,
            token: RwLock::new(None),
        }
    }

    pub fn flavor(&self) -> TokenFlavor {
        self.flavor
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    fn token_request(&self) -> (SessionRequest, AuthMaterial) {
        let username = self.credentials.username.as_str();
        let password = self.credentials.password.expose_secret();
        let accept = HeaderValue::from_static("application/json");

        match self.flavor {
            TokenFlavor::CloudFoundry | TokenFlavor::UaaPassword => (
                SessionRequest::post(&self.token_url)
                    .header(ACCEPT, accept)
                    .form(vec![
                        ("username".to_string(), username.to_string()),
                        ("password".to_string(), password.to_string()),
                        ("grant_type".to_string(), "password".to_string()),
                    ]),
                AuthMaterial::basic(CF_CLIENT_ID, ""),
            ),
            TokenFlavor::UaaClientCredentials => (
                SessionRequest::post(&self.token_url)
                    .header(ACCEPT, accept)
                    .form(vec![(
                        "grant_type".to_string(),
                        "client_credentials".to_string(),
                    )]),
                AuthMaterial::basic(username, password),
            ),
            TokenFlavor::KubernetesService => (
                SessionRequest::get(&self.token_url).header(ACCEPT, accept),
                AuthMaterial::basic(username, password),
            ),
        }
    }

    fn parse_token(&self, response: &RawResponse) -> Result<IssuedToken> {
        // A body that is not JSON cannot carry the field either.
        let body: Value = response.json().unwrap_or(Value::Null);
        let access_token = body
            .get(TOKEN_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MissingTokenField {
                field: TOKEN_FIELD.to_string(),
                url: self.token_url.clone(),
            })?;

        let lifetime = match self.flavor {
            TokenFlavor::UaaClientCredentials => body
                .get("expires_in")
                .and_then(Value::as_i64)
                .map(|secs| secs - EXPIRES_IN_MARGIN_SECS)
                .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS),
            _ => DEFAULT_TOKEN_LIFETIME_SECS,
        };

        Ok(IssuedToken::new(access_token, Duration::seconds(lifetime)))
    }
}

#[async_trait]
impl AuthStrategy for TokenStrategy {
    fn name(&self) -> &'static str {
        match self.flavor {
            TokenFlavor::CloudFoundry => "bearer_token_cf",
            TokenFlavor::UaaPassword => "bearer_token_uaa",
            TokenFlavor::UaaClientCredentials => "uaa_client_credentials",
            TokenFlavor::KubernetesService => "bearer_token_k8s",
        }
    }

    async fn authenticated(&self) -> bool {
        self.token
            .read()
            .await
            .as_ref()
            .is_some_and(|token| !token.is_expired())
    }

    async fn authenticate(&self) -> Result<AuthMaterial> {
        let (request, material) = self.token_request();
        let request = request.describe("Retrieve token");
        let response = self.session.send_raw(request, &material).await?;

        if !response.is_ok() {
            tracing::warn!(
                flavor = %self.flavor,
                url = %self.token_url,
                status = response.status().as_u16(),
                "token request failed"
            );
            return Err(Error::Auth {
                message: format!("token request to {} failed", self.token_url),
                status: Some(response.status().as_u16()),
                body: Some(response.text().into_owned()),
            });
        }

        let token = self.parse_token(&response)?;
        let material = AuthMaterial::bearer(token.access_token());
        tracing::debug!(
            flavor = %self.flavor,
            lifetime_secs = token.lifetime().num_seconds(),
            "token retrieved"
        );
        *self.token.write().await = Some(token);
        Ok(material)
    }

    async fn material(&self) -> AuthMaterial {
        match self.token.read().await.as_ref() {
            Some(token) => AuthMaterial::bearer(token.access_token()),
            None => AuthMaterial::None,
        }
    }

    fn session(&self) -> &Session {
        &self.session
    }
}
