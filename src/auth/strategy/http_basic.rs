//! HTTP Basic authentication strategy.

use async_trait::async_trait;
use secrecy::ExposeSecret;

use super::AuthStrategy;
use crate::Result;
use crate::auth::{AuthMaterial, Credentials};
use crate::client::Session;

/// Static Basic credentials; no network handshake.
#[derive(Debug)]
pub struct HttpBasicStrategy {
    session: Session,
    material: AuthMaterial,
}

impl HttpBasicStrategy {
    pub fn new(session: Session, credentials: &Credentials) -> Self {
        let material = AuthMaterial::basic(
            &credentials.username,
            credentials.password.expose_secret(),
        );
        Self { session, material }
    }
}

#[async_trait]
impl AuthStrategy for HttpBasicStrategy {
    fn name(&self) -> &'static str {
        "http_basic"
    }

    async fn authenticated(&self) -> bool {
        true
    }

    async fn authenticate(&self) -> Result<AuthMaterial> {
        Ok(self.material.clone())
    }

    async fn material(&self) -> AuthMaterial {
        self.material.clone()
    }

    fn session(&self) -> &Session {
        &self.session
    }
}
