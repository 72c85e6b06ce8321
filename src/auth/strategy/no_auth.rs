//! Strategy for endpoints that need no authentication.

use async_trait::async_trait;

use super::AuthStrategy;
use crate::Result;
use crate::auth::AuthMaterial;
use crate::client::Session;

/// Always authenticated, attaches nothing.
#[derive(Debug)]
pub struct NoAuthStrategy {
    session: Session,
}

impl NoAuthStrategy {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl AuthStrategy for NoAuthStrategy {
    fn name(&self) -> &'static str {
        "no_auth"
    }

    async fn authenticated(&self) -> bool {
        true
    }

    async fn authenticate(&self) -> Result<AuthMaterial> {
        Ok(AuthMaterial::None)
    }

    async fn material(&self) -> AuthMaterial {
        AuthMaterial::None
    }

    fn session(&self) -> &Session {
        &self.session
    }
}
