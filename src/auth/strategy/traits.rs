//! Authentication strategy trait.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::Result;
use crate::auth::AuthMaterial;
use crate::client::Session;

/// Authentication strategy interface.
///
/// `authenticated` and `authenticate` are separate steps. Callers sharing a
/// strategy may both observe `false` and both authenticate; the last token
/// written wins.
#[async_trait]
pub trait AuthStrategy: Send + Sync + Debug {
    /// Returns the strategy name for logging/debugging.
    fn name(&self) -> &'static str;

    /// Whether current material may be attached without authenticating first.
    async fn authenticated(&self) -> bool;

    /// Run the authentication handshake and return fresh material.
    async fn authenticate(&self) -> Result<AuthMaterial>;

    /// Material to attach to the next request.
    async fn material(&self) -> AuthMaterial;

    /// Session used for both the handshake and business requests.
    fn session(&self) -> &Session;
}
