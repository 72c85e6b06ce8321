//! SSH tunnels to hosts only reachable through a jump host.

mod ssh;

use std::fmt::Debug;
use std::path::PathBuf;

use async_trait::async_trait;

pub use ssh::{DEFAULT_CONNECT_TIMEOUT, SshTunnel, SshTunnelOpener};

use crate::Result;

/// Forward `localhost:local_port` to `remote_host:remote_port` via a jump host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TunnelSpec {
    pub local_port: u16,
    pub remote_host: String,
    pub remote_port: u16,
    pub jump_host: String,
    pub jump_user: String,
    pub identity_file: Option<PathBuf>,
}

/// An opened but possibly not yet connected tunnel.
#[async_trait]
pub trait Tunnel: Send + Debug {
    async fn connect(&mut self) -> Result<()>;

    /// Close the tunnel. Safe to call when `connect` failed or never ran.
    async fn disconnect(&mut self) -> Result<()>;

    fn spec(&self) -> &TunnelSpec;
}

/// Creates tunnel handles; no connection is made until [`Tunnel::connect`].
pub trait TunnelOpener: Send + Sync + Debug {
    fn open(&self, spec: TunnelSpec) -> Box<dyn Tunnel>;
}
