//! Tunnels backed by the system `ssh` client.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};

use super::{Tunnel, TunnelOpener, TunnelSpec};
use crate::{Error, Result};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub struct SshTunnelOpener {
    program: String,
    connect_timeout: Duration,
}

impl SshTunnelOpener {
    pub fn new() -> Self {
        Self {
            program: "ssh".to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl Default for SshTunnelOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl TunnelOpener for SshTunnelOpener {
    fn open(&self, spec: TunnelSpec) -> Box<dyn Tunnel> {
        Box::new(SshTunnel {
            spec,
            program: self.program.clone(),
            connect_timeout: self.connect_timeout,
            child: None,
        })
    }
}

/// `ssh -N -L` child process; killed on disconnect or drop.
#[derive(Debug)]
pub struct SshTunnel {
    spec: TunnelSpec,
    program: String,
    connect_timeout: Duration,
    child: Option<Child>,
}

impl SshTunnel {
    fn args(&self) -> Vec<String> {
        let spec = &self.spec;
        let mut args = vec![
            "-N".to_string(),
            "-o".to_string(),
            "ExitOnForwardFailure=yes".to_string(),
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-L".to_string(),
            format!("{}:{}:{}", spec.local_port, spec.remote_host, spec.remote_port),
        ];
        if let Some(ref identity) = spec.identity_file {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args.push(format!("{}@{}", spec.jump_user, spec.jump_host));
        args
    }

    async fn wait_until_ready(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.connect_timeout;
        loop {
            if let Some(child) = self.child.as_mut()
                && let Some(status) = child.try_wait()?
            {
                return Err(Error::Tunnel {
                    message: format!("ssh exited before the tunnel came up: {}", status),
                });
            }

            if TcpStream::connect(("127.0.0.1", self.spec.local_port))
                .await
                .is_ok()
            {
                return Ok(());
            }

            if Instant::now() >= deadline {
                return Err(Error::Tunnel {
                    message: format!(
                        "local port {} not reachable after {:?}",
                        self.spec.local_port, self.connect_timeout
                    ),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl Tunnel for SshTunnel {
    async fn connect(&mut self) -> Result<()> {
        let child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Tunnel {
                message: format!("failed to start {}: {}", self.program, e),
            })?;
        self.child = Some(child);

        tracing::info!(
            local_port = self.spec.local_port,
            remote = %format!("{}:{}", self.spec.remote_host, self.spec.remote_port),
            jump_host = %self.spec.jump_host,
            "opening ssh tunnel"
        );
        self.wait_until_ready().await
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                tracing::warn!(error = %e, "failed to stop ssh tunnel");
                return Err(e.into());
            }
            tracing::info!(local_port = self.spec.local_port, "ssh tunnel closed");
        }
        Ok(())
    }

    fn spec(&self) -> &TunnelSpec {
        &self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn spec() -> TunnelSpec {
        TunnelSpec {
            local_port: 1234,
            remote_host: "node1.internal".to_string(),
            remote_port: 50075,
            jump_host: "jump.example.com".to_string(),
            jump_user: "ubuntu".to_string(),
            identity_file: Some(PathBuf::from("/keys/id_rsa")),
        }
    }

    fn tunnel(opener: &SshTunnelOpener) -> SshTunnel {
        SshTunnel {
            spec: spec(),
            program: opener.program.clone(),
            connect_timeout: opener.connect_timeout,
            child: None,
        }
    }

    #[test]
    fn test_ssh_args() {
        let args = tunnel(&SshTunnelOpener::new()).args();
        assert_eq!(args[0], "-N");
        assert!(args.contains(&"1234:node1.internal:50075".to_string()));
        assert!(args.contains(&"/keys/id_rsa".to_string()));
        assert_eq!(args.last().unwrap(), "ubuntu@jump.example.com");
    }

    #[tokio::test]
    async fn test_missing_program_is_tunnel_error() {
        let opener = SshTunnelOpener::new().program("/nonexistent/ssh-binary");
        let mut tunnel = opener.open(spec());

        let err = tunnel.connect().await.unwrap_err();
        assert!(matches!(err, Error::Tunnel { .. }));
        tunnel.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_without_connect() {
        let mut tunnel = SshTunnelOpener::new().open(spec());
        tunnel.disconnect().await.unwrap();
        assert_eq!(tunnel.spec().local_port, 1234);
    }
}
