// ABOUTME: Transport seam between deployment logic and the SSH client.
// ABOUTME: The russh session implements it; tests substitute a recording fake.

use super::identity::ConnectionIdentity;
use crate::ssh::{self, CommandOutput, Session};
use async_trait::async_trait;
use std::path::Path;

/// An established remote connection that can run commands and receive files.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Whether the connection is still usable.
    fn is_connected(&self) -> bool;

    /// Run a command, optionally from a working directory.
    ///
    /// A non-zero exit is reported in the output, not as an error; errors
    /// are reserved for transport failures.
    async fn exec(&self, command: &str, cwd: Option<&str>) -> ssh::Result<CommandOutput>;

    /// Copy a local file to a remote path.
    async fn upload(&self, local_path: &Path, remote_path: &str) -> ssh::Result<()>;

    /// Tear down the connection. Calling it twice is not an error.
    async fn disconnect(&self) -> ssh::Result<()>;
}

/// Opens a [`Transport`] for a connection identity.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: Transport;

    async fn connect(&self, identity: &ConnectionIdentity) -> ssh::Result<Self::Transport>;
}

/// Connects over SSH with russh.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshConnector;

#[async_trait]
impl Connector for SshConnector {
    type Transport = Session;

    async fn connect(&self, identity: &ConnectionIdentity) -> ssh::Result<Session> {
        Session::connect(identity.session_config()).await
    }
}

#[async_trait]
impl Transport for Session {
    fn is_connected(&self) -> bool {
        Session::is_connected(self)
    }

    async fn exec(&self, command: &str, cwd: Option<&str>) -> ssh::Result<CommandOutput> {
        match cwd {
            Some(dir) => self.exec_in(command, dir).await,
            None => Session::exec(self, command).await,
        }
    }

    async fn upload(&self, local_path: &Path, remote_path: &str) -> ssh::Result<()> {
        Session::upload(self, local_path, remote_path).await
    }

    async fn disconnect(&self) -> ssh::Result<()> {
        Session::disconnect(self).await
    }
}
