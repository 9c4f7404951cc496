// ABOUTME: SSH session management using russh.
// ABOUTME: Handles connection, key authentication, command execution and file upload.

use super::error::{Error, Result};
use russh::client::{self, Config, Handle};
use russh::keys::known_hosts::{
    check_known_hosts, check_known_hosts_path, learn_known_hosts, learn_known_hosts_path,
};
use russh::keys::{PrivateKeyWithHashAlg, load_secret_key, ssh_key};
use russh::{Channel, ChannelMsg, Disconnect};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;

/// Configuration for establishing an SSH session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Remote host to connect to.
    pub host: String,
    /// SSH port (default: 22).
    pub port: u16,
    /// Username for authentication.
    pub user: String,
    /// Path to the private key file used for authentication.
    pub key_path: PathBuf,
    /// Whether to accept unknown hosts (Trust On First Use).
    /// If false, connection to unknown hosts will fail.
    pub trust_on_first_use: bool,
    /// Optional path to known_hosts file.
    /// If None, uses the default ~/.ssh/known_hosts.
    pub known_hosts_path: Option<PathBuf>,
    /// Timeout for command execution and uploads (default: 10 minutes).
    pub command_timeout: Duration,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>, key_path: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            key_path: key_path.into(),
            trust_on_first_use: false,
            known_hosts_path: None,
            command_timeout: Duration::from_secs(600),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn trust_on_first_use(mut self, tofu: bool) -> Self {
        self.trust_on_first_use = tofu;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

/// Output from a remote command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code of the command.
    pub exit_code: u32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Quote a value for safe interpolation into a POSIX shell command.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// SSH client handler for russh.
pub(crate) struct SshHandler {
    host: String,
    port: u16,
    trust_on_first_use: bool,
    known_hosts_path: Option<PathBuf>,
}

impl SshHandler {
    fn new(host: String, port: u16, trust_on_first_use: bool, known_hosts_path: Option<PathBuf>) -> Self {
        Self {
            host,
            port,
            trust_on_first_use,
            known_hosts_path,
        }
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let check_result = match &self.known_hosts_path {
            Some(path) => check_known_hosts_path(&self.host, self.port, server_public_key, path),
            None => check_known_hosts(&self.host, self.port, server_public_key),
        };

        match check_result {
            Ok(true) => Ok(true),
            Ok(false) if self.trust_on_first_use => {
                tracing::warn!(
                    "Trust-On-First-Use: accepting unknown host key for {}:{}",
                    self.host,
                    self.port
                );
                let learn_result = match &self.known_hosts_path {
                    Some(path) => {
                        learn_known_hosts_path(&self.host, self.port, server_public_key, path)
                    }
                    None => learn_known_hosts(&self.host, self.port, server_public_key),
                };
                if let Err(e) = learn_result {
                    tracing::warn!("Failed to save host key to known_hosts: {}", e);
                }
                Ok(true)
            }
            Ok(false) => {
                tracing::error!(
                    "Host key for {}:{} is not in known_hosts and trust-on-first-use is disabled",
                    self.host,
                    self.port
                );
                Ok(false)
            }
            Err(russh::keys::Error::KeyChanged { line }) => {
                tracing::error!(
                    "Host key for {}:{} changed (known_hosts line {})",
                    self.host,
                    self.port,
                    line
                );
                Ok(false)
            }
            // A missing or unreadable known_hosts file is treated as an unknown host
            Err(_) => Ok(self.trust_on_first_use),
        }
    }
}

/// An established SSH session.
pub struct Session {
    config: SessionConfig,
    handle: Handle<SshHandler>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("handle", &"<russh::Handle>")
            .finish()
    }
}

impl Session {
    /// Connect to the remote host and authenticate with the configured key.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let key = load_secret_key(&config.key_path, None).map_err(|e| Error::KeyLoadFailed {
            path: config.key_path.clone(),
            reason: e.to_string(),
        })?;

        let russh_config = Config {
            inactivity_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let handler = SshHandler::new(
            config.host.clone(),
            config.port,
            config.trust_on_first_use,
            config.known_hosts_path.clone(),
        );

        let mut handle = client::connect(
            Arc::new(russh_config),
            (config.host.as_str(), config.port),
            handler,
        )
        .await
        .map_err(|e| {
            if e.to_string().contains("Connection refused") {
                Error::Connection(format!(
                    "connection refused to {}:{}",
                    config.host, config.port
                ))
            } else {
                Error::Connection(e.to_string())
            }
        })?;

        let hash_alg = handle
            .best_supported_rsa_hash()
            .await
            .map_err(Error::Protocol)?
            .flatten();

        let auth = handle
            .authenticate_publickey(
                &config.user,
                PrivateKeyWithHashAlg::new(Arc::new(key), hash_alg),
            )
            .await
            .map_err(Error::Protocol)?;

        if !auth.success() {
            return Err(Error::AuthenticationFailed(config.user.clone()));
        }

        Ok(Self { config, handle })
    }

    /// Whether the underlying connection is still open.
    pub fn is_connected(&self) -> bool {
        !self.handle.is_closed()
    }

    /// Execute a command on the remote host.
    pub async fn exec(&self, command: &str) -> Result<CommandOutput> {
        self.exec_with_timeout(command, self.config.command_timeout)
            .await
    }

    /// Execute a command from within a remote working directory.
    pub async fn exec_in(&self, command: &str, cwd: &str) -> Result<CommandOutput> {
        self.exec(&format!("cd {} && {}", shell_quote(cwd), command))
            .await
    }

    /// Execute a command with a custom timeout.
    pub async fn exec_with_timeout(
        &self,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        match tokio::time::timeout(timeout, self.exec_inner(command)).await {
            Ok(result) => result,
            Err(_) => Err(Error::CommandTimeout(timeout)),
        }
    }

    async fn exec_inner(&self, command: &str) -> Result<CommandOutput> {
        tracing::debug!(command, "exec");

        let mut channel = self.open_exec_channel(command).await?;
        collect_output(&mut channel).await
    }

    /// Upload a local file to `remote_path`, replacing any existing file.
    ///
    /// The file is streamed over an exec channel running `cat`, so the
    /// remote user needs write access to the target location.
    pub async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<()> {
        let timeout = self.config.command_timeout;
        match tokio::time::timeout(timeout, self.upload_inner(local_path, remote_path)).await {
            Ok(result) => result,
            Err(_) => Err(Error::CommandTimeout(timeout)),
        }
    }

    async fn upload_inner(&self, local_path: &Path, remote_path: &str) -> Result<()> {
        let mut file = tokio::fs::File::open(local_path).await?;
        let command = format!("cat > {}", shell_quote(remote_path));
        let mut channel = self.open_exec_channel(&command).await?;

        let mut buf = vec![0u8; 65536];
        let mut sent = 0usize;
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            channel
                .data(&buf[..n])
                .await
                .map_err(|e| Error::UploadFailed {
                    remote: remote_path.to_string(),
                    reason: e.to_string(),
                })?;
            sent += n;
        }
        channel.eof().await.map_err(Error::Protocol)?;

        let output = collect_output(&mut channel).await?;
        if !output.success() {
            return Err(Error::UploadFailed {
                remote: remote_path.to_string(),
                reason: format!(
                    "remote exited with code {}: {}",
                    output.exit_code,
                    output.stderr.trim()
                ),
            });
        }

        tracing::debug!(bytes = sent, remote = remote_path, "upload complete");
        Ok(())
    }

    async fn open_exec_channel(&self, command: &str) -> Result<Channel<client::Msg>> {
        let channel = self
            .handle
            .channel_open_session()
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to open channel: {}", e)))?;

        channel
            .exec(true, command)
            .await
            .map_err(|e| Error::CommandFailed(format!("failed to exec command: {}", e)))?;

        Ok(channel)
    }

    /// Disconnect the session. Does nothing if the connection is already closed.
    pub async fn disconnect(&self) -> Result<()> {
        if self.handle.is_closed() {
            return Ok(());
        }

        self.handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
            .map_err(Error::Protocol)?;
        Ok(())
    }
}

/// Drain a channel until it reports both an exit status and EOF (or closes).
async fn collect_output(channel: &mut Channel<client::Msg>) -> Result<CommandOutput> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_code = 0u32;

    let mut got_exit_status = false;
    let mut got_eof = false;

    loop {
        match channel.wait().await {
            Some(ChannelMsg::Data { data }) => {
                stdout.extend_from_slice(&data);
            }
            Some(ChannelMsg::ExtendedData { data, ext }) => {
                if ext == 1 {
                    stderr.extend_from_slice(&data);
                }
            }
            Some(ChannelMsg::ExitStatus { exit_status }) => {
                exit_code = exit_status;
                got_exit_status = true;
                if got_eof {
                    break;
                }
            }
            Some(ChannelMsg::Eof) => {
                got_eof = true;
                if got_exit_status {
                    break;
                }
            }
            Some(ChannelMsg::Close) => {
                break;
            }
            Some(_) => {}
            None => break,
        }
    }

    // No exit status means the channel was torn down underneath us
    if !got_exit_status {
        return Err(Error::ChannelClosed);
    }

    Ok(CommandOutput {
        exit_code,
        stdout: String::from_utf8_lossy(&stdout).to_string(),
        stderr: String::from_utf8_lossy(&stderr).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_config_defaults() {
        let config = SessionConfig::new("example.com", "deploy", "/home/deploy/.ssh/id_ed25519");
        assert_eq!(config.port, 22);
        assert!(!config.trust_on_first_use);
        assert!(config.known_hosts_path.is_none());
        assert_eq!(config.command_timeout, Duration::from_secs(600));
    }

    #[test]
    fn session_config_builder() {
        let config = SessionConfig::new("example.com", "deploy", "/keys/id")
            .port(2222)
            .trust_on_first_use(true)
            .known_hosts_path("/tmp/known_hosts")
            .command_timeout(Duration::from_secs(5));
        assert_eq!(config.port, 2222);
        assert!(config.trust_on_first_use);
        assert_eq!(
            config.known_hosts_path.as_deref(),
            Some(Path::new("/tmp/known_hosts"))
        );
        assert_eq!(config.command_timeout, Duration::from_secs(5));
    }

    #[test]
    fn shell_quote_wraps_and_escapes() {
        assert_eq!(shell_quote("/srv/approot/app"), "'/srv/approot/app'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn command_output_success_tracks_exit_code() {
        let ok = CommandOutput::default();
        assert!(ok.success());

        let failed = CommandOutput {
            exit_code: 3,
            ..Default::default()
        };
        assert!(!failed.success());
    }
}
