// ABOUTME: Connection identity for a deployment target.
// ABOUTME: Host, user and key file, plus transport options, fixed at construction.

use super::error::{DeployError, Result};
use crate::ssh::SessionConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Who to connect as, where, and with which key.
#[derive(Debug, Clone)]
pub struct ConnectionIdentity {
    server_address: String,
    username: String,
    private_key_path: PathBuf,
    port: u16,
    trust_first_connection: bool,
    known_hosts_path: Option<PathBuf>,
    command_timeout: Duration,
}

impl ConnectionIdentity {
    /// All three values are required; an empty one is a configuration error.
    pub fn new(
        server_address: impl Into<String>,
        username: impl Into<String>,
        private_key_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let server_address = server_address.into();
        let username = username.into();
        let private_key_path = private_key_path.into();

        if server_address.trim().is_empty() {
            return Err(DeployError::Configuration(
                "server address is required".to_string(),
            ));
        }
        if username.trim().is_empty() {
            return Err(DeployError::Configuration("username is required".to_string()));
        }
        if private_key_path.as_os_str().is_empty() {
            return Err(DeployError::Configuration(
                "private key file path is required".to_string(),
            ));
        }

        Ok(Self {
            server_address,
            username,
            private_key_path,
            port: 22,
            trust_first_connection: false,
            known_hosts_path: None,
            command_timeout: Duration::from_secs(600),
        })
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn trust_first_connection(mut self, trust: bool) -> Self {
        self.trust_first_connection = trust;
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

    pub fn server_address(&self) -> &str {
        &self.server_address
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn private_key_path(&self) -> &Path {
        &self.private_key_path
    }

    /// SSH session settings for this identity.
    pub fn session_config(&self) -> SessionConfig {
        let config = SessionConfig::new(
            &self.server_address,
            &self.username,
            &self.private_key_path,
        )
        .port(self.port)
        .trust_on_first_use(self.trust_first_connection)
        .command_timeout(self.command_timeout);

        match &self.known_hosts_path {
            Some(path) => config.known_hosts_path(path),
            None => config,
        }
    }
}

impl std::fmt::Display for ConnectionIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.server_address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_server_address() {
        let err = ConnectionIdentity::new("", "deploy", "/keys/id").unwrap_err();
        assert!(matches!(err, DeployError::Configuration(_)));
    }

    #[test]
    fn requires_username() {
        let err = ConnectionIdentity::new("example.com", "", "/keys/id").unwrap_err();
        assert!(matches!(err, DeployError::Configuration(_)));
    }

    #[test]
    fn requires_key_path() {
        let err = ConnectionIdentity::new("example.com", "deploy", "").unwrap_err();
        assert!(matches!(err, DeployError::Configuration(_)));
    }

    #[test]
    fn session_config_carries_options() {
        let identity = ConnectionIdentity::new("example.com", "deploy", "/keys/id")
            .unwrap()
            .port(2222)
            .trust_first_connection(true)
            .known_hosts_path("/tmp/kh")
            .command_timeout(Duration::from_secs(30));

        let config = identity.session_config();
        assert_eq!(config.host, "example.com");
        assert_eq!(config.user, "deploy");
        assert_eq!(config.key_path, PathBuf::from("/keys/id"));
        assert_eq!(config.port, 2222);
        assert!(config.trust_on_first_use);
        assert_eq!(config.known_hosts_path, Some(PathBuf::from("/tmp/kh")));
        assert_eq!(config.command_timeout, Duration::from_secs(30));
    }

    #[test]
    fn display_is_user_at_host() {
        let identity = ConnectionIdentity::new("example.com", "deploy", "/keys/id").unwrap();
        assert_eq!(identity.to_string(), "deploy@example.com:22");
    }
}
