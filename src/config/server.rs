// ABOUTME: Server configuration for the SSH connection.
// ABOUTME: Parses "host", "user@host", "host:port", "user@host:port" or a detailed mapping.

use super::env_value::EnvValue;
use crate::deploy::ConnectionIdentity;
use crate::error::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Keys tried, in order, when the config names none.
const DEFAULT_KEYS: [&str; 3] = ["~/.ssh/id_ed25519", "~/.ssh/id_rsa", "~/.ssh/id_ecdsa"];

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: EnvValue,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: Option<EnvValue>,
    #[serde(default)]
    pub key: Option<EnvValue>,
    #[serde(default)]
    pub trust_first_connection: bool,
    #[serde(default)]
    pub known_hosts: Option<String>,
    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,
}

fn default_port() -> u16 {
    22
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(600)
}

impl ServerConfig {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let (user, host, port) = split_address(s)?;

        let mut server = ServerConfig::new(host);
        server.port = port.unwrap_or_else(default_port);
        server.user = user.map(EnvValue::literal);
        Ok(server)
    }

    pub fn new(host: &str) -> Self {
        ServerConfig {
            host: EnvValue::literal(host),
            port: default_port(),
            user: None,
            key: None,
            trust_first_connection: false,
            known_hosts: None,
            command_timeout: default_command_timeout(),
        }
    }

    /// Apply a destination's server settings. Fields the destination leaves
    /// out keep their base values.
    pub fn overlay(&mut self, patch: &ServerOverride) {
        if let Some(ref host) = patch.host {
            self.host = host.clone();
        }
        if let Some(port) = patch.port {
            self.port = port;
        }
        if let Some(ref user) = patch.user {
            self.user = Some(user.clone());
        }
        if let Some(ref key) = patch.key {
            self.key = Some(key.clone());
        }
        if let Some(trust) = patch.trust_first_connection {
            self.trust_first_connection = trust;
        }
        if let Some(ref path) = patch.known_hosts {
            self.known_hosts = Some(path.clone());
        }
        if let Some(timeout) = patch.command_timeout {
            self.command_timeout = timeout;
        }
    }

    /// Resolve env references and paths into a connection identity.
    ///
    /// Without a configured user the local `$USER` is used; without a key the
    /// first existing default key is used.
    pub fn identity(&self) -> Result<ConnectionIdentity> {
        let host = self.host.resolve()?;
        let user = match &self.user {
            Some(user) => user.resolve()?,
            None => std::env::var("USER").unwrap_or_else(|_| "root".to_string()),
        };
        let key = match &self.key {
            Some(key) => expand_home(&key.resolve()?),
            None => default_key(),
        };

        let identity = ConnectionIdentity::new(host, user, key)?
            .port(self.port)
            .trust_first_connection(self.trust_first_connection)
            .command_timeout(self.command_timeout);

        Ok(match &self.known_hosts {
            Some(path) => identity.known_hosts_path(expand_home(path)),
            None => identity,
        })
    }
}

/// Server settings of a destination; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerOverride {
    #[serde(default)]
    pub host: Option<EnvValue>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<EnvValue>,
    #[serde(default)]
    pub key: Option<EnvValue>,
    #[serde(default)]
    pub trust_first_connection: Option<bool>,
    #[serde(default)]
    pub known_hosts: Option<String>,
    #[serde(default, with = "humantime_serde")]
    pub command_timeout: Option<Duration>,
}

impl ServerOverride {
    /// Short form: only the parts written in `[user@]host[:port]` are set.
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let (user, host, port) = split_address(s)?;
        Ok(ServerOverride {
            host: Some(EnvValue::literal(host)),
            port,
            user: user.map(EnvValue::literal),
            ..Default::default()
        })
    }
}

/// Split `[user@]host[:port]`.
fn split_address(s: &str) -> std::result::Result<(Option<&str>, &str, Option<u16>), String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("server address cannot be empty".to_string());
    }

    let (user, rest) = match s.split_once('@') {
        Some((user, rest)) => (Some(user), rest),
        None => (None, s),
    };

    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port_str)) => {
            let port = port_str
                .parse::<u16>()
                .map_err(|_| format!("invalid port: {}", port_str))?;
            (host, Some(port))
        }
        None => (rest, None),
    };

    if host.is_empty() {
        return Err("hostname cannot be empty".to_string());
    }

    Ok((user, host, port))
}

fn default_key() -> PathBuf {
    DEFAULT_KEYS
        .iter()
        .map(|k| expand_home(k))
        .find(|p| p.is_file())
        .unwrap_or_else(|| expand_home(DEFAULT_KEYS[0]))
}

/// Expand a leading `~/` to `$HOME`. Other paths are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => PathBuf::from(home).join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_host_only() {
        let server = ServerConfig::parse("example.com").unwrap();
        assert_eq!(server.host, EnvValue::literal("example.com"));
        assert_eq!(server.port, 22);
        assert!(server.user.is_none());
    }

    #[test]
    fn parse_user_host_port() {
        let server = ServerConfig::parse("deploy@example.com:2222").unwrap();
        assert_eq!(server.host, EnvValue::literal("example.com"));
        assert_eq!(server.port, 2222);
        assert_eq!(server.user, Some(EnvValue::literal("deploy")));
    }

    #[test]
    fn parse_rejects_bad_port() {
        assert!(ServerConfig::parse("example.com:ssh").is_err());
    }

    #[test]
    fn parse_rejects_empty_host() {
        assert!(ServerConfig::parse("deploy@:22").is_err());
        assert!(ServerConfig::parse("  ").is_err());
    }

    #[test]
    fn overlay_keeps_fields_the_destination_omits() {
        let mut base = ServerConfig::parse("deploy@example.com:2222").unwrap();
        base.key = Some(EnvValue::literal("/keys/deploy"));
        base.trust_first_connection = true;

        base.overlay(&ServerOverride::parse("staging.example.com").unwrap());

        assert_eq!(base.host, EnvValue::literal("staging.example.com"));
        assert_eq!(base.port, 2222);
        assert_eq!(base.user, Some(EnvValue::literal("deploy")));
        assert_eq!(base.key, Some(EnvValue::literal("/keys/deploy")));
        assert!(base.trust_first_connection);
    }

    #[test]
    fn overlay_replaces_fields_the_destination_sets() {
        let mut base = ServerConfig::parse("deploy@example.com").unwrap();
        let patch = ServerOverride {
            user: Some(EnvValue::literal("ci")),
            port: Some(2200),
            command_timeout: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        base.overlay(&patch);

        assert_eq!(base.host, EnvValue::literal("example.com"));
        assert_eq!(base.user, Some(EnvValue::literal("ci")));
        assert_eq!(base.port, 2200);
        assert_eq!(base.command_timeout, Duration::from_secs(30));
    }

    #[test]
    fn short_override_sets_only_written_parts() {
        let patch = ServerOverride::parse("staging.example.com").unwrap();
        assert!(patch.port.is_none());
        assert!(patch.user.is_none());

        let patch = ServerOverride::parse("ci@staging.example.com:2200").unwrap();
        assert_eq!(patch.port, Some(2200));
        assert_eq!(patch.user, Some(EnvValue::literal("ci")));
    }

    #[test]
    fn expand_home_replaces_tilde() {
        temp_env::with_var("HOME", Some("/home/deploy"), || {
            assert_eq!(
                expand_home("~/.ssh/id_rsa"),
                PathBuf::from("/home/deploy/.ssh/id_rsa")
            );
            assert_eq!(expand_home("/etc/key"), PathBuf::from("/etc/key"));
            assert_eq!(expand_home("~other/key"), PathBuf::from("~other/key"));
        });
    }

    #[test]
    fn identity_uses_configured_values() {
        let mut server = ServerConfig::parse("deploy@example.com:2222").unwrap();
        server.key = Some(EnvValue::literal("/keys/deploy"));
        server.trust_first_connection = true;

        let identity = server.identity().unwrap();
        assert_eq!(identity.server_address(), "example.com");
        assert_eq!(identity.username(), "deploy");
        assert_eq!(identity.private_key_path(), PathBuf::from("/keys/deploy"));

        let ssh = identity.session_config();
        assert_eq!(ssh.port, 2222);
        assert!(ssh.trust_on_first_use);
    }

    #[test]
    fn identity_falls_back_to_local_user() {
        temp_env::with_var("USER", Some("alice"), || {
            let mut server = ServerConfig::new("example.com");
            server.key = Some(EnvValue::literal("/keys/deploy"));
            assert_eq!(server.identity().unwrap().username(), "alice");
        });
    }

    #[test]
    fn identity_picks_first_existing_default_key() {
        let home = tempfile::tempdir().unwrap();
        let ssh_dir = home.path().join(".ssh");
        std::fs::create_dir_all(&ssh_dir).unwrap();
        std::fs::write(ssh_dir.join("id_rsa"), "key").unwrap();

        temp_env::with_var("HOME", Some(home.path()), || {
            let server = ServerConfig::parse("deploy@example.com").unwrap();
            let identity = server.identity().unwrap();
            assert_eq!(identity.private_key_path(), ssh_dir.join("id_rsa"));
        });
    }
}
