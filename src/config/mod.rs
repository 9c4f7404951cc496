// ABOUTME: Configuration types and parsing for tarploy.yml.
// ABOUTME: Handles YAML parsing, env var interpolation, and destination overlays.

mod deserialize;
mod env_value;
mod init;
mod server;

pub use env_value::{EnvValue, load_env_files};
pub use init::init_config;
pub use server::{ServerConfig, ServerOverride, expand_home};

use crate::deploy::{ConnectionIdentity, DeployKind, DeployParams};
use crate::error::{Error, Result};
use crate::types::ServiceName;
use deserialize::{
    deserialize_server, deserialize_server_override_option, deserialize_service_name,
    deserialize_service_name_option,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILENAME: &str = "tarploy.yml";
pub const CONFIG_FILENAME_ALT: &str = "tarploy.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".tarploy/config.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_service_name")]
    pub service: ServiceName,

    #[serde(default)]
    pub kind: DeployKind,

    #[serde(deserialize_with = "deserialize_server")]
    pub server: ServerConfig,

    pub tarball: PathBuf,

    /// Name of the uploaded file; defaults to the local file name.
    #[serde(default)]
    pub tarball_name: Option<String>,

    #[serde(default = "default_server_temp_dir")]
    pub server_temp_dir: String,

    pub app_dir: String,

    #[serde(default = "default_app_owner")]
    pub app_owner: String,

    #[serde(default)]
    pub strip_components: u32,

    #[serde(default = "default_permissions")]
    pub permissions: String,

    #[serde(default)]
    pub destinations: HashMap<String, Destination>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Destination {
    /// Only the server fields written here replace the base values.
    #[serde(default, deserialize_with = "deserialize_server_override_option")]
    pub server: Option<ServerOverride>,

    #[serde(default, deserialize_with = "deserialize_service_name_option")]
    pub service: Option<ServiceName>,

    #[serde(default)]
    pub kind: Option<DeployKind>,

    #[serde(default)]
    pub tarball: Option<PathBuf>,

    #[serde(default)]
    pub tarball_name: Option<String>,

    #[serde(default)]
    pub server_temp_dir: Option<String>,

    #[serde(default)]
    pub app_dir: Option<String>,

    #[serde(default)]
    pub app_owner: Option<String>,

    #[serde(default)]
    pub strip_components: Option<u32>,

    #[serde(default)]
    pub permissions: Option<String>,
}

fn default_server_temp_dir() -> String {
    "/tmp".to_string()
}

fn default_app_owner() -> String {
    "www-data".to_string()
}

fn default_permissions() -> String {
    "0755".to_string()
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn discover(dir: &Path) -> Result<Self> {
        let candidates = [
            dir.join(CONFIG_FILENAME),
            dir.join(CONFIG_FILENAME_ALT),
            dir.join(CONFIG_FILENAME_DIR),
        ];

        for path in &candidates {
            if path.exists() {
                tracing::debug!("using config {}", path.display());
                return Self::load(path);
            }
        }

        Err(Error::ConfigNotFound(dir.to_path_buf()))
    }

    pub fn for_destination(&self, name: &str) -> Result<Config> {
        let dest = self
            .destinations
            .get(name)
            .ok_or_else(|| Error::UnknownDestination(name.to_string()))?;

        let mut merged = self.clone();

        if let Some(ref server) = dest.server {
            merged.server.overlay(server);
        }
        if let Some(ref service) = dest.service {
            merged.service = service.clone();
        }
        if let Some(kind) = dest.kind {
            merged.kind = kind;
        }
        if let Some(ref tarball) = dest.tarball {
            merged.tarball = tarball.clone();
            // The base upload name belongs to the base tarball
            merged.tarball_name = None;
        }
        if let Some(ref name) = dest.tarball_name {
            merged.tarball_name = Some(name.clone());
        }
        if let Some(ref dir) = dest.server_temp_dir {
            merged.server_temp_dir = dir.clone();
        }
        if let Some(ref dir) = dest.app_dir {
            merged.app_dir = dir.clone();
        }
        if let Some(ref owner) = dest.app_owner {
            merged.app_owner = owner.clone();
        }
        if let Some(strip) = dest.strip_components {
            merged.strip_components = strip;
        }
        if let Some(ref permissions) = dest.permissions {
            merged.permissions = permissions.clone();
        }

        Ok(merged)
    }

    /// File name the tarball is uploaded as.
    pub fn tarball_name(&self) -> Result<String> {
        if let Some(ref name) = self.tarball_name {
            return Ok(name.clone());
        }

        self.tarball
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                Error::InvalidConfig(format!(
                    "tarball path has no file name: {}",
                    self.tarball.display()
                ))
            })
    }

    pub fn identity(&self) -> Result<ConnectionIdentity> {
        self.server.identity()
    }

    pub fn deploy_params(&self) -> Result<DeployParams> {
        Ok(DeployParams {
            service_name: self.service.to_string(),
            local_tarball_path: self.tarball.clone(),
            server_temp_dir: self.server_temp_dir.clone(),
            tarball_name: self.tarball_name()?,
            server_app_dir: self.app_dir.clone(),
            server_app_owner: self.app_owner.clone(),
            strip_components: self.strip_components,
            app_dir_permissions: self.permissions.clone(),
        })
    }

    pub fn template() -> Result<Self> {
        let service = ServiceName::new("my-app")
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let mut server = ServerConfig::new("server.example.com");
        server.user = Some(EnvValue::literal("deploy"));
        server.key = Some(EnvValue::literal("~/.ssh/id_ed25519"));

        Ok(Config {
            service,
            kind: DeployKind::Simple,
            server,
            tarball: PathBuf::from("dist/my-app.tar.gz"),
            tarball_name: None,
            server_temp_dir: default_server_temp_dir(),
            app_dir: "/srv/approot/my-app".to_string(),
            app_owner: default_app_owner(),
            strip_components: 1,
            permissions: default_permissions(),
            destinations: HashMap::new(),
        })
    }
}
