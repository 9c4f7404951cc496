// ABOUTME: Config scaffolding for new projects.
// ABOUTME: Creates tarploy.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::ServiceName;

use super::{CONFIG_FILENAME, Config};

pub fn init_config(dir: &Path, service: Option<&str>, force: bool) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let mut config = Config::template()?;

    if let Some(s) = service {
        config.service = ServiceName::new(s).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.tarball = format!("dist/{}.tar.gz", config.service).into();
        config.app_dir = format!("/srv/approot/{}", config.service);
    }

    let yaml = generate_template_yaml(&config);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(config: &Config) -> String {
    format!(
        r#"service: {service}
# simple: stop, upload, unpack, chown/chmod, start
# node: same, plus "npm ci --production" before start
kind: {kind}
server:
  host: {host}
  # host: {{ env: SSH_SERVER_ADDRESS }}
  port: {port}
  user: {user}
  key: {key}
  # Accept and remember unknown host keys (default: false)
  # trust_first_connection: true
tarball: {tarball}
server_temp_dir: {temp_dir}
# Must live below an "approot" directory; its contents are replaced on deploy
app_dir: {app_dir}
app_owner: {owner}
strip_components: {strip}
permissions: "{permissions}"
"#,
        service = config.service,
        kind = config.kind,
        host = config.server.host,
        port = config.server.port,
        user = config
            .server
            .user
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "deploy".to_string()),
        key = config
            .server
            .key
            .as_ref()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "~/.ssh/id_ed25519".to_string()),
        tarball = config.tarball.display(),
        temp_dir = config.server_temp_dir,
        app_dir = config.app_dir,
        owner = config.app_owner,
        strip = config.strip_components,
        permissions = config.permissions,
    )
}
