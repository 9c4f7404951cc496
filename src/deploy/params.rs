// ABOUTME: Per-invocation parameters for the composite deploy workflows.
// ABOUTME: Not validated here; each step checks the fields it consumes.

use std::path::PathBuf;

/// Inputs to `simple_deploy` / `node_deploy`.
#[derive(Debug, Clone, Default)]
pub struct DeployParams {
    /// systemd unit to stop before and start after the deploy.
    pub service_name: String,
    /// Tarball on the local machine.
    pub local_tarball_path: PathBuf,
    /// Remote directory the tarball is uploaded to.
    pub server_temp_dir: String,
    /// File name of the tarball once uploaded.
    pub tarball_name: String,
    /// Remote directory the tarball is unpacked into.
    pub server_app_dir: String,
    /// Owner (and group) of the unpacked files.
    pub server_app_owner: String,
    /// Leading path components stripped by tar.
    pub strip_components: u32,
    /// Mode applied recursively to the app directory.
    pub app_dir_permissions: String,
}

impl DeployParams {
    /// Where the tarball lands on the server.
    pub fn remote_tarball_path(&self) -> String {
        format!("{}/{}", self.server_temp_dir, self.tarball_name)
    }
}
