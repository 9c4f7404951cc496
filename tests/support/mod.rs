// ABOUTME: Test support utilities.
// ABOUTME: A scripted in-memory transport that records every remote command and upload.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use std::time::Duration;
use tarploy::deploy::{ConnectionIdentity, Connector, DeploySession, Transport};
use tarploy::ssh::{self, CommandOutput};
use tempfile::TempDir;

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("tarploy=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Something the fake server saw, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Exec { command: String, cwd: Option<String> },
    Upload { local: PathBuf, remote: String },
}

#[derive(Default)]
struct State {
    events: Vec<Event>,
    responses: Vec<(String, CommandOutput)>,
    timeouts: Vec<String>,
    connect_attempts: usize,
    refuse_connect: bool,
    close_after_connect: bool,
    fail_uploads: bool,
    connected: bool,
    disconnects: usize,
}

/// Shared handle to the scripted server state.
#[derive(Clone, Default)]
pub struct FakeServer {
    state: Arc<Mutex<State>>,
}

#[allow(dead_code)]
impl FakeServer {
    pub fn new() -> Self {
        let server = Self::default();
        server.respond("sudo systemctl is-active", 0, "active\n", "");
        server
    }

    /// Reply to commands starting with `prefix`. Later registrations win.
    pub fn respond(&self, prefix: &str, exit_code: u32, stdout: &str, stderr: &str) {
        self.state.lock().responses.push((
            prefix.to_string(),
            CommandOutput {
                exit_code,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
        ));
    }

    pub fn fail(&self, prefix: &str, exit_code: u32, stderr: &str) {
        self.respond(prefix, exit_code, "", stderr);
    }

    pub fn status(&self, status: &str) {
        let exit_code = if status == "active" { 0 } else { 3 };
        self.respond(
            "sudo systemctl is-active",
            exit_code,
            &format!("{status}\n"),
            "",
        );
    }

    /// Commands starting with `prefix` never finish within the command timeout.
    pub fn time_out(&self, prefix: &str) {
        self.state.lock().timeouts.push(prefix.to_string());
    }

    pub fn refuse_connect(&self) {
        self.state.lock().refuse_connect = true;
    }

    pub fn close_after_connect(&self) {
        self.state.lock().close_after_connect = true;
    }

    pub fn fail_uploads(&self) {
        self.state.lock().fail_uploads = true;
    }

    /// Simulate the connection dropping.
    pub fn drop_connection(&self) {
        self.state.lock().connected = false;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().events.clone()
    }

    /// Executed command lines, without uploads.
    pub fn commands(&self) -> Vec<String> {
        self.state
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Exec { command, .. } => Some(command.clone()),
                Event::Upload { .. } => None,
            })
            .collect()
    }

    pub fn connect_attempts(&self) -> usize {
        self.state.lock().connect_attempts
    }

    pub fn disconnects(&self) -> usize {
        self.state.lock().disconnects
    }
}

pub struct FakeConnector {
    server: FakeServer,
}

impl FakeConnector {
    pub fn new(server: &FakeServer) -> Self {
        Self {
            server: server.clone(),
        }
    }
}

#[async_trait]
impl Connector for FakeConnector {
    type Transport = FakeTransport;

    async fn connect(&self, identity: &ConnectionIdentity) -> ssh::Result<FakeTransport> {
        let mut state = self.server.state.lock();
        state.connect_attempts += 1;
        if state.refuse_connect {
            return Err(ssh::Error::Connection(format!(
                "connection refused to {}",
                identity.server_address()
            )));
        }
        state.connected = !state.close_after_connect;
        Ok(FakeTransport {
            server: self.server.clone(),
        })
    }
}

pub struct FakeTransport {
    server: FakeServer,
}

#[async_trait]
impl Transport for FakeTransport {
    fn is_connected(&self) -> bool {
        self.server.state.lock().connected
    }

    async fn exec(&self, command: &str, cwd: Option<&str>) -> ssh::Result<CommandOutput> {
        let mut state = self.server.state.lock();
        state.events.push(Event::Exec {
            command: command.to_string(),
            cwd: cwd.map(str::to_string),
        });
        if state.timeouts.iter().any(|p| command.starts_with(p.as_str())) {
            return Err(ssh::Error::CommandTimeout(Duration::from_secs(600)));
        }
        Ok(state
            .responses
            .iter()
            .rev()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default())
    }

    async fn upload(&self, local_path: &Path, remote_path: &str) -> ssh::Result<()> {
        let mut state = self.server.state.lock();
        if state.fail_uploads {
            return Err(ssh::Error::UploadFailed {
                remote: remote_path.to_string(),
                reason: "permission denied".to_string(),
            });
        }
        state.events.push(Event::Upload {
            local: local_path.to_path_buf(),
            remote: remote_path.to_string(),
        });
        Ok(())
    }

    async fn disconnect(&self) -> ssh::Result<()> {
        let mut state = self.server.state.lock();
        state.connected = false;
        state.disconnects += 1;
        Ok(())
    }
}

/// A scratch directory holding a key file and a tarball.
pub struct Workspace {
    pub dir: TempDir,
}

#[allow(dead_code)]
impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("id_ed25519"), "not a real key").unwrap();
        std::fs::write(dir.path().join("myapp.tar.gz"), b"tarball bytes").unwrap();
        Self { dir }
    }

    pub fn key_path(&self) -> PathBuf {
        self.dir.path().join("id_ed25519")
    }

    pub fn tarball_path(&self) -> PathBuf {
        self.dir.path().join("myapp.tar.gz")
    }

    pub fn identity(&self) -> ConnectionIdentity {
        ConnectionIdentity::new("app.example.com", "deploy", self.key_path()).unwrap()
    }

    pub fn session(&self, server: &FakeServer) -> DeploySession<FakeConnector> {
        DeploySession::with_connector(self.identity(), FakeConnector::new(server))
    }

    pub async fn connected_session(&self, server: &FakeServer) -> DeploySession<FakeConnector> {
        let mut session = self.session(server);
        session.connect().await.expect("connect should succeed");
        session
    }
}
