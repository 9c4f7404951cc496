// ABOUTME: Deployment session: one connection to one host and the operations run over it.
// ABOUTME: Service control, upload, unpack, ownership fixes, npm install and the composite workflows.

use super::error::{DeployError, Result};
use super::identity::ConnectionIdentity;
use super::params::DeployParams;
use super::plan::{DeployPlan, FailurePolicy, Step, StepAction};
use super::report::{DeployReport, StepOutcome};
use super::transport::{Connector, SshConnector, Transport};
use super::validate;
use crate::diagnostics::Warning;
use crate::ssh::{self, CommandOutput};
use std::path::Path;

/// Where the session is in its lifecycle. The transport only exists while connected.
enum ConnectionState<T> {
    Unconnected,
    Connected(T),
    Disconnected,
}

/// A deployment target and, once connected, the connection to it.
///
/// Operations run strictly one after another; each awaits its remote command
/// before returning. Call [`disconnect`](Self::disconnect) when done, including
/// after a failed workflow.
pub struct DeploySession<C: Connector = SshConnector> {
    identity: ConnectionIdentity,
    connector: C,
    state: ConnectionState<C::Transport>,
}

impl DeploySession<SshConnector> {
    pub fn new(identity: ConnectionIdentity) -> Self {
        Self::with_connector(identity, SshConnector)
    }
}

impl<C: Connector> DeploySession<C> {
    pub fn with_connector(identity: ConnectionIdentity, connector: C) -> Self {
        Self {
            identity,
            connector,
            state: ConnectionState::Unconnected,
        }
    }

    pub fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    pub fn is_connected(&self) -> bool {
        matches!(&self.state, ConnectionState::Connected(t) if t.is_connected())
    }

    /// Open the connection. The key file is checked locally before any network traffic.
    pub async fn connect(&mut self) -> Result<()> {
        match self.state {
            ConnectionState::Unconnected => {}
            ConnectionState::Connected(_) => {
                return Err(DeployError::State(format!(
                    "already connected to {}",
                    self.identity
                )));
            }
            ConnectionState::Disconnected => {
                return Err(DeployError::State(
                    "session has been disconnected and cannot be reused".to_string(),
                ));
            }
        }

        let key_path = self.identity.private_key_path();
        tracing::info!(
            "connecting to {} using key file {}",
            self.identity,
            key_path.display()
        );

        if !key_path.is_file() {
            return Err(DeployError::Configuration(format!(
                "could not find key file {}",
                key_path.display()
            )));
        }

        let transport = self
            .connector
            .connect(&self.identity)
            .await
            .map_err(DeployError::Connection)?;

        if !transport.is_connected() {
            return Err(DeployError::Connection(ssh::Error::Connection(format!(
                "connection to {} closed during setup",
                self.identity
            ))));
        }

        self.state = ConnectionState::Connected(transport);
        Ok(())
    }

    /// Release the connection. Safe to call in any state, any number of times.
    ///
    /// The session is disconnected afterwards even if the transport reports
    /// an error while tearing down.
    pub async fn disconnect(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, ConnectionState::Disconnected) {
            ConnectionState::Connected(transport) => {
                tracing::debug!("disconnecting from {}", self.identity);
                transport.disconnect().await.map_err(DeployError::Connection)
            }
            ConnectionState::Unconnected | ConnectionState::Disconnected => Ok(()),
        }
    }

    fn transport(&self) -> Result<&C::Transport> {
        match &self.state {
            ConnectionState::Connected(t) if t.is_connected() => Ok(t),
            ConnectionState::Connected(_) => Err(DeployError::State(format!(
                "connection to {} has been closed",
                self.identity
            ))),
            ConnectionState::Unconnected => Err(DeployError::State(
                "not connected, call connect() first".to_string(),
            )),
            ConnectionState::Disconnected => Err(DeployError::State(
                "session has been disconnected".to_string(),
            )),
        }
    }

    async fn run(&self, command: &str, cwd: Option<&str>) -> Result<CommandOutput> {
        let transport = self.transport()?;
        tracing::debug!(command, cwd, "running remote command");
        transport
            .exec(command, cwd)
            .await
            .map_err(DeployError::Connection)
    }

    /// Run a command and turn a non-zero exit into [`DeployError::Command`].
    async fn run_checked(&self, command: String, cwd: Option<&str>) -> Result<CommandOutput> {
        let output = self.run(&command, cwd).await?;
        if !output.success() {
            tracing::debug!(
                exit_code = output.exit_code,
                stdout = %output.stdout.trim(),
                stderr = %output.stderr.trim(),
                "remote command failed"
            );
            return Err(DeployError::Command { command, output });
        }
        Ok(output)
    }

    /// Raw `systemctl is-active` output, trimmed ("active", "inactive", "failed", ...).
    pub async fn service_status(&self, service: &str) -> Result<String> {
        let service = validate::service_name(service)?;
        tracing::info!("checking if service {} is active", service);

        // is-active exits non-zero for anything but "active"; the text is the answer
        let output = self
            .run(&format!("sudo systemctl is-active {service}"), None)
            .await?;
        Ok(output.stdout.trim().to_string())
    }

    /// Stop the service unless it is already inactive.
    ///
    /// Any status other than exactly "inactive" is stopped, "activating"
    /// included: a unit stuck starting is usually a crash loop.
    pub async fn stop_service(&self, service: &str) -> Result<()> {
        let service = validate::service_name(service)?;

        let status = self.service_status(service.as_str()).await?;
        if status == "inactive" {
            tracing::info!("service {} is already stopped, no action taken", service);
            return Ok(());
        }

        tracing::info!(
            "stopping service {} on {} (status: {})",
            service,
            self.identity.server_address(),
            status
        );
        self.run_checked(format!("sudo systemctl stop {service}"), None)
            .await?;
        Ok(())
    }

    pub async fn start_service(&self, service: &str) -> Result<()> {
        let service = validate::service_name(service)?;

        tracing::info!(
            "starting service {} on {}",
            service,
            self.identity.server_address()
        );
        self.run_checked(format!("sudo systemctl start {service}"), None)
            .await?;
        Ok(())
    }

    pub async fn transfer_file(&self, local_path: &Path, remote_path: &str) -> Result<()> {
        if local_path.as_os_str().is_empty() {
            return Err(DeployError::validation("local file path", "value is required"));
        }
        if !local_path.exists() {
            return Err(DeployError::NotFound(local_path.to_path_buf()));
        }
        validate::non_empty("remote file path", remote_path)?;

        let transport = self.transport()?;
        tracing::info!("sending file {} to {}", local_path.display(), remote_path);

        transport
            .upload(local_path, remote_path)
            .await
            .map_err(|source| DeployError::Transfer {
                remote: remote_path.to_string(),
                source,
            })?;

        tracing::info!("transferred {}", local_path.display());
        Ok(())
    }

    /// Replace the contents of `unpack_dir` with the contents of `tarball`.
    ///
    /// `unpack_dir` is emptied with `rm -rf <dir>/*`, so it must contain
    /// `approot` and must not be the `approot` directory itself.
    pub async fn unpack_tarball(
        &self,
        tarball: &str,
        unpack_dir: &str,
        owner: &str,
        strip_components: u32,
    ) -> Result<()> {
        validate::shell_word("tarball path", tarball)?;
        validate::unpack_dir(unpack_dir)?;
        validate::shell_word("unpack directory owner", owner)?;

        tracing::info!("ensuring directory exists: {}", unpack_dir);
        self.run_checked(
            format!("sudo -u {owner} mkdir -p {unpack_dir} -m 0755"),
            None,
        )
        .await?;

        tracing::info!("deleting existing files from {}", unpack_dir);
        self.run_checked(format!("sudo rm -rf {unpack_dir}/*"), None)
            .await?;

        tracing::info!("unpacking {} into {}", tarball, unpack_dir);
        self.run_checked(
            format!("sudo tar -xf {tarball} -C {unpack_dir} --strip-components={strip_components}"),
            None,
        )
        .await?;

        Ok(())
    }

    /// `chown -R` then `chmod -R`; chmod is skipped if chown fails.
    pub async fn change_owner_and_permissions(
        &self,
        dir: &str,
        owner: &str,
        group: &str,
        permissions: &str,
    ) -> Result<()> {
        validate::shell_word("directory", dir)?;
        validate::shell_word("owner", owner)?;
        validate::shell_word("group", group)?;
        let mode = validate::file_mode(permissions)?;

        tracing::info!("setting owner of {} to {}:{}", dir, owner, group);
        self.run_checked(format!("sudo chown -R {owner}:{group} {dir}"), None)
            .await?;

        tracing::info!("setting permissions of {} to {}", dir, mode);
        self.run_checked(format!("sudo chmod -R {mode} {dir}"), None)
            .await?;

        Ok(())
    }

    /// Run `npm ci --production` in `app_dir`.
    ///
    /// A failing install is logged and reported as
    /// [`StepOutcome::FailedNonFatal`] rather than returned as an error.
    pub async fn npm_install(&self, app_dir: &str) -> Result<StepOutcome> {
        self.apply(&Step::npm_install(app_dir)).await
    }

    async fn install_dependencies(&self, app_dir: &str) -> Result<()> {
        validate::non_empty("app directory", app_dir)?;

        tracing::info!("running \"npm ci --production\" in {}", app_dir);
        self.run_checked("sudo npm ci --production".to_string(), Some(app_dir))
            .await?;
        Ok(())
    }

    /// Stop, upload, unpack, fix ownership, start.
    pub async fn simple_deploy(&self, params: &DeployParams) -> Result<DeployReport> {
        self.execute(&DeployPlan::simple(params)).await
    }

    /// Like [`simple_deploy`](Self::simple_deploy) with `npm ci` before the start.
    pub async fn node_deploy(&self, params: &DeployParams) -> Result<DeployReport> {
        self.execute(&DeployPlan::node(params)).await
    }

    /// Run a plan step by step, stopping at the first step whose failure aborts.
    pub async fn execute(&self, plan: &DeployPlan) -> Result<DeployReport> {
        self.transport()?;

        tracing::info!(
            "starting {} deploy to {} ({} steps)",
            plan.kind(),
            self.identity,
            plan.steps().len()
        );

        let mut report = DeployReport::new(plan.kind());
        for step in plan.steps() {
            let name = step.action.name();
            tracing::debug!(step = name, "running step");

            let outcome = self.apply(step).await?;
            if let StepOutcome::FailedNonFatal(reason) = &outcome {
                report
                    .diagnostics_mut()
                    .push(Warning::non_fatal_step(name, reason));
            }
            report.record(name, outcome);
        }

        tracing::info!("{} deploy to {} finished", plan.kind(), self.identity);
        Ok(report)
    }

    /// Only remote command failures and command timeouts are subject to the
    /// step's policy; bad arguments and other transport errors always propagate.
    async fn apply(&self, step: &Step) -> Result<StepOutcome> {
        match (self.perform(&step.action).await, step.on_failure) {
            (Ok(()), _) => Ok(StepOutcome::Succeeded),
            (Err(err), FailurePolicy::Continue) if err.is_remote_failure() => {
                tracing::error!("{} failed, continuing: {}", step.action.name(), err);
                Ok(StepOutcome::FailedNonFatal(err.to_string()))
            }
            (Err(err), _) => Err(err),
        }
    }

    async fn perform(&self, action: &StepAction) -> Result<()> {
        match action {
            StepAction::StopService { service } => self.stop_service(service).await,
            StepAction::TransferFile {
                local_path,
                remote_path,
            } => self.transfer_file(local_path, remote_path).await,
            StepAction::UnpackTarball {
                tarball,
                unpack_dir,
                owner,
                strip_components,
            } => {
                self.unpack_tarball(tarball, unpack_dir, owner, *strip_components)
                    .await
            }
            StepAction::ChangeOwnerAndPermissions {
                dir,
                owner,
                group,
                permissions,
            } => {
                self.change_owner_and_permissions(dir, owner, group, permissions)
                    .await
            }
            StepAction::NpmInstall { app_dir } => self.install_dependencies(app_dir).await,
            StepAction::StartService { service } => self.start_service(service).await,
        }
    }
}
