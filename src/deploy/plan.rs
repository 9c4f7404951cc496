// ABOUTME: Declarative deploy plans: an ordered list of steps with failure policies.
// ABOUTME: The simple and node workflows come from one builder and differ by one step.

use super::params::DeployParams;
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Which composite workflow to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeployKind {
    /// Stop, upload, unpack, fix ownership, start.
    #[default]
    Simple,
    /// As `Simple`, with `npm ci --production` before the start.
    Node,
}

impl fmt::Display for DeployKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployKind::Simple => write!(f, "simple"),
            DeployKind::Node => write!(f, "node"),
        }
    }
}

/// What happens to the workflow when a step's remote command fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the workflow and return the error.
    Abort,
    /// Log the failure and carry on with the next step.
    Continue,
}

/// A single session operation with its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    StopService {
        service: String,
    },
    TransferFile {
        local_path: PathBuf,
        remote_path: String,
    },
    UnpackTarball {
        tarball: String,
        unpack_dir: String,
        owner: String,
        strip_components: u32,
    },
    ChangeOwnerAndPermissions {
        dir: String,
        owner: String,
        group: String,
        permissions: String,
    },
    NpmInstall {
        app_dir: String,
    },
    StartService {
        service: String,
    },
}

impl StepAction {
    pub fn name(&self) -> &'static str {
        match self {
            StepAction::StopService { .. } => "stop-service",
            StepAction::TransferFile { .. } => "transfer-file",
            StepAction::UnpackTarball { .. } => "unpack-tarball",
            StepAction::ChangeOwnerAndPermissions { .. } => "change-owner-and-permissions",
            StepAction::NpmInstall { .. } => "npm-install",
            StepAction::StartService { .. } => "start-service",
        }
    }
}

/// A plan entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub action: StepAction,
    pub on_failure: FailurePolicy,
}

impl Step {
    pub fn abort_on_failure(action: StepAction) -> Self {
        Self {
            action,
            on_failure: FailurePolicy::Abort,
        }
    }

    pub fn non_fatal(action: StepAction) -> Self {
        Self {
            action,
            on_failure: FailurePolicy::Continue,
        }
    }

    /// Dependency install never halts a deploy; a broken install is left for
    /// the operator to fix on the box.
    pub fn npm_install(app_dir: impl Into<String>) -> Self {
        Self::non_fatal(StepAction::NpmInstall {
            app_dir: app_dir.into(),
        })
    }
}

/// Ordered steps for one deployment.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    kind: DeployKind,
    steps: Vec<Step>,
}

impl DeployPlan {
    pub fn build(params: &DeployParams, kind: DeployKind) -> Self {
        let remote_tarball = params.remote_tarball_path();

        let mut steps = vec![
            Step::abort_on_failure(StepAction::StopService {
                service: params.service_name.clone(),
            }),
            Step::abort_on_failure(StepAction::TransferFile {
                local_path: params.local_tarball_path.clone(),
                remote_path: remote_tarball.clone(),
            }),
            Step::abort_on_failure(StepAction::UnpackTarball {
                tarball: remote_tarball,
                unpack_dir: params.server_app_dir.clone(),
                owner: params.server_app_owner.clone(),
                strip_components: params.strip_components,
            }),
            Step::abort_on_failure(StepAction::ChangeOwnerAndPermissions {
                dir: params.server_app_dir.clone(),
                owner: params.server_app_owner.clone(),
                group: params.server_app_owner.clone(),
                permissions: params.app_dir_permissions.clone(),
            }),
        ];

        if kind == DeployKind::Node {
            steps.push(Step::npm_install(params.server_app_dir.clone()));
        }

        steps.push(Step::abort_on_failure(StepAction::StartService {
            service: params.service_name.clone(),
        }));

        Self { kind, steps }
    }

    pub fn simple(params: &DeployParams) -> Self {
        Self::build(params, DeployKind::Simple)
    }

    pub fn node(params: &DeployParams) -> Self {
        Self::build(params, DeployKind::Node)
    }

    pub fn kind(&self) -> DeployKind {
        self.kind
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}
