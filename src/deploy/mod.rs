// ABOUTME: Remote deployment of a tarball to a systemd service.
// ABOUTME: Exports the session, its transport seam, deploy plans and error types.

mod error;
mod identity;
mod params;
mod plan;
mod report;
mod session;
mod transport;
mod validate;

pub use error::{DeployError, Result};
pub use identity::ConnectionIdentity;
pub use params::DeployParams;
pub use plan::{DeployKind, DeployPlan, FailurePolicy, Step, StepAction};
pub use report::{DeployReport, StepOutcome, StepRecord};
pub use session::DeploySession;
pub use transport::{Connector, SshConnector, Transport};
pub use validate::APPROOT_MARKER;
