// ABOUTME: Shared helpers for opening and releasing the deploy session.
// ABOUTME: Used by every command that talks to the server.

use tarploy::config::Config;
use tarploy::deploy::DeploySession;
use tarploy::diagnostics::{Diagnostics, Warning};
use tarploy::error::Result;
use tarploy::output::Output;

/// Resolve the connection identity from config and connect.
pub async fn open_session(config: &Config, output: &Output) -> Result<DeploySession> {
    let identity = config.identity()?;
    output.progress(&format!("  → Connecting to {}...", identity));

    let mut session = DeploySession::new(identity);
    session.connect().await?;
    Ok(session)
}

/// Disconnect, recording a warning instead of failing if teardown errors.
pub async fn close_session(session: &mut DeploySession, diag: &mut Diagnostics) {
    if let Err(e) = session.disconnect().await {
        diag.warn(Warning::ssh_disconnect(format!(
            "SSH disconnect failed for {}: {}",
            session.identity().server_address(),
            e
        )));
    }
}
