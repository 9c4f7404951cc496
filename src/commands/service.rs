// ABOUTME: Single service control commands: status, start and stop.
// ABOUTME: Each opens a session, runs one operation and disconnects.

use super::connection::{close_session, open_session};
use tarploy::config::Config;
use tarploy::diagnostics::Diagnostics;
use tarploy::error::Result;
use tarploy::output::Output;

pub async fn status(config: Config, output: Output) -> Result<()> {
    let mut diag = Diagnostics::default();
    let mut session = open_session(&config, &output).await?;

    let result = session.service_status(config.service.as_str()).await;
    close_session(&mut session, &mut diag).await;

    let status = result?;
    output.success(&format!("{}: {}", config.service, status));
    emit_warnings(&diag, &output);
    Ok(())
}

pub async fn start(config: Config, mut output: Output) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();
    let mut session = open_session(&config, &output).await?;

    output.progress(&format!("  → Starting {}...", config.service));
    let result = session.start_service(config.service.as_str()).await;
    close_session(&mut session, &mut diag).await;

    result?;
    emit_warnings(&diag, &output);
    output.success(&format!("Started {}", config.service));
    Ok(())
}

pub async fn stop(config: Config, mut output: Output) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();
    let mut session = open_session(&config, &output).await?;

    output.progress(&format!("  → Stopping {}...", config.service));
    let result = session.stop_service(config.service.as_str()).await;
    close_session(&mut session, &mut diag).await;

    result?;
    emit_warnings(&diag, &output);
    output.success(&format!("Stopped {}", config.service));
    Ok(())
}

fn emit_warnings(diag: &Diagnostics, output: &Output) {
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }
}
