// ABOUTME: Deploy command implementation.
// ABOUTME: Connects, runs the simple or node workflow, and always disconnects.

use super::connection::{close_session, open_session};
use tarploy::config::Config;
use tarploy::deploy::DeployKind;
use tarploy::diagnostics::Diagnostics;
use tarploy::error::Result;
use tarploy::output::Output;
use tarploy::types::ServiceName;

/// Deploy the configured tarball to the configured server.
pub async fn deploy(config: Config, kind: DeployKind, mut output: Output) -> Result<()> {
    let params = config.deploy_params()?;

    output.start_timer();
    output.progress(&format!(
        "Deploying {} to {} ({} deploy)",
        params.local_tarball_path.display(),
        config.service,
        kind
    ));

    let mut diag = Diagnostics::default();
    let mut session = open_session(&config, &output).await?;

    let result = match kind {
        DeployKind::Simple => session.simple_deploy(&params).await,
        DeployKind::Node => session.node_deploy(&params).await,
    };

    // Release the connection before looking at the result
    close_session(&mut session, &mut diag).await;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            for message in failure_warnings(&config.service, &diag) {
                output.warning(&message);
            }
            return Err(e.into());
        }
    };

    for step in report.steps() {
        output.step(step.name, step.outcome.is_success());
    }

    for warning in report
        .diagnostics()
        .warnings()
        .iter()
        .chain(diag.warnings())
    {
        output.warning(&warning.message);
    }

    if report.is_clean() {
        output.success("Deployment complete!");
    } else {
        output.success("Deployment complete with warnings");
    }
    Ok(())
}

/// Warnings shown when the workflow aborts, teardown warnings included.
fn failure_warnings(service: &ServiceName, diag: &Diagnostics) -> Vec<String> {
    std::iter::once(format!(
        "deploy aborted; service {service} may be left stopped"
    ))
    .chain(diag.warnings().iter().map(|w| w.message.clone()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tarploy::diagnostics::Warning;

    #[test]
    fn failure_warnings_include_disconnect_problems() {
        let service = ServiceName::new("myapp").unwrap();
        let mut diag = Diagnostics::default();
        diag.push(Warning::ssh_disconnect(
            "SSH disconnect failed for app.example.com: broken pipe",
        ));

        let messages = failure_warnings(&service, &diag);

        assert_eq!(
            messages,
            [
                "deploy aborted; service myapp may be left stopped",
                "SSH disconnect failed for app.example.com: broken pipe",
            ]
        );
    }

    #[test]
    fn failure_warnings_without_diagnostics() {
        let service = ServiceName::new("myapp").unwrap();
        let messages = failure_warnings(&service, &Diagnostics::default());
        assert_eq!(messages.len(), 1);
    }
}
