// ABOUTME: Outcome of a composite deploy workflow.
// ABOUTME: Records each executed step and any non-fatal warnings raised along the way.

use super::plan::DeployKind;
use crate::diagnostics::Diagnostics;

/// How a step finished without aborting the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    /// The step's remote command failed but its policy let the workflow continue.
    FailedNonFatal(String),
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Succeeded)
    }
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: &'static str,
    pub outcome: StepOutcome,
}

/// Steps run by a completed workflow, in order.
#[derive(Debug)]
pub struct DeployReport {
    kind: DeployKind,
    steps: Vec<StepRecord>,
    diagnostics: Diagnostics,
}

impl DeployReport {
    pub(crate) fn new(kind: DeployKind) -> Self {
        Self {
            kind,
            steps: Vec::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub(crate) fn record(&mut self, name: &'static str, outcome: StepOutcome) {
        self.steps.push(StepRecord { name, outcome });
    }

    pub(crate) fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn kind(&self) -> DeployKind {
        self.kind
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// True when every step succeeded outright.
    pub fn is_clean(&self) -> bool {
        self.steps.iter().all(|s| s.outcome.is_success())
    }
}
