//! Linear state machine of a pipeline run.
//!
//! `Idle → Terminating → Cleaning → ResolvingDeps → Packaging → Verifying →
//! Archiving → Reporting → Succeeded`, with any stage from `ResolvingDeps`
//! onward allowed to move to the terminal `Failed` state.

use super::error::{Error, Result};
use std::fmt;

/// A stage (or terminal outcome) of a pipeline run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Stage {
    /// Nothing has run yet.
    Idle,
    /// Signalling stale instances of the application.
    Terminating,
    /// Removing prior build artifacts.
    Cleaning,
    /// Looking up native tools on the host.
    ResolvingDeps,
    /// Running the packaging tool.
    Packaging,
    /// Checking the produced bundle.
    Verifying,
    /// Writing the distributable archive.
    Archiving,
    /// Emitting the success report.
    Reporting,
    /// Terminal: every stage succeeded.
    Succeeded,
    /// Terminal: a fatal stage failed.
    Failed,
}

impl Stage {
    /// Returns the short name used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Terminating => "terminate",
            Stage::Cleaning => "clean",
            Stage::ResolvingDeps => "resolve",
            Stage::Packaging => "package",
            Stage::Verifying => "verify",
            Stage::Archiving => "archive",
            Stage::Reporting => "report",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        }
    }

    /// The stage that follows this one on the success path.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Terminating),
            Stage::Terminating => Some(Stage::Cleaning),
            Stage::Cleaning => Some(Stage::ResolvingDeps),
            Stage::ResolvingDeps => Some(Stage::Packaging),
            Stage::Packaging => Some(Stage::Verifying),
            Stage::Verifying => Some(Stage::Archiving),
            Stage::Archiving => Some(Stage::Reporting),
            Stage::Reporting => Some(Stage::Succeeded),
            Stage::Succeeded | Stage::Failed => None,
        }
    }

    /// Whether a failure in this stage is fatal.
    ///
    /// Termination and cleanup suppress their own failures.
    pub fn is_fail_fast(&self) -> bool {
        matches!(
            self,
            Stage::ResolvingDeps
                | Stage::Packaging
                | Stage::Verifying
                | Stage::Archiving
                | Stage::Reporting
        )
    }

    /// Whether the run is over.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Succeeded | Stage::Failed)
    }

    /// Checks that moving from `self` to `to` is allowed.
    pub fn transition(self, to: Stage) -> Result<Stage> {
        let allowed = match to {
            Stage::Failed => self.is_fail_fast(),
            _ => self.next() == Some(to),
        };

        if allowed {
            Ok(to)
        } else {
            Err(Error::InvalidTransition { from: self, to })
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
