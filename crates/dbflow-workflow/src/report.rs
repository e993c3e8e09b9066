//! Per-step outcome of a workflow run
//!
//! Creation and deletion failures do not stop a run. They are recorded here so
//! callers can see exactly which steps went through without scraping logs.
//! Only a failed wait is a hard failure of the whole run.

use std::fmt;

use dbflow_common::{Error, Result};

/// A unit of work in provisioning or deprovisioning
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Step {
    /// Database credential record
    DatabaseSecret,
    /// Control plane credential record
    ServerSecret,
    /// Server registration record
    Server,
    /// Database record
    Database,
    /// Verification workload
    AppPod,
    /// Network-exposure Service of the database
    Service,
    /// Wait for the database record to report READY
    WaitDatabaseReady,
    /// Wait for the verification workload to be Running
    WaitAppPodRunning,
    /// Wait for the deleted database record to disappear
    WaitDatabaseDeleted,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::DatabaseSecret => "database-secret",
            Step::ServerSecret => "server-secret",
            Step::Server => "server",
            Step::Database => "database",
            Step::AppPod => "app-pod",
            Step::Service => "service",
            Step::WaitDatabaseReady => "wait-database-ready",
            Step::WaitAppPodRunning => "wait-app-pod-running",
            Step::WaitDatabaseDeleted => "wait-database-deleted",
        };
        f.pad(name)
    }
}

/// What happened to a step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepStatus {
    /// Step ran and succeeded
    Completed,
    /// Resource absent from the bundle
    Skipped,
    /// Step ran and failed with this message
    Failed(String),
}

/// One recorded step
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    /// Which step
    pub step: Step,
    /// Its outcome
    pub status: StepStatus,
}

/// Ordered record of a workflow run
#[derive(Debug, Default)]
pub struct WorkflowReport {
    steps: Vec<StepOutcome>,
    error: Option<Error>,
}

impl WorkflowReport {
    /// Record a completed step
    pub fn completed(&mut self, step: Step) {
        self.push(step, StepStatus::Completed);
    }

    /// Record a skipped step
    pub fn skipped(&mut self, step: Step) {
        self.push(step, StepStatus::Skipped);
    }

    /// Record a step that failed without aborting the run
    pub fn failed(&mut self, step: Step, cause: &impl fmt::Display) {
        self.push(step, StepStatus::Failed(cause.to_string()));
    }

    /// Record a step whose failure fails the run; the first such error is kept
    pub fn failed_hard(&mut self, step: Step, error: Error) {
        self.failed(step, &error);
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    fn push(&mut self, step: Step, status: StepStatus) {
        self.steps.push(StepOutcome { step, status });
    }

    /// All steps in execution order
    pub fn steps(&self) -> &[StepOutcome] {
        &self.steps
    }

    /// Outcome of the first occurrence of `step`
    pub fn status(&self, step: Step) -> Option<&StepStatus> {
        self.steps
            .iter()
            .find(|outcome| outcome.step == step)
            .map(|outcome| &outcome.status)
    }

    /// Steps that failed, hard or not
    pub fn failures(&self) -> impl Iterator<Item = &StepOutcome> {
        self.steps
            .iter()
            .filter(|outcome| matches!(outcome.status, StepStatus::Failed(_)))
    }

    /// The error that failed the run, if any
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// True when no step failed
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Turn a hard failure into `Err`, otherwise hand the report back
    pub fn into_result(mut self) -> Result<Self> {
        match self.error.take() {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}

impl fmt::Display for WorkflowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.steps {
            match &outcome.status {
                StepStatus::Completed => writeln!(f, "{:<24} ok", outcome.step)?,
                StepStatus::Skipped => writeln!(f, "{:<24} skipped", outcome.step)?,
                StepStatus::Failed(msg) => writeln!(f, "{:<24} FAILED: {}", outcome.step, msg)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_failures_do_not_fail_the_run() {
        let mut report = WorkflowReport::default();
        report.completed(Step::DatabaseSecret);
        report.failed(Step::ServerSecret, &"already exists");
        report.skipped(Step::Server);

        assert_eq!(report.failures().count(), 1);
        assert!(!report.is_clean());
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_first_hard_failure_wins() {
        let mut report = WorkflowReport::default();
        report.failed_hard(
            Step::WaitDatabaseReady,
            Error::not_ready("Database", "orders", "CREATING"),
        );
        report.failed_hard(
            Step::WaitAppPodRunning,
            Error::not_ready("Pod", "app", "Pending"),
        );

        let err = report.into_result().unwrap_err();
        assert!(err.to_string().contains("CREATING"));
    }

    #[test]
    fn test_status_lookup_and_display() {
        let mut report = WorkflowReport::default();
        report.completed(Step::Database);
        report.failed(Step::AppPod, &"quota exceeded");

        assert_eq!(report.status(Step::Database), Some(&StepStatus::Completed));
        assert_eq!(report.status(Step::Server), None);

        let rendered = report.to_string();
        assert!(rendered.starts_with(&format!("{:<24} ok", "database")));
        assert!(rendered.contains("FAILED: quota exceeded"));
    }
}
