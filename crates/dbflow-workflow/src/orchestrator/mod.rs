//! Provision, clone, and tear down a resource bundle
//!
//! One orchestrator serves both instances and clones; the difference lives in
//! the database record's [`DatabaseMode`](dbflow_common::crd::DatabaseMode).
//! Submission failures are recorded in the returned [`WorkflowReport`] and the
//! run carries on. Only an exhausted wait fails the run.
//!
//! [`WorkflowReport`]: crate::report::WorkflowReport

mod clone;
mod deprovision;
mod provision;

use std::sync::Arc;

use tracing::{info_span, Span};
use uuid::Uuid;

use dbflow_common::{log_failure, Result};

use crate::env::{WorkflowEnv, WorkflowTimings};
use crate::report::{Step, WorkflowReport};
use crate::store::ResourceStore;

pub use clone::prepare_clone_source;

/// Drives workflow runs against a resource store
pub struct Orchestrator {
    store: Arc<dyn ResourceStore>,
    env: WorkflowEnv,
    timings: WorkflowTimings,
    span: Span,
}

impl Orchestrator {
    /// Create an orchestrator with default timings and its own `workflow` span
    pub fn new(store: Arc<dyn ResourceStore>, env: WorkflowEnv) -> Self {
        let run_id = Uuid::new_v4();
        Self {
            store,
            env,
            timings: WorkflowTimings::default(),
            span: info_span!("workflow", run_id = %run_id),
        }
    }

    /// Override the poll budgets
    pub fn with_timings(mut self, timings: WorkflowTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Log everything this orchestrator does under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Span all workflow logs are recorded under
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Poll budgets in use
    pub fn timings(&self) -> &WorkflowTimings {
        &self.timings
    }
}

/// Record the outcome of a best-effort store call
fn record<T>(report: &mut WorkflowReport, step: Step, operation: &str, result: Result<T>) {
    match result {
        Ok(_) => report.completed(step),
        Err(e) => report.failed(step, &log_failure(operation, e)),
    }
}
