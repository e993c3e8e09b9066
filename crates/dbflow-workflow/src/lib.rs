//! Database provisioning workflows
//!
//! Drives a [`ResourceBundle`] of custom resources through a [`ResourceStore`]:
//! submit in dependency order, wait for the control plane to report the
//! database READY, and tear everything down again. Verification helpers read
//! back what the control plane actually did and compare it with the request.

#![deny(missing_docs)]

pub mod bundle;
pub mod env;
pub mod orchestrator;
pub mod report;
pub mod resolver;
pub mod schedule;
pub mod snapshot;
pub mod store;
pub mod verify;

#[cfg(test)]
mod testing;

pub use bundle::ResourceBundle;
pub use env::{WorkflowEnv, WorkflowTimings};
pub use orchestrator::{prepare_clone_source, Orchestrator};
pub use report::{Step, StepOutcome, StepStatus, WorkflowReport};
pub use resolver::{resolve, resolve_status, ResolvedDatabase};
pub use schedule::{schedule_mismatches, validate_schedule};
pub use snapshot::{select_snapshot_id, SnapshotType};
pub use store::{KubeStore, ResourceStore};
pub use verify::{probe_workload, verify_time_machine, workload_url};
