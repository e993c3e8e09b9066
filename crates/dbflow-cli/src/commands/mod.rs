//! CLI commands

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use tracing::{info_span, Span};
use uuid::Uuid;

use dbflow_common::retry::RetryConfig;
use dbflow_workflow::{KubeStore, ResourceBundle, WorkflowReport, WorkflowTimings};

pub mod deprovision;
pub mod provision;
pub mod status;

/// Where the templates live and which cluster to talk to
#[derive(Args, Debug, Clone)]
pub struct BundleArgs {
    /// Directory holding the resource templates
    #[arg(short = 't', long = "templates", env = "DBFLOW_TEMPLATES")]
    pub templates: PathBuf,

    /// Kubeconfig to use instead of the inferred configuration
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,
}

impl BundleArgs {
    /// Load the template directory
    pub fn load(&self) -> anyhow::Result<ResourceBundle> {
        ResourceBundle::load_dir(&self.templates)
            .with_context(|| format!("failed to load templates from {}", self.templates.display()))
    }

    /// `workflow` span for one run of `command` over these templates
    pub fn span(&self, command: &str) -> Span {
        info_span!(
            "workflow",
            run_id = %Uuid::new_v4(),
            command,
            templates = %self.templates.display()
        )
    }

    /// Connect to the cluster
    pub async fn store(&self) -> anyhow::Result<Arc<KubeStore>> {
        let store = KubeStore::connect(self.kubeconfig.as_deref())
            .await
            .context("failed to connect to the cluster")?;
        Ok(Arc::new(store))
    }
}

/// Poll budgets; defaults match the workflow defaults
#[derive(Args, Debug, Clone)]
pub struct TimingArgs {
    /// Seconds between database readiness checks
    #[arg(long, default_value_t = 60)]
    pub ready_interval_secs: u64,

    /// Database readiness checks before giving up
    #[arg(long, default_value_t = 80)]
    pub ready_attempts: u32,

    /// Seconds between workload phase checks
    #[arg(long, default_value_t = 1)]
    pub workload_interval_secs: u64,

    /// Workload phase checks before giving up
    #[arg(long, default_value_t = 300)]
    pub workload_attempts: u32,

    /// Seconds between database deletion checks
    #[arg(long, default_value_t = 60)]
    pub delete_interval_secs: u64,

    /// Database deletion checks before giving up
    #[arg(long, default_value_t = 10)]
    pub delete_attempts: u32,
}

impl TimingArgs {
    /// Convert into workflow timings
    pub fn timings(&self) -> WorkflowTimings {
        WorkflowTimings {
            database_ready: RetryConfig::new(
                Duration::from_secs(self.ready_interval_secs),
                self.ready_attempts,
            ),
            workload_running: RetryConfig::new(
                Duration::from_secs(self.workload_interval_secs),
                self.workload_attempts,
            ),
            database_deleted: RetryConfig::new(
                Duration::from_secs(self.delete_interval_secs),
                self.delete_attempts,
            ),
        }
    }
}

/// Print the per-step outcome and fail if the run failed
pub fn finish(report: WorkflowReport) -> anyhow::Result<()> {
    print!("{}", report);
    report.into_result()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        timings: TimingArgs,
    }

    #[test]
    fn test_default_timings_match_workflow_defaults() {
        let harness = Harness::try_parse_from(["harness"]).expect("parse");
        assert_eq!(harness.timings.timings(), WorkflowTimings::default());
    }

    #[test]
    fn test_timing_overrides() {
        let harness =
            Harness::try_parse_from(["harness", "--ready-interval-secs", "1", "--ready-attempts", "3"])
                .expect("parse");
        let timings = harness.timings.timings();
        assert_eq!(timings.database_ready.interval, Duration::from_secs(1));
        assert_eq!(timings.database_ready.max_attempts, 3);
    }
}
