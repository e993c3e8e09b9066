//! Provision command

use anyhow::Context;
use clap::Args;
use tracing::info;

use dbflow_client::{ControlPlaneConnector, HttpConnector};
use dbflow_workflow::{probe_workload, workload_url, Orchestrator, WorkflowEnv};

use super::{finish, BundleArgs, TimingArgs};

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub bundle: BundleArgs,

    #[command(flatten)]
    pub timings: TimingArgs,

    /// Clone from a snapshot of this control plane database
    #[arg(long)]
    pub clone_from: Option<String>,

    /// Once the workload runs, GET its first container port on this host
    #[arg(long)]
    pub probe_host: Option<String>,
}

pub async fn run(args: ProvisionArgs) -> anyhow::Result<()> {
    let mut bundle = args.bundle.load()?;
    let env = WorkflowEnv::from_env();
    let store = args.bundle.store().await?;
    let orchestrator = Orchestrator::new(store, env.clone())
        .with_timings(args.timings.timings())
        .with_span(args.bundle.span("provision"));

    if let Some(source) = &args.clone_from {
        let mut credentials = env.control_plane_credentials()?;
        if let Some(server) = &bundle.server {
            credentials = credentials
                .with_tenant(server.spec.tenant.clone())
                .with_insecure(server.spec.skip_certificate_verification);
        }
        let api = HttpConnector.connect(credentials)?;
        orchestrator
            .prepare_clone(&mut bundle, api.as_ref(), source)
            .await
            .with_context(|| format!("failed to prepare clone of '{}'", source))?;
    }

    finish(orchestrator.provision(&mut bundle).await?)?;

    if let (Some(host), Some(pod)) = (&args.probe_host, &bundle.app_pod) {
        let url = workload_url(pod, host).context("workload declares no container port")?;
        probe_workload(&url).await?;
    }

    info!("Provisioning complete");
    Ok(())
}
