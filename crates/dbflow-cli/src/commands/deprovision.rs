//! Deprovision command

use clap::Args;

use dbflow_workflow::{Orchestrator, WorkflowEnv};

use super::{finish, BundleArgs, TimingArgs};

#[derive(Args, Debug)]
pub struct DeprovisionArgs {
    #[command(flatten)]
    pub bundle: BundleArgs,

    #[command(flatten)]
    pub timings: TimingArgs,
}

pub async fn run(args: DeprovisionArgs) -> anyhow::Result<()> {
    let bundle = args.bundle.load()?;
    let store = args.bundle.store().await?;
    let orchestrator = Orchestrator::new(store, WorkflowEnv::from_env())
        .with_timings(args.timings.timings())
        .with_span(args.bundle.span("deprovision"));

    finish(orchestrator.deprovision(&bundle).await?)
}
