//! Status and schedule verification commands

use anyhow::Context;
use clap::Args;

use dbflow_client::HttpConnector;
use dbflow_workflow::{resolve_status, verify_time_machine};

use super::BundleArgs;

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub bundle: BundleArgs,
}

pub async fn run(args: StatusArgs) -> anyhow::Result<()> {
    let bundle = args.bundle.load()?;
    let store = args.bundle.store().await?;

    let status = resolve_status(&bundle, store.as_ref(), &HttpConnector).await?;
    let rendered = serde_yaml::to_string(&status).context("failed to render status")?;
    print!("{}", rendered);
    Ok(())
}

pub async fn verify_schedule(args: StatusArgs) -> anyhow::Result<()> {
    let bundle = args.bundle.load()?;
    let store = args.bundle.store().await?;

    verify_time_machine(&bundle, store.as_ref(), &HttpConnector).await?;
    println!("time machine schedule matches the request");
    Ok(())
}
