//! dbflow CLI library

pub mod commands;
pub mod telemetry;

use anyhow::Context;
use clap::{Parser, Subcommand};
use kube::CustomResourceExt;

use dbflow_common::crd::{ControlPlaneServer, Database};

use crate::telemetry::LogFormat;

/// dbflow - provision, clone, verify, and tear down control-plane databases
#[derive(Parser, Debug)]
#[command(name = "dbflow", version, about, long_about = None)]
pub struct Cli {
    /// Print the CRD manifests and exit
    #[arg(long)]
    pub crd: bool,

    /// Log line format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create every templated resource and wait for the database and workload
    Provision(commands::provision::ProvisionArgs),

    /// Delete every templated resource, waiting for the database to go away
    Deprovision(commands::deprovision::DeprovisionArgs),

    /// Show the control plane's view of the templated database
    Status(commands::status::StatusArgs),

    /// Compare the control plane's backup schedule with the requested one
    VerifySchedule(commands::status::StatusArgs),
}

impl Cli {
    /// Run the selected command
    pub async fn run(self) -> anyhow::Result<()> {
        if self.crd {
            println!("{}", crd_manifests()?);
            return Ok(());
        }

        match self.command {
            Some(Commands::Provision(args)) => commands::provision::run(args).await,
            Some(Commands::Deprovision(args)) => commands::deprovision::run(args).await,
            Some(Commands::Status(args)) => commands::status::run(args).await,
            Some(Commands::VerifySchedule(args)) => commands::status::verify_schedule(args).await,
            None => anyhow::bail!("no command given; see `dbflow --help`"),
        }
    }
}

/// Both CRDs as one multi-document YAML stream
pub fn crd_manifests() -> anyhow::Result<String> {
    let server = serde_yaml::to_string(&ControlPlaneServer::crd())
        .context("failed to serialize ControlPlaneServer CRD")?;
    let database =
        serde_yaml::to_string(&Database::crd()).context("failed to serialize Database CRD")?;
    Ok(format!("{}---\n{}", server, database))
}
