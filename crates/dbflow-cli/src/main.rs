//! dbflow - database workflows over a control-plane operator

use clap::Parser;

use dbflow_cli::telemetry::init_telemetry;
use dbflow_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // kube and reqwest must agree on one rustls provider
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("failed to install rustls crypto provider: {:?}", e);
        std::process::exit(1);
    }

    let cli = Cli::parse();
    init_telemetry(cli.log_format)?;
    cli.run().await
}
