//! liberty CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use liberty_cli::cmd;
use liberty_cli::{Cli, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let manifest = cli.manifest.as_path();
    match cli.command {
        Commands::InstallFeature { container } => {
            cmd::install::install_feature(manifest, container.as_deref()).await
        }
        Commands::PrepareFeature { runtime_version } => {
            cmd::prepare::prepare_feature(manifest, runtime_version.as_deref()).await
        }
        Commands::Features { container } => {
            cmd::features::features(manifest, container.as_deref()).await
        }
        Commands::Boms => cmd::boms::boms(manifest),
    }
}
