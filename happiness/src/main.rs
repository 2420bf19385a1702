// happiness/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG=debug happiness run ... for the details
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            project_dir,
            skip_import,
        } => commands::run::execute(project_dir, skip_import).await?,
        Commands::Import { project_dir } => commands::stages::import(project_dir).await?,
        Commands::Preprocess { project_dir } => commands::stages::preprocess(project_dir).await?,
        Commands::Engineer { project_dir } => commands::stages::engineer(project_dir).await?,
        Commands::Explore { project_dir } => commands::stages::explore(project_dir).await?,
        Commands::Load { project_dir, layer } => commands::load::execute(project_dir, layer).await?,
        Commands::Inspect {
            project_dir,
            layer,
            table,
            limit,
        } => commands::inspect::execute(project_dir, layer, table, limit).await?,
        Commands::Serve { project_dir, port } => commands::serve::execute(project_dir, port).await?,
        Commands::Clean { project_dir } => commands::clean::execute(project_dir)?,
    }

    Ok(())
}
