// happiness/src/commands/serve.rs
//
// USE CASE: Serve the dashboard over the gold table.

use anyhow::Context;
use std::path::PathBuf;

use happiness_core::application::load_gold_frame;
use happiness_core::infrastructure::web::{AppState, serve};

use super::open_project;

pub async fn execute(project_dir: PathBuf, port: Option<u16>) -> anyhow::Result<()> {
    let mut p = open_project(&project_dir)?;
    if let Some(port) = port {
        p.config.dashboard.port = port;
    }

    let gold = load_gold_frame(&p.connector, &p.layout)
        .await
        .with_context(|| {
            format!(
                "Failed to load {:?}\n👉 Have you run 'happiness run'?",
                p.layout.gold_file()
            )
        })?;
    println!("   Gold table: {} rows, {} columns", gold.height(), gold.width());

    let state = AppState::new(gold, p.config.eda.clone())?;
    serve(state, &p.config.dashboard).await?;
    Ok(())
}
