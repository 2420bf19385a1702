// happiness/src/commands/load.rs
//
// USE CASE: Load a layer and show what is in it.

use anyhow::Context;
use std::path::PathBuf;

use happiness_core::application::load_layer;
use happiness_core::domain::project::Layer;

use super::{open_project, summary_table};

pub async fn execute(project_dir: PathBuf, layer: Layer) -> anyhow::Result<()> {
    let p = open_project(&project_dir)?;
    println!("📂 Loading {} layer from {}", layer, p.layout.layer_dir(layer).display());

    let summaries = load_layer(&p.connector, &p.layout, layer)
        .await
        .with_context(|| format!("Failed to load the {} layer", layer))?;

    println!("{}", summary_table(&summaries));
    Ok(())
}
