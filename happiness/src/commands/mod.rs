// happiness/src/commands/mod.rs

pub mod clean;
pub mod inspect;
pub mod load;
pub mod run;
pub mod serve;
pub mod stages;

use anyhow::Context;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use std::path::Path;

use happiness_core::domain::project::{PipelineConfig, ProjectLayout};
use happiness_core::domain::report::TableSummary;
use happiness_core::infrastructure::adapters::duckdb::DuckDBConnector;
use happiness_core::infrastructure::config::project::load_pipeline_config;

/// Everything a command needs to touch a project: config, paths and a fresh engine.
pub struct Project {
    pub config: PipelineConfig,
    pub layout: ProjectLayout,
    pub connector: DuckDBConnector,
}

pub fn open_project(project_dir: &Path) -> anyhow::Result<Project> {
    println!("⚙️  Loading configuration...");
    let config = load_pipeline_config(project_dir).with_context(|| {
        format!(
            "Failed to load project configuration from {:?}",
            project_dir
        )
    })?;
    println!("   Project: {}", config.name);

    let layout = ProjectLayout::new(project_dir, &config);
    let connector =
        DuckDBConnector::in_memory().context("Failed to initialize in-memory DuckDB")?;
    Ok(Project {
        config,
        layout,
        connector,
    })
}

pub fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn summary_table(summaries: &[TableSummary]) -> Table {
    let mut table = new_table(vec!["Table", "Rows", "Columns"]);
    for s in summaries {
        table.add_row(vec![s.name.clone(), s.rows.to_string(), s.columns.len().to_string()]);
    }
    table
}
