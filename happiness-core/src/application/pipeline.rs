// happiness-core/src/application/pipeline.rs

use std::path::Path;
use std::time::Instant;
use tracing::{error, info};

use crate::application::cleaning::BronzeCleaner;
use crate::application::eda::{EdaExplorer, relative_paths};
use crate::application::import::import_sources;
use crate::application::loader::{load_bronze, load_gold, load_silver};
use crate::application::reconcile::{GOLD_TABLE, SchemaReconciler};
use crate::domain::frame::Frame;
use crate::domain::naming::quote_ident;
use crate::domain::project::{PipelineConfig, ProjectLayout};
use crate::domain::report::{
    CleaningReport, ImportReport, ReconcileReport, RunResult, StageReport,
};
use crate::error::HappinessError;
use crate::infrastructure::fs::save_json;
use crate::ports::connector::Connector;
use crate::ports::fetcher::SourceFetcher;

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Reuse whatever is already in bronze.
    pub skip_import: bool,
}

/// Stage 1: sources -> bronze.
pub async fn run_import(
    layout: &ProjectLayout,
    config: &PipelineConfig,
    fetcher: &dyn SourceFetcher,
    connector: &dyn Connector,
) -> Result<ImportReport, HappinessError> {
    println!("📥 Importing sources into {}", layout.data_dir.join("bronze").display());
    import_sources(layout, &config.sources, fetcher, connector).await
}

/// Stage 2: bronze -> silver.
pub async fn run_preprocess(
    layout: &ProjectLayout,
    config: &PipelineConfig,
    connector: &dyn Connector,
) -> Result<Vec<CleaningReport>, HappinessError> {
    println!("🧽 Cleaning bronze tables...");
    load_bronze(connector, layout).await?;
    BronzeCleaner::new(connector, &config.cleaning)
        .clean_layer(layout)
        .await
}

/// Stage 3: silver -> gold.
pub async fn run_engineer(
    layout: &ProjectLayout,
    config: &PipelineConfig,
    connector: &dyn Connector,
) -> Result<ReconcileReport, HappinessError> {
    println!("🔗 Reconciling silver tables into gold...");
    load_silver(connector, layout).await?;
    SchemaReconciler::new(connector, &config.reconcile)
        .reconcile(Some(&layout.gold_file()))
        .await
}

/// Read the gold file into memory, ordered by key.
pub async fn load_gold_frame(
    connector: &dyn Connector,
    layout: &ProjectLayout,
) -> Result<Frame, HappinessError> {
    load_gold(connector, layout).await?;
    connector
        .fetch_frame(
            GOLD_TABLE,
            &format!(
                "SELECT * FROM {} ORDER BY country_name, year",
                quote_ident(GOLD_TABLE)
            ),
        )
        .await
}

/// Stage 4: gold -> charts in `artifacts/`.
pub async fn run_explore(
    layout: &ProjectLayout,
    config: &PipelineConfig,
    connector: &dyn Connector,
) -> Result<Vec<String>, HappinessError> {
    println!("📊 Exploring gold table...");
    let gold = load_gold_frame(connector, layout).await?;
    let mut explorer =
        EdaExplorer::new(&gold, config.eda.clone()).with_artifacts(&layout.artifacts_dir);
    let written = explorer.run_all(&["year".to_string()])?;
    Ok(relative_paths(&written, &layout.root))
}

async fn run_stages(
    layout: &ProjectLayout,
    config: &PipelineConfig,
    connector: &dyn Connector,
    fetcher: &dyn SourceFetcher,
    options: PipelineOptions,
    stages: &mut Vec<StageReport>,
) -> Result<(), HappinessError> {
    if options.skip_import {
        info!("Skipping import, reusing bronze layer");
    } else {
        stages.push(StageReport::Import(
            run_import(layout, config, fetcher, connector).await?,
        ));
    }

    let reports = run_preprocess(layout, config, connector).await?;
    stages.push(StageReport::Clean { reports });

    let report = run_engineer(layout, config, connector).await?;
    println!(
        "   🥇 Gold: {} rows ({} without coordinates)",
        report.gold_rows, report.missing_coordinates
    );
    stages.push(StageReport::Reconcile(report));

    let artifacts = run_explore(layout, config, connector).await?;
    stages.push(StageReport::Explore { artifacts });
    Ok(())
}

/// Run every stage in order. A failing stage stops the run; the error is
/// recorded in `target/run_results.json` alongside the finished stages.
pub async fn run_pipeline(
    project_dir: &Path,
    config: &PipelineConfig,
    connector: &dyn Connector,
    fetcher: &dyn SourceFetcher,
    options: PipelineOptions,
) -> Result<RunResult, HappinessError> {
    println!("🚀 Starting Pipeline Orchestrator...");
    let started_at = chrono::Utc::now();
    let start = Instant::now();
    let layout = ProjectLayout::new(project_dir, config);

    let mut stages = Vec::new();
    let mut errors = Vec::new();
    if let Err(e) = run_stages(&layout, config, connector, fetcher, options, &mut stages).await {
        error!("Pipeline stopped: {}", e);
        errors.push(e.to_string());
    }

    let result = RunResult {
        success: errors.is_empty(),
        started_at,
        elapsed_ms: start.elapsed().as_millis(),
        stages,
        errors,
    };
    save_json(&layout.run_results(), &result)?;
    info!(path = %layout.run_results().display(), "Run results saved");
    Ok(result)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::project::Layer;
    use crate::domain::project::layout::{BRONZE_2021, BRONZE_GEOLOCATION, BRONZE_MULTI_YEAR};
    use crate::infrastructure::adapters::duckdb::DuckDBConnector;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::fs;

    struct Offline;

    #[async_trait]
    impl SourceFetcher for Offline {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, HappinessError> {
            Err(HappinessError::InternalError(format!("offline: {url}")))
        }
    }

    fn seed_bronze(layout: &ProjectLayout) -> Result<()> {
        fs::create_dir_all(layout.layer_dir(Layer::Bronze))?;
        fs::write(
            layout.bronze(BRONZE_MULTI_YEAR),
            "Country name,year,Life Ladder,Log GDP per capita\n\
             Finland,2020,7.8,10.8\n\
             Finland,2021,7.8,10.8\n\
             Kosovo,2020,6.3,9.2\n",
        )?;
        fs::write(
            layout.bronze(BRONZE_2021),
            "Country name,Regional indicator,Ladder score,Logged GDP per capita\n\
             Finland,Western Europe,7.9,10.78\n\
             Kosovo,Central and Eastern Europe,6.37,9.3\n",
        )?;
        fs::write(
            layout.bronze(BRONZE_GEOLOCATION),
            "country,country_name,latitude,longitude\nFI,Finland,61.92,25.75\n",
        )?;
        Ok(())
    }

    #[tokio::test]
    async fn test_pipeline_end_to_end() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = PipelineConfig::default();
        let layout = ProjectLayout::new(dir.path(), &config);
        seed_bronze(&layout)?;

        let connector = DuckDBConnector::in_memory()?;
        let options = PipelineOptions { skip_import: true };
        let result = run_pipeline(dir.path(), &config, &connector, &Offline, options).await?;

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.stages.len(), 3);
        let gold = fs::read_to_string(layout.gold_file())?;
        assert!(gold.contains("Finland,7.9,"));
        assert!(layout.run_results().exists());
        assert!(layout.artifacts_dir.join("histograms.svg").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_import_is_recorded() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = PipelineConfig::default();
        let connector = DuckDBConnector::in_memory()?;

        let result = run_pipeline(
            dir.path(),
            &config,
            &connector,
            &Offline,
            PipelineOptions::default(),
        )
        .await?;

        assert!(!result.success);
        assert!(result.errors[0].contains("offline"));
        let saved: RunResult =
            serde_json::from_str(&fs::read_to_string(dir.path().join("target/run_results.json"))?)?;
        assert!(saved.stages.is_empty());
        Ok(())
    }
}
