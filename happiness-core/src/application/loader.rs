// happiness-core/src/application/loader.rs
//
// Registers layer CSVs as in-memory tables.

use std::path::Path;
use tracing::{info, instrument};

use crate::domain::naming::quote_ident;
use crate::domain::project::{Layer, ProjectLayout};
use crate::domain::report::TableSummary;
use crate::error::HappinessError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::connector::{Connector, CsvTyping};

fn file_and_folder(path: &Path) -> (String, String) {
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let folder = path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string());
    (file, folder)
}

/// Load one CSV into `table`.
#[instrument(skip(connector, path), fields(path = %path.display()))]
pub async fn load_csv(
    connector: &dyn Connector,
    table: &str,
    path: &Path,
    typing: CsvTyping,
) -> Result<TableSummary, HappinessError> {
    let (file, folder) = file_and_folder(path);

    if !path.is_file() {
        return Err(InfrastructureError::SourceNotFound { file, folder }.into());
    }
    if std::fs::metadata(path)?.len() == 0 {
        return Err(InfrastructureError::EmptySource { file, folder }.into());
    }

    connector
        .register_source(table, path, typing)
        .await
        .map_err(|e| InfrastructureError::MalformedSource {
            file: file.clone(),
            reason: e.to_string(),
        })?;

    let rows = connector
        .query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)))
        .await?;
    let columns = connector
        .fetch_columns(table)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();

    info!(table, rows, "Loaded {}", file);
    Ok(TableSummary {
        name: table.to_string(),
        rows,
        columns,
    })
}

/// Load every file of a layer. Bronze stays untyped so the cleaner can
/// tell malformed values from missing ones.
pub async fn load_layer(
    connector: &dyn Connector,
    layout: &ProjectLayout,
    layer: Layer,
) -> Result<Vec<TableSummary>, HappinessError> {
    let typing = match layer {
        Layer::Bronze => CsvTyping::AllText,
        Layer::Silver | Layer::Gold => CsvTyping::Infer,
    };
    let dir = layout.layer_dir(layer);

    let mut summaries = Vec::new();
    for (table, file) in layer.files() {
        summaries.push(load_csv(connector, table, &dir.join(file), typing).await?);
    }
    Ok(summaries)
}

pub async fn load_bronze(
    connector: &dyn Connector,
    layout: &ProjectLayout,
) -> Result<Vec<TableSummary>, HappinessError> {
    load_layer(connector, layout, Layer::Bronze).await
}

pub async fn load_silver(
    connector: &dyn Connector,
    layout: &ProjectLayout,
) -> Result<Vec<TableSummary>, HappinessError> {
    load_layer(connector, layout, Layer::Silver).await
}

pub async fn load_gold(
    connector: &dyn Connector,
    layout: &ProjectLayout,
) -> Result<TableSummary, HappinessError> {
    let mut summaries = load_layer(connector, layout, Layer::Gold).await?;
    summaries
        .pop()
        .ok_or_else(|| HappinessError::InternalError("gold layer has no file".into()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::project::PipelineConfig;
    use crate::infrastructure::adapters::duckdb::DuckDBConnector;
    use anyhow::Result;
    use std::fs;

    #[tokio::test]
    async fn test_missing_file_names_file_and_folder() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let connector = DuckDBConnector::in_memory()?;
        let err = load_csv(&connector, "t", &dir.path().join("nope.csv"), CsvTyping::Infer)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("nope.csv"));
        assert!(message.contains(&dir.path().display().to_string()));
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_file_is_reported() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("empty.csv");
        fs::write(&path, "")?;
        let connector = DuckDBConnector::in_memory()?;
        let err = load_csv(&connector, "t", &path, CsvTyping::Infer)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HappinessError::Infrastructure(InfrastructureError::EmptySource { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_load_gold_summary() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let layout = ProjectLayout::new(dir.path(), &PipelineConfig::default());
        let gold = layout.gold_file();
        fs::create_dir_all(gold.parent().unwrap())?;
        fs::write(&gold, "country_name,year,ladder_score\nFinland,2021,7.9\nNepal,2021,5.27\n")?;

        let connector = DuckDBConnector::in_memory()?;
        let summary = load_gold(&connector, &layout).await?;
        assert_eq!(summary.name, "gold");
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.columns, vec!["country_name", "year", "ladder_score"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_bronze_stops_at_first_missing_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let layout = ProjectLayout::new(dir.path(), &PipelineConfig::default());
        let connector = DuckDBConnector::in_memory()?;
        let err = load_bronze(&connector, &layout).await.unwrap_err();
        assert!(err.to_string().contains("world-happiness-report.csv"));
        Ok(())
    }
}
