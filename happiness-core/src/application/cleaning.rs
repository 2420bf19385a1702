// happiness-core/src/application/cleaning.rs
//
// Bronze -> silver: canonical names, typed columns, imputed gaps.

use std::collections::HashSet;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::domain::error::DomainError;
use crate::domain::naming::{quote_ident, quote_literal, to_snake_case};
use crate::domain::project::{CleaningConfig, Imputation, Layer, ProjectLayout};
use crate::domain::report::CleaningReport;
use crate::domain::schema::{ColumnKind, Dataset, DatasetSchema, REGION_REPLACEMENTS};
use crate::error::HappinessError;
use crate::ports::connector::Connector;

const STAGE_TABLE: &str = "__clean_stage";

/// Which raw column feeds each canonical column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    /// (canonical, raw) in vocabulary order.
    pub kept: Vec<(String, String)>,
    pub dropped: Vec<String>,
    pub missing: Vec<String>,
}

impl ColumnMapping {
    pub fn raw_for(&self, canonical: &str) -> Option<&str> {
        self.kept
            .iter()
            .find(|(c, _)| c == canonical)
            .map(|(_, raw)| raw.as_str())
    }
}

/// Snake-case, apply source renames, keep the vocabulary.
///
/// Later duplicates of a canonical name and columns outside the vocabulary
/// end up in `dropped`.
pub fn map_columns(schema: &DatasetSchema, raw_columns: &[String]) -> ColumnMapping {
    let snake: Vec<String> = raw_columns.iter().map(|c| to_snake_case(c)).collect();
    let present: HashSet<&str> = snake.iter().map(String::as_str).collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut matched: Vec<(String, String)> = Vec::new();
    let mut dropped = Vec::new();

    for (raw, snake_name) in raw_columns.iter().zip(&snake) {
        let canonical = match schema.rename_for(snake_name) {
            Some(target) if !present.contains(target) => target.to_string(),
            _ => snake_name.clone(),
        };
        if !schema.contains(&canonical) || !seen.insert(canonical.clone()) {
            dropped.push(raw.clone());
            continue;
        }
        matched.push((canonical, raw.clone()));
    }

    let mut kept = Vec::new();
    let mut missing = Vec::new();
    for spec in schema.columns {
        match matched.iter().find(|(c, _)| c == spec.name) {
            Some(pair) => kept.push(pair.clone()),
            None => missing.push(spec.name.to_string()),
        }
    }

    ColumnMapping {
        kept,
        dropped,
        missing,
    }
}

/// Trimmed text with empty strings as NULL.
fn text_expr(raw: &str) -> String {
    format!("NULLIF(TRIM(CAST({} AS VARCHAR)), '')", quote_ident(raw))
}

fn region_expr(raw: &str) -> String {
    let text = text_expr(raw);
    let arms: String = REGION_REPLACEMENTS
        .iter()
        .map(|(old, new)| format!(" WHEN {} THEN {}", quote_literal(old), quote_literal(new)))
        .collect();
    format!("CASE {text}{arms} ELSE {text} END")
}

fn numeric_expr(raw: &str) -> String {
    format!("TRY_CAST({} AS DOUBLE)", text_expr(raw))
}

fn year_expr(raw: &str) -> String {
    format!("CAST(ROUND({}) AS INTEGER)", numeric_expr(raw))
}

fn impute_expr(column: &str, strategy: &Imputation) -> String {
    let c = quote_ident(column);
    match strategy {
        Imputation::CountryMean => format!(
            "COALESCE({c}, AVG({c}) OVER (PARTITION BY country_name), AVG({c}) OVER ())"
        ),
        Imputation::ColumnMean => format!("COALESCE({c}, AVG({c}) OVER ())"),
        Imputation::Constant { value } => format!("COALESCE({c}, CAST({value} AS DOUBLE))"),
    }
}

fn null_sum(columns: &[&str], table: &str) -> String {
    let terms: Vec<String> = columns
        .iter()
        .map(|c| format!("COUNT(*) FILTER (WHERE {} IS NULL)", quote_ident(c)))
        .collect();
    format!("SELECT {} FROM {}", terms.join(" + "), quote_ident(table))
}

pub struct BronzeCleaner<'a> {
    connector: &'a dyn Connector,
    config: &'a CleaningConfig,
}

impl<'a> BronzeCleaner<'a> {
    pub fn new(connector: &'a dyn Connector, config: &'a CleaningConfig) -> Self {
        Self { connector, config }
    }

    /// Clean every bronze table into silver tables and files.
    pub async fn clean_layer(
        &self,
        layout: &ProjectLayout,
    ) -> Result<Vec<CleaningReport>, HappinessError> {
        let mut reports = Vec::new();
        for dataset in [Dataset::MultiYear, Dataset::Snapshot2021, Dataset::Geolocation] {
            let report = self
                .clean(
                    &DatasetSchema::for_dataset(dataset),
                    Layer::Bronze.table_for(dataset),
                    Layer::Silver.table_for(dataset),
                    Some(&layout.silver(Layer::Silver.file_for(dataset))),
                )
                .await?;
            reports.push(report);
        }
        Ok(reports)
    }

    /// Clean `source` into the `target` table, then export it to `output`.
    #[instrument(skip(self, schema, output), fields(dataset = %schema.dataset))]
    pub async fn clean(
        &self,
        schema: &DatasetSchema,
        source: &str,
        target: &str,
        output: Option<&Path>,
    ) -> Result<CleaningReport, HappinessError> {
        let columns_before: Vec<String> = self
            .connector
            .fetch_columns(source)
            .await?
            .into_iter()
            .map(|c| c.name)
            .collect();
        info!(table = source, "Columns before cleaning: {:?}", columns_before);

        let mapping = map_columns(schema, &columns_before);
        for raw in &mapping.dropped {
            warn!(table = source, "Dropping unexpected column '{}'", raw);
        }
        if !mapping.missing.is_empty() {
            info!(table = source, "Columns not present: {:?}", mapping.missing);
        }

        let is_geo = schema.dataset == Dataset::Geolocation;
        let mut required = vec!["country_name"];
        if is_geo {
            required.extend(["latitude", "longitude"]);
        } else if schema.default_year.is_none() {
            required.push("year");
        }
        if let Some(column) = required.into_iter().find(|c| mapping.raw_for(c).is_none()) {
            return Err(DomainError::MissingColumn {
                table: source.to_string(),
                column: column.to_string(),
            }
            .into());
        }

        // 1. Stage: canonical names and types.
        let mut select = Vec::new();
        let mut output_columns = Vec::new();
        for spec in schema.columns {
            let expr = match (mapping.raw_for(spec.name), spec.kind) {
                (Some(raw), ColumnKind::Year) => year_expr(raw),
                (Some(raw), ColumnKind::Numeric) => numeric_expr(raw),
                (Some(raw), ColumnKind::Region) => region_expr(raw),
                (Some(raw), ColumnKind::Country | ColumnKind::Text) => text_expr(raw),
                (None, ColumnKind::Year) if schema.default_year.is_some() => {
                    info!(table = source, year = self.config.default_year, "Defaulting missing year");
                    format!("CAST({} AS INTEGER)", self.config.default_year)
                }
                (None, _) => continue,
            };
            select.push(format!("{} AS {}", expr, quote_ident(spec.name)));
            output_columns.push(spec.name);
        }
        self.connector
            .execute(&format!(
                "CREATE OR REPLACE TEMP TABLE {} AS SELECT {} FROM {}",
                quote_ident(STAGE_TABLE),
                select.join(", "),
                quote_ident(source)
            ))
            .await?;

        let rows_in = self
            .connector
            .query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_ident(source)))
            .await?;

        // 2. Row filter.
        let mut keep = vec!["country_name IS NOT NULL".to_string()];
        if output_columns.contains(&"year") {
            keep.push("year IS NOT NULL".to_string());
        }
        let (mut missing_coordinates, mut malformed_coordinates) = (0, 0);
        if is_geo {
            keep.push("latitude IS NOT NULL AND longitude IS NOT NULL".to_string());
            let (lat, lon) = (
                mapping.raw_for("latitude").unwrap_or("latitude"),
                mapping.raw_for("longitude").unwrap_or("longitude"),
            );
            missing_coordinates = self
                .connector
                .query_scalar(&format!(
                    "SELECT COUNT(*) FROM {} WHERE {} IS NULL OR {} IS NULL",
                    quote_ident(source),
                    text_expr(lat),
                    text_expr(lon)
                ))
                .await?;
            malformed_coordinates = self
                .connector
                .query_scalar(&format!(
                    "SELECT COUNT(*) FROM {} WHERE {} IS NOT NULL AND {} IS NOT NULL AND ({} IS NULL OR {} IS NULL)",
                    quote_ident(source),
                    text_expr(lat),
                    text_expr(lon),
                    numeric_expr(lat),
                    numeric_expr(lon)
                ))
                .await?;
            if missing_coordinates > 0 {
                warn!(table = source, count = missing_coordinates, "Rows without coordinates dropped");
            }
            if malformed_coordinates > 0 {
                warn!(table = source, count = malformed_coordinates, "Rows with malformed coordinates excluded");
            }
        }
        self.connector
            .execute(&format!(
                "DELETE FROM {} WHERE NOT ({})",
                quote_ident(STAGE_TABLE),
                keep.join(" AND ")
            ))
            .await?;

        // 3. Imputation (happiness tables only).
        let numeric: Vec<&str> = if is_geo {
            Vec::new()
        } else {
            output_columns
                .iter()
                .copied()
                .filter(|c| schema.kind_of(c) == Some(ColumnKind::Numeric))
                .collect()
        };
        let nulls_before = if numeric.is_empty() {
            0
        } else {
            self.connector
                .query_scalar(&null_sum(&numeric, STAGE_TABLE))
                .await?
        };

        let projection: Vec<String> = output_columns
            .iter()
            .map(|c| {
                if numeric.contains(c) {
                    format!("{} AS {}", impute_expr(c, &self.config.imputation), quote_ident(c))
                } else {
                    quote_ident(c)
                }
            })
            .collect();
        self.connector
            .execute(&format!(
                "CREATE OR REPLACE TABLE {} AS SELECT {} FROM {}",
                quote_ident(target),
                projection.join(", "),
                quote_ident(STAGE_TABLE)
            ))
            .await?;
        self.connector
            .execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(STAGE_TABLE)))
            .await?;

        let nulls_after = if numeric.is_empty() {
            0
        } else {
            self.connector.query_scalar(&null_sum(&numeric, target)).await?
        };
        let rows_out = self
            .connector
            .query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_ident(target)))
            .await?;

        // 4. Deterministic order for the silver file.
        if let Some(path) = output {
            let key: Vec<&str> = if is_geo {
                vec!["country_name", "country"]
            } else {
                vec!["country_name", "year"]
            };
            let order: Vec<String> = key
                .iter()
                .copied()
                .chain(output_columns.iter().copied().filter(|c| !key.contains(c)))
                .filter(|c| output_columns.contains(c))
                .map(quote_ident)
                .collect();
            self.connector
                .export_csv(
                    &format!(
                        "SELECT * FROM {} ORDER BY {}",
                        quote_ident(target),
                        order.join(", ")
                    ),
                    path,
                )
                .await?;
            info!(path = %path.display(), "Silver table written");
        }

        let columns_after: Vec<String> = output_columns.iter().map(|c| c.to_string()).collect();
        info!(table = target, "Columns after cleaning: {:?}", columns_after);
        info!(table = target, rows_in, rows_out, "Cleaning finished");

        Ok(CleaningReport {
            table: target.to_string(),
            rows_in,
            rows_out,
            dropped_rows: rows_in.saturating_sub(rows_out),
            missing_coordinates,
            malformed_coordinates,
            dropped_columns: mapping.dropped,
            missing_columns: mapping.missing,
            imputed_cells: nulls_before.saturating_sub(nulls_after),
            columns_before,
            columns_after,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::frame::CellValue;
    use crate::infrastructure::adapters::duckdb::DuckDBConnector;
    use crate::ports::connector::CsvTyping;
    use anyhow::Result;
    use std::fs;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn bronze(connector: &DuckDBConnector, table: &str, csv: &str) -> Result<tempfile::TempDir> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("bronze.csv");
        fs::write(&path, csv)?;
        connector.register_source(table, &path, CsvTyping::AllText).await?;
        Ok(dir)
    }

    #[test]
    fn test_map_columns_snapshot() {
        let raw = strings(&[
            "Country name",
            "Regional indicator",
            "Ladder score",
            "Dystopia + residual",
            "Unnamed: 0",
        ]);
        let mapping = map_columns(&DatasetSchema::snapshot_2021(), &raw);
        assert_eq!(mapping.raw_for("dystopia_residual"), Some("Dystopia + residual"));
        assert_eq!(mapping.dropped, vec!["Unnamed: 0"]);
        assert!(mapping.missing.contains(&"year".to_string()));
        assert_eq!(mapping.kept[0].0, "country_name");
    }

    #[test]
    fn test_rename_only_when_target_absent() {
        let schema = DatasetSchema::geolocation();
        let mapping = map_columns(&schema, &strings(&["country", "latitude", "longitude", "name"]));
        assert_eq!(mapping.raw_for("country_name"), Some("name"));
        assert_eq!(mapping.raw_for("country"), Some("country"));

        let both = map_columns(&schema, &strings(&["name", "country_name", "latitude", "longitude"]));
        assert_eq!(both.raw_for("country_name"), Some("country_name"));
        assert_eq!(both.dropped, vec!["name"]);
    }

    #[test]
    fn test_duplicate_canonical_names_keep_first() {
        let mapping = map_columns(
            &DatasetSchema::multi_year(),
            &strings(&["Country name", "year", "Life Ladder", "life_ladder"]),
        );
        assert_eq!(mapping.raw_for("life_ladder"), Some("Life Ladder"));
        assert_eq!(mapping.dropped, vec!["life_ladder"]);
    }

    #[test]
    fn test_impute_expressions() {
        insta::assert_snapshot!(
            impute_expr("generosity", &Imputation::CountryMean),
            @r#"COALESCE("generosity", AVG("generosity") OVER (PARTITION BY country_name), AVG("generosity") OVER ())"#
        );
        assert_eq!(
            impute_expr("generosity", &Imputation::Constant { value: 0.5 }),
            r#"COALESCE("generosity", CAST(0.5 AS DOUBLE))"#
        );
    }

    #[tokio::test]
    async fn test_multi_year_cleaning_drops_and_imputes() -> Result<()> {
        let connector = DuckDBConnector::in_memory()?;
        let _dir = bronze(
            &connector,
            "bronze_multi_year",
            "Country name,year,Life Ladder,Generosity,Extra\n\
             Finland,2020,7.8,0.1,x\n\
             Finland,2021,,0.3,x\n\
             ,2021,5.0,0.2,x\n\
             Nepal,,5.1,0.2,x\n\
             Nepal,2021,5.2,,x\n",
        )
        .await?;

        let config = CleaningConfig::default();
        let cleaner = BronzeCleaner::new(&connector, &config);
        let report = cleaner
            .clean(&DatasetSchema::multi_year(), "bronze_multi_year", "silver_multi_year", None)
            .await?;

        assert_eq!(report.rows_in, 5);
        assert_eq!(report.rows_out, 3);
        assert_eq!(report.dropped_rows, 2);
        assert_eq!(report.dropped_columns, vec!["Extra"]);
        assert_eq!(report.imputed_cells, 2);
        assert_eq!(report.columns_after, vec!["country_name", "year", "life_ladder", "generosity"]);

        let frame = connector
            .fetch_frame(
                "silver",
                "SELECT * FROM silver_multi_year ORDER BY country_name, year",
            )
            .await?;
        // Finland 2021 ladder takes Finland's mean; Nepal's generosity falls back to the column mean.
        assert_eq!(frame.rows[1][2], CellValue::Float(7.8));
        let generosity = frame.rows[2][3].as_f64().unwrap();
        assert!((generosity - 0.2).abs() < 1e-9);
        Ok(())
    }

    #[tokio::test]
    async fn test_snapshot_defaults_year_and_renames_regions() -> Result<()> {
        let connector = DuckDBConnector::in_memory()?;
        let _dir = bronze(
            &connector,
            "bronze_2021",
            "Country name,Regional indicator,Ladder score\n\
             Japan,Eastern Asia,5.94\n\
             Finland,Western Europe,7.84\n",
        )
        .await?;

        let config = CleaningConfig::default();
        let out = tempfile::tempdir()?;
        let path = out.path().join("silver.csv");
        let report = BronzeCleaner::new(&connector, &config)
            .clean(&DatasetSchema::snapshot_2021(), "bronze_2021", "silver_2021", Some(&path))
            .await?;

        assert_eq!(report.rows_out, 2);
        assert_eq!(
            fs::read_to_string(&path)?,
            "country_name,regional_indicator,ladder_score,year\n\
             Finland,Western Europe,7.84,2021\n\
             Japan,East Asia,5.94,2021\n"
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_geolocation_counts_missing_and_malformed() -> Result<()> {
        let connector = DuckDBConnector::in_memory()?;
        let _dir = bronze(
            &connector,
            "bronze_geolocation",
            "country,country_name,latitude,longitude\n\
             FI,Finland,61.92,25.75\n\
             XK,Kosovo,,\n\
             ZZ,Nowhere,north,10\n",
        )
        .await?;

        let config = CleaningConfig::default();
        let report = BronzeCleaner::new(&connector, &config)
            .clean(&DatasetSchema::geolocation(), "bronze_geolocation", "silver_geolocation", None)
            .await?;

        assert_eq!(report.rows_out, 1);
        assert_eq!(report.missing_coordinates, 1);
        assert_eq!(report.malformed_coordinates, 1);
        assert_eq!(report.imputed_cells, 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_country_column_is_fatal() -> Result<()> {
        let connector = DuckDBConnector::in_memory()?;
        let _dir = bronze(&connector, "bronze_multi_year", "year,Life Ladder\n2020,7.0\n").await?;

        let config = CleaningConfig::default();
        let err = BronzeCleaner::new(&connector, &config)
            .clean(&DatasetSchema::multi_year(), "bronze_multi_year", "silver_multi_year", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HappinessError::Domain(DomainError::MissingColumn { ref column, .. }) if column == "country_name"
        ));
        Ok(())
    }
}
