// happiness-core/src/application/reconcile.rs
//
// Silver -> gold: align names, propagate regions, merge with precedence,
// attach coordinates.

use std::path::Path;
use tracing::{info, instrument, warn};

use crate::domain::aliases::{AliasMap, ColumnPlan, shared_columns};
use crate::domain::error::DomainError;
use crate::domain::naming::quote_ident;
use crate::domain::project::{Layer, ReconcileConfig};
use crate::domain::report::ReconcileReport;
use crate::domain::schema::Dataset;
use crate::error::HappinessError;
use crate::ports::connector::Connector;

const MULTI_RAW: &str = "__multi_raw";
const MULTI: &str = "__multi";
const SNAPSHOT: &str = "__snapshot";
const COMBINED: &str = "__combined";
const GEO: &str = "__geo";

pub const GOLD_TABLE: &str = "gold";
const KEY: [&str; 2] = ["country_name", "year"];
const REGION: &str = "regional_indicator";

/// `SELECT "source" AS "canonical", ...` for one aligned table.
fn aligned_select(plan: &ColumnPlan, table: &str) -> String {
    let projection: Vec<String> = plan
        .canonical_columns()
        .iter()
        .filter_map(|canonical| {
            let source = plan.source_of(canonical)?;
            Some(format!("{} AS {}", quote_ident(source), quote_ident(canonical)))
        })
        .collect();
    format!("SELECT {} FROM {}", projection.join(", "), quote_ident(table))
}

/// Both sources stacked; the snapshot wins on a shared key.
fn precedence_merge(columns: &[String]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    let cols = cols.join(", ");
    format!(
        "SELECT {cols} FROM (\
         SELECT {cols}, 0 AS __priority FROM {multi} \
         UNION ALL \
         SELECT {cols}, 1 AS __priority FROM {snapshot}\
         ) u QUALIFY ROW_NUMBER() OVER (PARTITION BY country_name, year ORDER BY __priority DESC, {cols}) = 1",
        multi = quote_ident(MULTI),
        snapshot = quote_ident(SNAPSHOT),
    )
}

async fn fetch_strings(
    connector: &dyn Connector,
    query: &str,
) -> Result<Vec<String>, HappinessError> {
    let frame = connector.fetch_frame("list", query).await?;
    Ok(frame
        .rows
        .iter()
        .filter_map(|r| r.first().and_then(|c| c.as_str()).map(str::to_string))
        .collect())
}

async fn count(connector: &dyn Connector, table: &str) -> Result<u64, HappinessError> {
    connector
        .query_scalar(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)))
        .await
}

async fn column_names(connector: &dyn Connector, table: &str) -> Result<Vec<String>, HappinessError> {
    Ok(connector
        .fetch_columns(table)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect())
}

pub struct SchemaReconciler<'a> {
    connector: &'a dyn Connector,
    config: &'a ReconcileConfig,
    aliases: AliasMap,
}

impl<'a> SchemaReconciler<'a> {
    pub fn new(connector: &'a dyn Connector, config: &'a ReconcileConfig) -> Self {
        Self {
            connector,
            config,
            aliases: AliasMap::default(),
        }
    }

    pub fn with_aliases(mut self, aliases: AliasMap) -> Self {
        self.aliases = aliases;
        self
    }

    fn plan(&self, table: &str, columns: &[String]) -> Result<ColumnPlan, DomainError> {
        let plan = self.aliases.plan(columns);
        for shadowed in &plan.shadowed {
            warn!(table, "Column '{}' collides with another after aliasing; ignored", shadowed);
        }
        if let Some(missing) = KEY.iter().find(|k| !plan.contains(k)) {
            return Err(DomainError::MissingColumn {
                table: table.to_string(),
                column: missing.to_string(),
            });
        }
        Ok(plan)
    }

    /// Reconcile the silver tables into the gold table, exporting it to `output`.
    #[instrument(skip(self, output))]
    pub async fn reconcile(&self, output: Option<&Path>) -> Result<ReconcileReport, HappinessError> {
        let c = self.connector;
        let multi_table = Layer::Silver.table_for(Dataset::MultiYear);
        let snapshot_table = Layer::Silver.table_for(Dataset::Snapshot2021);
        let geo_table = Layer::Silver.table_for(Dataset::Geolocation);

        // 1. Canonical names.
        let multi_plan = self.plan(multi_table, &column_names(c, multi_table).await?)?;
        let snapshot_plan = self.plan(snapshot_table, &column_names(c, snapshot_table).await?)?;
        for (from, to) in multi_plan.renames().into_iter().chain(snapshot_plan.renames()) {
            info!("Alias: {} -> {}", from, to);
        }
        c.execute(&format!(
            "CREATE OR REPLACE TEMP TABLE {} AS {}",
            quote_ident(MULTI_RAW),
            aligned_select(&multi_plan, multi_table)
        ))
        .await?;
        c.execute(&format!(
            "CREATE OR REPLACE TEMP TABLE {} AS {}",
            quote_ident(SNAPSHOT),
            aligned_select(&snapshot_plan, snapshot_table)
        ))
        .await?;

        let multi_year_rows = count(c, MULTI_RAW).await?;
        let snapshot_rows = count(c, SNAPSHOT).await?;
        info!(multi_year_rows, snapshot_rows, "Silver tables aligned");

        // 2. Region propagation.
        let mut report = ReconcileReport {
            multi_year_rows,
            snapshot_rows,
            ..Default::default()
        };
        if snapshot_plan.contains(REGION) {
            report.ambiguous_regions = fetch_strings(
                c,
                &format!(
                    "SELECT country_name FROM {} WHERE {r} IS NOT NULL GROUP BY country_name \
                     HAVING COUNT(DISTINCT {r}) > 1 ORDER BY country_name",
                    quote_ident(SNAPSHOT),
                    r = quote_ident(REGION)
                ),
            )
            .await?;
            if !report.ambiguous_regions.is_empty() {
                warn!(
                    "Several regions for {:?}; using the first label alphabetically",
                    report.ambiguous_regions
                );
            }

            let others: Vec<String> = multi_plan
                .canonical_columns()
                .iter()
                .filter(|col| col.as_str() != REGION)
                .map(|col| format!("m.{}", quote_ident(col)))
                .collect();
            let region_expr = if multi_plan.contains(REGION) {
                format!("COALESCE(m.{r}, r.{r})", r = quote_ident(REGION))
            } else {
                format!("r.{}", quote_ident(REGION))
            };
            c.execute(&format!(
                "CREATE OR REPLACE TEMP TABLE {multi} AS \
                 SELECT {others}, {region_expr} AS {region} \
                 FROM {raw} m LEFT JOIN (\
                 SELECT country_name, MIN({region}) AS {region} FROM {snapshot} GROUP BY country_name\
                 ) r ON m.country_name = r.country_name",
                multi = quote_ident(MULTI),
                raw = quote_ident(MULTI_RAW),
                snapshot = quote_ident(SNAPSHOT),
                region = quote_ident(REGION),
                others = others.join(", "),
            ))
            .await?;

            report.countries_without_region = fetch_strings(
                c,
                &format!(
                    "SELECT DISTINCT country_name FROM {} WHERE {} IS NULL ORDER BY country_name",
                    quote_ident(MULTI),
                    quote_ident(REGION)
                ),
            )
            .await?;
            if !report.countries_without_region.is_empty() {
                warn!(
                    count = report.countries_without_region.len(),
                    "No region match for {:?}", report.countries_without_region
                );
            }
        } else {
            c.execute(&format!(
                "CREATE OR REPLACE TEMP TABLE {} AS SELECT * FROM {}",
                quote_ident(MULTI),
                quote_ident(MULTI_RAW)
            ))
            .await?;
        }

        // 3. Snapshot-country filter.
        if self.config.restrict_to_snapshot_countries {
            c.execute(&format!(
                "DELETE FROM {m} WHERE country_name NOT IN (SELECT country_name FROM {s})",
                m = quote_ident(MULTI),
                s = quote_ident(SNAPSHOT)
            ))
            .await?;
        }
        report.filtered_multi_year_rows = count(c, MULTI).await?;
        info!(rows = report.filtered_multi_year_rows, "Multi-year rows kept");

        // 4. Shared columns and precedence merge.
        let multi_aligned = self.aliases.plan(&column_names(c, MULTI).await?);
        let snapshot_aligned = self.aliases.plan(&column_names(c, SNAPSHOT).await?);
        let shared = shared_columns(&multi_aligned, &snapshot_aligned);
        if shared.is_empty() {
            return Err(DomainError::NoSharedColumns {
                left: multi_table.to_string(),
                right: snapshot_table.to_string(),
            }
            .into());
        }
        info!("Shared columns: {:?}", shared);

        report.overlapping_keys = c
            .query_scalar(&format!(
                "SELECT COUNT(*) FROM (SELECT DISTINCT country_name, year FROM {}) a \
                 JOIN (SELECT DISTINCT country_name, year FROM {}) b USING (country_name, year)",
                quote_ident(MULTI),
                quote_ident(SNAPSHOT)
            ))
            .await?;
        c.execute(&format!(
            "CREATE OR REPLACE TEMP TABLE {} AS {}",
            quote_ident(COMBINED),
            precedence_merge(&shared)
        ))
        .await?;
        let combined_rows = count(c, COMBINED).await?;
        info!(
            overlapping = report.overlapping_keys,
            rows = combined_rows,
            "Snapshot rows appended"
        );

        // 5. Coordinates.
        let geo_columns = column_names(c, geo_table).await?;
        let code = if geo_columns.iter().any(|col| col == "country") {
            "CAST(country AS VARCHAR)"
        } else {
            "CAST(NULL AS VARCHAR)"
        };
        c.execute(&format!(
            "CREATE OR REPLACE TEMP TABLE {geo} AS \
             SELECT country_name, {code} AS country_code, latitude, longitude FROM {source} \
             QUALIFY ROW_NUMBER() OVER (PARTITION BY country_name ORDER BY {code} NULLS LAST, latitude, longitude) = 1",
            geo = quote_ident(GEO),
            source = quote_ident(geo_table),
        ))
        .await?;

        let combined_cols: Vec<String> = shared.iter().map(|col| format!("c.{}", quote_ident(col))).collect();
        c.execute(&format!(
            "CREATE OR REPLACE TABLE {gold} AS \
             SELECT {cols}, g.country_code, g.latitude, g.longitude, \
             (g.latitude IS NOT NULL AND g.longitude IS NOT NULL) AS has_coordinates \
             FROM {combined} c LEFT JOIN {geo} g ON c.country_name = g.country_name",
            gold = quote_ident(GOLD_TABLE),
            cols = combined_cols.join(", "),
            combined = quote_ident(COMBINED),
            geo = quote_ident(GEO),
        ))
        .await?;

        report.missing_coordinates = c
            .query_scalar(&format!(
                "SELECT COUNT(*) FROM {} WHERE NOT has_coordinates",
                quote_ident(GOLD_TABLE)
            ))
            .await?;
        report.countries_without_coordinates = fetch_strings(
            c,
            &format!(
                "SELECT DISTINCT country_name FROM {} WHERE NOT has_coordinates ORDER BY country_name",
                quote_ident(GOLD_TABLE)
            ),
        )
        .await?;
        if report.missing_coordinates > 0 {
            warn!(
                rows = report.missing_coordinates,
                "No coordinates for {:?}", report.countries_without_coordinates
            );
        }

        report.gold_rows = count(c, GOLD_TABLE).await?;
        report.shared_columns = shared;

        for table in [MULTI_RAW, MULTI, SNAPSHOT, COMBINED, GEO] {
            c.execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
                .await?;
        }

        // 6. Persist.
        if let Some(path) = output {
            c.export_csv(
                &format!(
                    "SELECT * FROM {} ORDER BY country_name, year",
                    quote_ident(GOLD_TABLE)
                ),
                path,
            )
            .await?;
            info!(path = %path.display(), rows = report.gold_rows, "Gold table written");
        }

        Ok(report)
    }
}
