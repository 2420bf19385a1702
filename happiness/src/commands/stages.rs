// happiness/src/commands/stages.rs
//
// USE CASE: Run one pipeline stage on its own, for debugging.

use anyhow::Context;
use std::path::PathBuf;

use happiness_core::application::{run_engineer, run_explore, run_import, run_preprocess};
use happiness_core::domain::report::CleaningReport;
use happiness_core::infrastructure::http::HttpFetcher;

use super::{new_table, open_project};

pub async fn import(project_dir: PathBuf) -> anyhow::Result<()> {
    let p = open_project(&project_dir)?;
    let fetcher = HttpFetcher::new()?;
    let report = run_import(&p.layout, &p.config, &fetcher, &p.connector)
        .await
        .context("Import failed")?;

    for file in &report.files {
        println!("   ➜ {}", file);
    }
    if report.geolocation_cached {
        println!("   (geolocation already present, not downloaded again)");
    }
    println!("✨ {} files in bronze", report.files.len());
    Ok(())
}

/// Coordinate counts are a breakdown of `dropped_rows`, not additions to it.
fn cleaning_row(r: &CleaningReport) -> Vec<String> {
    vec![
        r.table.clone(),
        r.rows_in.to_string(),
        r.rows_out.to_string(),
        r.dropped_rows.to_string(),
        r.missing_coordinates.to_string(),
        r.malformed_coordinates.to_string(),
        r.imputed_cells.to_string(),
        r.dropped_columns.join(", "),
    ]
}

pub async fn preprocess(project_dir: PathBuf) -> anyhow::Result<()> {
    let p = open_project(&project_dir)?;
    let reports = run_preprocess(&p.layout, &p.config, &p.connector)
        .await
        .context("Preprocessing failed")?;

    let mut table = new_table(vec![
        "Table",
        "Rows in",
        "Rows out",
        "Dropped rows",
        "Missing coords",
        "Malformed coords",
        "Imputed cells",
        "Dropped columns",
    ]);
    for r in &reports {
        table.add_row(cleaning_row(r));
    }
    println!("{table}");
    Ok(())
}

pub async fn engineer(project_dir: PathBuf) -> anyhow::Result<()> {
    let p = open_project(&project_dir)?;
    let report = run_engineer(&p.layout, &p.config, &p.connector)
        .await
        .context("Reconciliation failed")?;

    let mut table = new_table(vec!["Metric", "Value"]);
    table.add_row(vec!["multi-year rows".to_string(), report.multi_year_rows.to_string()]);
    table.add_row(vec![
        "after country filter".to_string(),
        report.filtered_multi_year_rows.to_string(),
    ]);
    table.add_row(vec!["2021 rows".to_string(), report.snapshot_rows.to_string()]);
    table.add_row(vec!["overlapping keys".to_string(), report.overlapping_keys.to_string()]);
    table.add_row(vec!["gold rows".to_string(), report.gold_rows.to_string()]);
    table.add_row(vec!["shared columns".to_string(), report.shared_columns.join(", ")]);
    table.add_row(vec![
        "missing coordinates".to_string(),
        report.missing_coordinates.to_string(),
    ]);
    println!("{table}");

    if !report.countries_without_coordinates.is_empty() {
        println!(
            "   ⚠️  No coordinates for: {}",
            report.countries_without_coordinates.join(", ")
        );
    }
    if !report.countries_without_region.is_empty() {
        println!(
            "   ⚠️  No region for: {}",
            report.countries_without_region.join(", ")
        );
    }
    Ok(())
}

pub async fn explore(project_dir: PathBuf) -> anyhow::Result<()> {
    let p = open_project(&project_dir)?;
    let artifacts = run_explore(&p.layout, &p.config, &p.connector)
        .await
        .context("Exploration failed")?;

    for path in &artifacts {
        println!("   🖼️  {}", path);
    }
    println!("✨ {} charts written", artifacts.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleaning_row_counts_dropped_rows_once() {
        let report = CleaningReport {
            table: "silver_geolocation".to_string(),
            rows_in: 10,
            rows_out: 7,
            dropped_rows: 3,
            missing_coordinates: 2,
            malformed_coordinates: 1,
            ..Default::default()
        };
        let row = cleaning_row(&report);
        assert_eq!(row[3], "3");
        assert_eq!(row[4], "2");
        assert_eq!(row[5], "1");
    }
}
