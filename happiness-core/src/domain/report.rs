// happiness-core/src/domain/report.rs
//
// What each stage did, in numbers. Serialised into target/run_results.json.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSummary {
    pub name: String,
    pub rows: u64,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub table: String,
    pub rows_in: u64,
    pub rows_out: u64,
    /// All rows removed, whatever the reason (`rows_in - rows_out`).
    pub dropped_rows: u64,
    /// Geolocation rows removed because latitude or longitude was missing.
    pub missing_coordinates: u64,
    /// Geolocation rows whose coordinates were present but not numeric.
    pub malformed_coordinates: u64,
    pub dropped_columns: Vec<String>,
    pub missing_columns: Vec<String>,
    pub imputed_cells: u64,
    pub columns_before: Vec<String>,
    pub columns_after: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub multi_year_rows: u64,
    /// Multi-year rows left after the optional snapshot-country filter.
    pub filtered_multi_year_rows: u64,
    pub snapshot_rows: u64,
    pub overlapping_keys: u64,
    pub gold_rows: u64,
    pub shared_columns: Vec<String>,
    /// Multi-year countries with no region in the snapshot.
    pub countries_without_region: Vec<String>,
    /// Countries with several regions in the snapshot.
    pub ambiguous_regions: Vec<String>,
    pub missing_coordinates: u64,
    /// Gold countries with no geolocation match.
    pub countries_without_coordinates: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub files: Vec<String>,
    pub geolocation_cached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageReport {
    Import(ImportReport),
    Clean { reports: Vec<CleaningReport> },
    Reconcile(ReconcileReport),
    Explore { artifacts: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub success: bool,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub elapsed_ms: u128,
    pub stages: Vec<StageReport>,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn test_stage_report_is_tagged() -> Result<()> {
        let report = StageReport::Reconcile(ReconcileReport {
            gold_rows: 3,
            ..Default::default()
        });
        let json = serde_json::to_value(&report)?;
        assert_eq!(json["stage"], "reconcile");
        assert_eq!(json["gold_rows"], 3);
        Ok(())
    }
}
