// happiness-core/src/application/dashboard.rs
//
// View-models behind the dashboard pages. Everything here reads a borrowed
// gold frame and returns owned, serialisable values; nothing mutates the frame.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::error::DomainError;
use crate::domain::frame::{CellValue, Frame};
use crate::domain::stats;

pub const COUNTRY: &str = "country_name";
pub const YEAR: &str = "year";
pub const REGION: &str = "regional_indicator";
pub const LADDER: &str = "ladder_score";
pub const MAX_TABLE_ROWS: usize = 200;

/// Row filters shared by every page. Empty fields keep everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameFilter {
    pub year_from: Option<i64>,
    pub year_to: Option<i64>,
    pub regions: Vec<String>,
    pub country: Option<String>,
}

impl FrameFilter {
    pub fn year(year: i64) -> Self {
        Self {
            year_from: Some(year),
            year_to: Some(year),
            ..Default::default()
        }
    }

    /// Read `year`, `year_from`, `year_to`, repeated `region` and `country`
    /// from raw query pairs. Unparseable or blank values are ignored.
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut filter = Self::default();
        for (key, value) in pairs {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "year" => {
                    if let Ok(y) = value.parse() {
                        filter.year_from = Some(y);
                        filter.year_to = Some(y);
                    }
                }
                "year_from" => filter.year_from = value.parse().ok(),
                "year_to" => filter.year_to = value.parse().ok(),
                "region" => filter.regions.push(value.to_string()),
                "country" => filter.country = Some(value.to_string()),
                _ => {}
            }
        }
        filter
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, frame: &Frame) -> Frame {
        if self.is_empty() {
            return frame.clone();
        }
        let year_idx = frame.column_index(YEAR);
        let region_idx = frame.column_index(REGION);
        let country_idx = frame.column_index(COUNTRY);
        let needle = self.country.as_ref().map(|c| c.to_lowercase());

        frame.filter(|row| {
            if let Some(idx) = year_idx {
                let year = row[idx].as_i64();
                if let Some(from) = self.year_from {
                    if year.is_none_or(|y| y < from) {
                        return false;
                    }
                }
                if let Some(to) = self.year_to {
                    if year.is_none_or(|y| y > to) {
                        return false;
                    }
                }
            }
            if let (Some(idx), false) = (region_idx, self.regions.is_empty()) {
                match row[idx].as_str() {
                    Some(region) if self.regions.iter().any(|r| r == region) => {}
                    _ => return false,
                }
            }
            if let (Some(idx), Some(needle)) = (country_idx, needle.as_deref()) {
                match row[idx].as_str() {
                    Some(country) if country.to_lowercase().contains(needle) => {}
                    _ => return false,
                }
            }
            true
        })
    }
}

/// Repeated values of one query key, in order.
pub fn query_values(pairs: &[(String, String)], key: &str) -> Vec<String> {
    pairs
        .iter()
        .filter(|(k, v)| k == key && !v.trim().is_empty())
        .map(|(_, v)| v.trim().to_string())
        .collect()
}

pub fn query_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, v)| k == key && !v.trim().is_empty())
        .map(|(_, v)| v.trim())
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetFacts {
    pub rows: usize,
    pub columns: usize,
    pub numeric_columns: usize,
    pub other_columns: usize,
    pub countries: usize,
    pub year_min: Option<i64>,
    pub year_max: Option<i64>,
}

pub fn dataset_facts(frame: &Frame) -> DatasetFacts {
    let numeric = frame.numeric_columns().len();
    let years = frame.distinct_ints(YEAR).unwrap_or_default();
    DatasetFacts {
        rows: frame.height(),
        columns: frame.width(),
        numeric_columns: numeric,
        other_columns: frame.width() - numeric,
        countries: frame.distinct_text(COUNTRY).map(|c| c.len()).unwrap_or(0),
        year_min: years.first().copied(),
        year_max: years.last().copied(),
    }
}

pub fn latest_year(frame: &Frame) -> Option<i64> {
    frame.distinct_ints(YEAR).ok()?.last().copied()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub country: String,
    pub region: Option<String>,
    pub value: f64,
}

/// Countries ordered by `metric` (best first unless `ascending`).
pub fn ranking(
    frame: &Frame,
    metric: &str,
    ascending: bool,
    n: usize,
) -> Result<Vec<RankEntry>, DomainError> {
    let country_idx = frame.require(COUNTRY)?;
    let metric_idx = frame.require(metric)?;
    let region_idx = frame.column_index(REGION);

    let mut entries: Vec<RankEntry> = frame
        .rows
        .iter()
        .filter_map(|row| {
            Some(RankEntry {
                country: row[country_idx].as_str()?.to_string(),
                region: region_idx.and_then(|i| row[i].as_str().map(str::to_string)),
                value: row[metric_idx].as_f64()?,
            })
        })
        .collect();
    entries.sort_by(|a, b| {
        let ord = a.value.total_cmp(&b.value);
        let ord = if ascending { ord } else { ord.reverse() };
        ord.then_with(|| a.country.cmp(&b.country))
    });
    entries.truncate(n);
    Ok(entries)
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeView {
    pub facts: DatasetFacts,
    pub latest_year: Option<i64>,
    pub top: Vec<RankEntry>,
    pub bottom: Vec<RankEntry>,
}

pub fn home_view(frame: &Frame, n: usize) -> HomeView {
    let latest = latest_year(frame);
    let (top, bottom) = match latest {
        Some(year) if frame.has_column(LADDER) => {
            let snapshot = FrameFilter::year(year).apply(frame);
            (
                ranking(&snapshot, LADDER, false, n).unwrap_or_default(),
                ranking(&snapshot, LADDER, true, n).unwrap_or_default(),
            )
        }
        _ => (Vec::new(), Vec::new()),
    };
    HomeView {
        facts: dataset_facts(frame),
        latest_year: latest,
        top,
        bottom,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub group: String,
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub median: f64,
    pub max: f64,
}

fn summarise(group: &str, values: &[f64]) -> Option<MetricSummary> {
    let d = stats::describe(values)?;
    Some(MetricSummary {
        group: group.to_string(),
        count: d.count,
        mean: d.mean,
        std: d.std,
        min: d.min,
        median: d.median,
        max: d.max,
    })
}

pub fn overall_summary(frame: &Frame, metric: &str) -> Result<Option<MetricSummary>, DomainError> {
    Ok(summarise("All", &frame.numeric_values(metric)?))
}

/// Non-null numeric values of `metric` grouped by the text in `by`.
fn grouped_values(
    frame: &Frame,
    by: &str,
    metric: &str,
) -> Result<BTreeMap<String, Vec<f64>>, DomainError> {
    let by_idx = frame.require(by)?;
    let metric_idx = frame.require(metric)?;
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for row in &frame.rows {
        let Some(value) = row[metric_idx].as_f64() else {
            continue;
        };
        let key = match &row[by_idx] {
            CellValue::Null => "(missing)".to_string(),
            other => other.to_string(),
        };
        groups.entry(key).or_default().push(value);
    }
    Ok(groups)
}

/// Per-region summary of `metric`, highest mean first.
pub fn regional_summary(frame: &Frame, metric: &str) -> Result<Vec<MetricSummary>, DomainError> {
    let mut out: Vec<MetricSummary> = grouped_values(frame, REGION, metric)?
        .iter()
        .filter_map(|(group, values)| summarise(group, values))
        .collect();
    out.sort_by(|a, b| b.mean.total_cmp(&a.mean).then_with(|| a.group.cmp(&b.group)));
    Ok(out)
}

/// Mean of `metric` per value of `by`, highest first, at most `top_n` groups.
pub fn group_average(
    frame: &Frame,
    by: &str,
    metric: &str,
    top_n: usize,
) -> Result<Vec<(String, f64)>, DomainError> {
    let mut out: Vec<(String, f64)> = grouped_values(frame, by, metric)?
        .into_iter()
        .filter_map(|(group, values)| Some((group, stats::mean(&values)?)))
        .collect();
    out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out.truncate(top_n);
    Ok(out)
}

/// Mean of `metric` per year, in year order.
pub fn yearly_mean(frame: &Frame, metric: &str) -> Result<Vec<(i64, f64)>, DomainError> {
    let year_idx = frame.require(YEAR)?;
    let metric_idx = frame.require(metric)?;
    let mut by_year: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for row in &frame.rows {
        if let (Some(year), Some(value)) = (row[year_idx].as_i64(), row[metric_idx].as_f64()) {
            by_year.entry(year).or_default().push(value);
        }
    }
    Ok(by_year
        .into_iter()
        .filter_map(|(year, values)| Some((year, stats::mean(&values)?)))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YoyEntry {
    pub country: String,
    pub region: Option<String>,
    pub previous: f64,
    pub current: f64,
    pub change: f64,
}

/// Largest increases of `metric` between `year - 1` and `year`.
/// Countries without a previous-year value are left out.
pub fn top_yoy_change(
    frame: &Frame,
    metric: &str,
    year: i64,
    n: usize,
) -> Result<Vec<YoyEntry>, DomainError> {
    let current = ranking(&FrameFilter::year(year).apply(frame), metric, false, usize::MAX)?;
    let previous: BTreeMap<String, f64> =
        ranking(&FrameFilter::year(year - 1).apply(frame), metric, false, usize::MAX)?
            .into_iter()
            .map(|e| (e.country, e.value))
            .collect();

    let mut out: Vec<YoyEntry> = current
        .into_iter()
        .filter_map(|e| {
            let prev = *previous.get(&e.country)?;
            Some(YoyEntry {
                change: e.value - prev,
                previous: prev,
                current: e.value,
                country: e.country,
                region: e.region,
            })
        })
        .collect();
    out.sort_by(|a, b| b.change.total_cmp(&a.change).then_with(|| a.country.cmp(&b.country)));
    out.truncate(n);
    Ok(out)
}

/// Latest-year table of the chosen metrics, best ladder score first.
pub fn snapshot_table(frame: &Frame, metrics: &[String], year: i64) -> Result<Frame, DomainError> {
    let mut columns: Vec<String> = [COUNTRY, REGION, YEAR]
        .iter()
        .map(|c| c.to_string())
        .chain(metrics.iter().cloned())
        .filter(|c| frame.has_column(c))
        .collect();
    columns.dedup();

    let mut snapshot = FrameFilter::year(year).apply(frame).select(&columns)?;
    if let Some(idx) = snapshot.column_index(LADDER) {
        snapshot.rows.sort_by(|a, b| {
            let av = a[idx].as_f64().unwrap_or(f64::NEG_INFINITY);
            let bv = b[idx].as_f64().unwrap_or(f64::NEG_INFINITY);
            bv.total_cmp(&av)
        });
    }
    snapshot.rows.truncate(MAX_TABLE_ROWS);
    Ok(snapshot)
}

/// Metrics preselected on the trends page.
pub fn default_trend_metrics(frame: &Frame) -> Vec<String> {
    let preferred: Vec<String> = [LADDER, "logged_gdp_per_capita"]
        .iter()
        .filter(|c| frame.has_column(c))
        .map(|c| c.to_string())
        .collect();
    if !preferred.is_empty() {
        return preferred;
    }
    frame
        .numeric_columns()
        .into_iter()
        .filter(|c| c != YEAR)
        .take(2)
        .collect()
}

/// Numeric columns a user may pick as a metric (year excluded).
pub fn metric_options(frame: &Frame) -> Vec<String> {
    frame
        .numeric_columns()
        .into_iter()
        .filter(|c| c != YEAR)
        .collect()
}

/// (x, y) pairs where both values are present, grouped by region.
pub fn scatter_groups(
    frame: &Frame,
    x: &str,
    y: &str,
    group_by: Option<&str>,
) -> Result<Vec<(String, Vec<(f64, f64)>)>, DomainError> {
    let x_idx = frame.require(x)?;
    let y_idx = frame.require(y)?;
    let g_idx = group_by.and_then(|g| frame.column_index(g));

    let mut groups: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
    for row in &frame.rows {
        if let (Some(xv), Some(yv)) = (row[x_idx].as_f64(), row[y_idx].as_f64()) {
            let key = g_idx
                .and_then(|i| row[i].as_str().map(str::to_string))
                .unwrap_or_default();
            groups.entry(key).or_default().push((xv, yv));
        }
    }
    Ok(groups.into_iter().collect())
}

/// Rows rendered as display strings (floats to 3 decimals, nulls blank).
#[derive(Debug, Clone, Serialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

pub fn table_view(frame: &Frame, limit: usize) -> TableView {
    let rows = frame
        .rows
        .iter()
        .take(limit)
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    CellValue::Float(v) => format!("{v:.3}"),
                    other => other.to_string(),
                })
                .collect()
        })
        .collect();
    TableView {
        columns: frame.columns.clone(),
        rows,
        total_rows: frame.height(),
    }
}

/// Longitude/latitude points grouped into `bands` quantile bands of `metric`.
pub fn geo_groups(
    frame: &Frame,
    metric: &str,
    bands: usize,
) -> Result<Vec<(String, Vec<(f64, f64)>)>, DomainError> {
    let lon_idx = frame.require("longitude")?;
    let lat_idx = frame.require("latitude")?;
    let metric_idx = frame.require(metric)?;

    let points: Vec<(f64, f64, f64)> = frame
        .rows
        .iter()
        .filter_map(|r| Some((r[lon_idx].as_f64()?, r[lat_idx].as_f64()?, r[metric_idx].as_f64()?)))
        .collect();
    let mut values: Vec<f64> = points.iter().map(|p| p.2).collect();
    values.sort_by(f64::total_cmp);
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let bands = bands.max(1);
    let edges: Vec<f64> = (1..=bands)
        .map(|i| stats::quantile(&values, i as f64 / bands as f64))
        .collect();
    let mut groups: Vec<(String, Vec<(f64, f64)>)> = Vec::with_capacity(bands);
    let mut lower = values[0];
    for upper in &edges {
        groups.push((format!("{lower:.2} - {upper:.2}"), Vec::new()));
        lower = *upper;
    }
    for (lon, lat, value) in points {
        let band = edges.iter().position(|e| value <= *e).unwrap_or(bands - 1);
        groups[band].1.push((lon, lat));
    }
    groups.retain(|(_, pts)| !pts.is_empty());
    Ok(groups)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::frame::fixtures::gold_sample;
    use anyhow::Result;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_filter_from_query_pairs() {
        let filter = FrameFilter::from_pairs(&pairs(&[
            ("year", "2021"),
            ("region", "South Asia"),
            ("region", "Western Europe"),
            ("country", " "),
        ]));
        assert_eq!(filter.year_from, Some(2021));
        assert_eq!(filter.regions.len(), 2);
        assert_eq!(filter.country, None);

        let rows = filter.apply(&gold_sample());
        assert_eq!(rows.height(), 3);
    }

    #[test]
    fn test_country_filter_is_case_insensitive_substring() {
        let filter = FrameFilter {
            country: Some("LAND".into()),
            ..Default::default()
        };
        let rows = filter.apply(&gold_sample());
        assert_eq!(rows.distinct_text(COUNTRY).unwrap(), vec!["Finland"]);
    }

    #[test]
    fn test_home_view_ranks_latest_year() {
        let view = home_view(&gold_sample(), 2);
        assert_eq!(view.latest_year, Some(2021));
        assert_eq!(view.facts.countries, 4);
        assert_eq!(view.facts.year_min, Some(2020));
        assert_eq!(view.top[0].country, "Finland");
        assert_eq!(view.bottom[0].country, "Nepal");
        assert_eq!(view.top.len(), 2);
    }

    #[test]
    fn test_yoy_change_skips_countries_without_previous_year() -> Result<()> {
        let yoy = top_yoy_change(&gold_sample(), LADDER, 2021, 10)?;
        let countries: Vec<&str> = yoy.iter().map(|e| e.country.as_str()).collect();
        assert_eq!(countries, vec!["Nepal", "Finland", "Denmark"]);
        assert!((yoy[0].change - 0.17).abs() < 1e-9);
        Ok(())
    }

    #[test]
    fn test_yearly_mean_and_group_average() -> Result<()> {
        let frame = gold_sample();
        let means = yearly_mean(&frame, LADDER)?;
        assert_eq!(means.len(), 2);
        assert!((means[0].1 - (7.6 + 7.8 + 5.1) / 3.0).abs() < 1e-9);

        let by_region = group_average(&frame, REGION, LADDER, 1)?;
        assert_eq!(by_region[0].0, "Western Europe");
        Ok(())
    }

    #[test]
    fn test_regional_summary_sorted_by_mean() -> Result<()> {
        let summary = regional_summary(&gold_sample(), LADDER)?;
        assert_eq!(summary.first().map(|s| s.group.as_str()), Some("Western Europe"));
        assert_eq!(summary.last().map(|s| s.group.as_str()), Some("South Asia"));
        Ok(())
    }

    #[test]
    fn test_snapshot_table_orders_by_ladder() -> Result<()> {
        let table = snapshot_table(&gold_sample(), &[LADDER.to_string()], 2021)?;
        assert_eq!(table.columns, vec![COUNTRY, REGION, YEAR, LADDER]);
        assert_eq!(table.rows[0][0], CellValue::Text("Finland".into()));
        Ok(())
    }

    #[test]
    fn test_scatter_groups_drop_missing_pairs() -> Result<()> {
        let groups = scatter_groups(&gold_sample(), "longitude", "latitude", Some(REGION))?;
        let total: usize = groups.iter().map(|(_, pts)| pts.len()).sum();
        assert_eq!(total, 6);
        Ok(())
    }

    #[test]
    fn test_table_view_formats_cells() {
        let view = table_view(&gold_sample(), 5);
        assert_eq!(view.total_rows, 7);
        assert_eq!(view.rows.len(), 5);
        assert_eq!(view.rows[0][3], "7.600");
        assert_eq!(view.rows[4][4], "");
    }

    #[test]
    fn test_geo_groups_cover_located_rows() -> Result<()> {
        let groups = geo_groups(&gold_sample(), LADDER, 3)?;
        let total: usize = groups.iter().map(|(_, pts)| pts.len()).sum();
        assert_eq!(total, 6);
        assert!(groups.len() <= 3);
        Ok(())
    }
}
