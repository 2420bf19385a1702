// happiness-core/src/application/eda.rs
//
// Exploratory analysis over a private copy of the gold table.

use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::domain::frame::{CellValue, Frame};
use crate::domain::naming::label;
use crate::domain::project::configuration::{CorrelationMethod, EdaConfig};
use crate::domain::stats::{self, Bin, Describe};
use crate::error::HappinessError;
use crate::infrastructure::charts::{self, LineSeriesData};
use crate::infrastructure::fs::atomic_write;

pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: &'static str,
    pub non_null: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameInfo {
    pub rows: usize,
    pub columns: Vec<ColumnInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub column: String,
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub method: CorrelationMethod,
    pub columns: Vec<String>,
    /// Row-major; None where a pair has too few observations or no spread.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

pub struct EdaExplorer {
    frame: Frame,
    config: EdaConfig,
    artifacts_dir: Option<PathBuf>,
    written: Vec<PathBuf>,
}

impl EdaExplorer {
    /// The explorer keeps its own clone: nothing done here reaches the caller's frame.
    pub fn new(frame: &Frame, config: EdaConfig) -> Self {
        Self {
            frame: frame.clone(),
            config,
            artifacts_dir: None,
            written: Vec::new(),
        }
    }

    /// Write every chart as SVG into `dir`.
    pub fn with_artifacts(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts_dir = Some(dir.into());
        self
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Chart files written so far.
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.written
    }

    fn save(&mut self, file_name: &str, svg: &str) -> Result<Option<PathBuf>, HappinessError> {
        let Some(dir) = &self.artifacts_dir else {
            return Ok(None);
        };
        let path = dir.join(file_name);
        atomic_write(&path, svg)?;
        info!(path = ?path, "Chart saved");
        self.written.push(path.clone());
        Ok(Some(path))
    }

    /// Numeric columns, narrowed by `columns` and `exclude`.
    fn select_numeric(&self, columns: Option<&[String]>, exclude: &[String]) -> Vec<String> {
        let excluded: HashSet<&str> = exclude.iter().map(String::as_str).collect();
        self.frame
            .numeric_columns()
            .into_iter()
            .filter(|c| columns.is_none_or(|wanted| wanted.contains(c)))
            .filter(|c| !excluded.contains(c.as_str()))
            .collect()
    }

    pub fn preview(&self, n: usize) -> (Frame, Frame) {
        (self.frame.head(n), self.frame.tail(n))
    }

    pub fn info(&self) -> FrameInfo {
        let columns = self
            .frame
            .columns
            .iter()
            .map(|c| ColumnInfo {
                name: c.clone(),
                kind: if self.frame.is_numeric_column(c) {
                    "numeric"
                } else {
                    "text"
                },
                non_null: self.frame.height() - self.frame.null_count(c).unwrap_or(0),
            })
            .collect();
        FrameInfo {
            rows: self.frame.height(),
            columns,
        }
    }

    pub fn describe_numeric(&self, exclude: &[String]) -> Result<Vec<(String, Describe)>, HappinessError> {
        let mut out = Vec::new();
        for column in self.select_numeric(None, exclude) {
            if let Some(d) = stats::describe(&self.frame.numeric_values(&column)?) {
                out.push((column, d));
            }
        }
        Ok(out)
    }

    /// Most frequent values of each text column (nulls counted as "(missing)"),
    /// sorted by column, then count descending.
    pub fn describe_categorical(&self, top_n: usize) -> Result<Vec<CategoryCount>, HappinessError> {
        let mut out = Vec::new();
        for column in self.frame.text_columns() {
            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for cell in self.frame.column(&column)? {
                let key = match cell {
                    CellValue::Null => "(missing)".to_string(),
                    other => other.to_string(),
                };
                *counts.entry(key).or_default() += 1;
            }
            let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
            ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            out.extend(ranked.into_iter().take(top_n).map(|(value, count)| CategoryCount {
                column: column.clone(),
                value,
                count,
            }));
        }
        out.sort_by(|a, b| a.column.cmp(&b.column).then_with(|| b.count.cmp(&a.count)));
        Ok(out)
    }

    /// Null count per column (only columns with gaps), largest first.
    #[instrument(skip(self))]
    pub fn missing(&mut self) -> Result<Vec<(String, usize)>, HappinessError> {
        let mut gaps = Vec::new();
        for column in &self.frame.columns {
            let nulls = self.frame.null_count(column)?;
            if nulls > 0 {
                gaps.push((column.clone(), nulls));
            }
        }
        gaps.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        if !gaps.is_empty() {
            let labels: Vec<String> = gaps.iter().map(|(c, _)| c.clone()).collect();
            let values: Vec<f64> = gaps.iter().map(|(_, n)| *n as f64).collect();
            let svg = charts::bar_chart("Missing values by column", "Count", &labels, &values)?;
            self.save("missing.svg", &svg)?;
        }
        Ok(gaps)
    }

    #[instrument(skip(self))]
    pub fn histograms(
        &mut self,
        columns: Option<&[String]>,
        exclude: &[String],
        bins: Option<usize>,
    ) -> Result<Vec<(String, Vec<Bin>)>, HappinessError> {
        let bins = bins.unwrap_or(self.config.histogram_bins);
        let mut panels = Vec::new();
        for column in self.select_numeric(columns, exclude) {
            let values = self.frame.numeric_values(&column)?;
            panels.push((column, stats::histogram(&values, bins)));
        }
        if panels.is_empty() {
            warn!("No numeric columns to plot");
            return Ok(panels);
        }
        let svg = charts::histogram_grid("Distributions", &panels)?;
        self.save("histograms.svg", &svg)?;
        Ok(panels)
    }

    #[instrument(skip(self))]
    pub fn boxplots(
        &mut self,
        columns: Option<&[String]>,
        exclude: &[String],
    ) -> Result<Vec<(String, Describe)>, HappinessError> {
        let mut panels = Vec::new();
        let mut summaries = Vec::new();
        for column in self.select_numeric(columns, exclude) {
            let values = self.frame.numeric_values(&column)?;
            if let Some(d) = stats::describe(&values) {
                summaries.push((column.clone(), d));
                panels.push((column, values));
            }
        }
        if panels.is_empty() {
            warn!("No numeric columns to plot");
            return Ok(summaries);
        }
        let svg = charts::boxplot_grid("Box plots", &panels)?;
        self.save("boxplots.svg", &svg)?;
        Ok(summaries)
    }

    /// Pairwise correlation matrix. `top_k` keeps the most variable columns.
    #[instrument(skip(self))]
    pub fn correlations(
        &mut self,
        method: Option<CorrelationMethod>,
        top_k: Option<usize>,
    ) -> Result<CorrelationMatrix, HappinessError> {
        let method = method.unwrap_or(self.config.correlation_method);
        let top_k = top_k.or(self.config.top_k);
        let matrix = correlation_matrix(&self.frame, method, top_k)?;

        if !matrix.columns.is_empty() {
            let svg = charts::heatmap(
                &format!("Correlation heatmap ({})", method.as_str()),
                &matrix.columns,
                &matrix.values,
            )?;
            self.save(&format!("correlations_{}.svg", method.as_str()), &svg)?;
        }
        Ok(matrix)
    }

    /// Longitude/latitude points, optionally grouped by a text column.
    #[instrument(skip(self))]
    pub fn geo_scatter(
        &mut self,
        hue: Option<&str>,
    ) -> Result<Vec<(String, Vec<(f64, f64)>)>, HappinessError> {
        if !self.frame.has_column(LATITUDE) || !self.frame.has_column(LONGITUDE) {
            warn!(
                "Latitude/longitude not found (expected '{}', '{}')",
                LATITUDE, LONGITUDE
            );
            return Ok(Vec::new());
        }
        let hue = hue.filter(|h| self.frame.has_column(h));
        let groups =
            crate::application::dashboard::scatter_groups(&self.frame, LONGITUDE, LATITUDE, hue)?;
        if groups.is_empty() {
            warn!("No rows with latitude/longitude to plot");
            return Ok(groups);
        }
        let svg = charts::scatter("Geographic scatter (lon vs lat)", LONGITUDE, LATITUDE, &groups)?;
        self.save("geo_scatter.svg", &svg)?;
        Ok(groups)
    }

    /// Mean of `metric` per year.
    #[instrument(skip(self))]
    pub fn trend(&mut self, metric: &str) -> Result<Vec<(i64, f64)>, HappinessError> {
        let points = crate::application::dashboard::yearly_mean(&self.frame, metric)?;
        if !points.is_empty() {
            let series = [LineSeriesData {
                label: label(metric),
                points: points.iter().map(|&(y, v)| (y as f64, v)).collect(),
            }];
            let svg = charts::line_chart(
                &format!("{} over time", label(metric)),
                "Year",
                &label(metric),
                &series,
            )?;
            self.save(&format!("trend_{}.svg", metric), &svg)?;
        }
        Ok(points)
    }

    /// Every chart with its defaults; returns the files written.
    pub fn run_all(&mut self, exclude: &[String]) -> Result<Vec<PathBuf>, HappinessError> {
        self.missing()?;
        self.histograms(None, exclude, None)?;
        self.boxplots(None, exclude)?;
        self.correlations(None, None)?;
        self.geo_scatter(Some("regional_indicator"))?;
        if self.frame.has_column("ladder_score") && self.frame.has_column("year") {
            self.trend("ladder_score")?;
        }
        Ok(self.written.clone())
    }
}

/// Pairwise-complete correlations between numeric columns (year excluded).
pub fn correlation_matrix(
    frame: &Frame,
    method: CorrelationMethod,
    top_k: Option<usize>,
) -> Result<CorrelationMatrix, HappinessError> {
    let mut columns: Vec<String> = frame
        .numeric_columns()
        .into_iter()
        .filter(|c| c != "year")
        .collect();

    if let Some(k) = top_k.filter(|k| *k > 0 && *k < columns.len()) {
        let mut by_variance: Vec<(String, f64)> = columns
            .iter()
            .map(|c| {
                let var = frame
                    .numeric_values(c)
                    .ok()
                    .and_then(|v| stats::variance(&v))
                    .unwrap_or(0.0);
                (c.clone(), var)
            })
            .collect();
        by_variance.sort_by(|a, b| b.1.total_cmp(&a.1));
        let keep: HashSet<String> = by_variance.into_iter().take(k).map(|(c, _)| c).collect();
        columns.retain(|c| keep.contains(c));
    }

    let indices = columns
        .iter()
        .map(|c| frame.require(c))
        .collect::<Result<Vec<_>, _>>()?;

    let n = columns.len();
    let mut values = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let (xs, ys): (Vec<f64>, Vec<f64>) = frame
                .rows
                .iter()
                .filter_map(|r| Some((r[indices[i]].as_f64()?, r[indices[j]].as_f64()?)))
                .unzip();
            let r = match method {
                CorrelationMethod::Pearson => stats::pearson(&xs, &ys),
                CorrelationMethod::Spearman => stats::spearman(&xs, &ys),
            };
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    Ok(CorrelationMatrix {
        method,
        columns,
        values,
    })
}

/// Paths relative to `root`, for reports.
pub fn relative_paths(paths: &[PathBuf], root: &Path) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            p.strip_prefix(root)
                .unwrap_or(p)
                .to_string_lossy()
                .into_owned()
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::frame::fixtures::gold_sample;
    use anyhow::Result;

    #[test]
    fn test_explorer_works_on_a_copy() -> Result<()> {
        let gold = gold_sample();
        let mut eda = EdaExplorer::new(&gold, EdaConfig::default());
        eda.frame.rows.clear();
        assert_eq!(gold.height(), 7);
        assert!(eda.missing()?.is_empty());
        Ok(())
    }

    #[test]
    fn test_describe_numeric_with_exclude() -> Result<()> {
        let eda = EdaExplorer::new(&gold_sample(), EdaConfig::default());
        let described = eda.describe_numeric(&["year".to_string()])?;
        let names: Vec<&str> = described.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(names, vec!["ladder_score", "latitude", "longitude"]);
        assert_eq!(described[1].1.count, 6);
        Ok(())
    }

    #[test]
    fn test_describe_categorical_orders_by_column_then_count() -> Result<()> {
        let eda = EdaExplorer::new(&gold_sample(), EdaConfig::default());
        let counts = eda.describe_categorical(1)?;
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].column, "country_name");
        assert_eq!(counts[0].value, "Denmark");
        assert_eq!(counts[1].value, "Western Europe");
        assert_eq!(counts[1].count, 4);
        Ok(())
    }

    #[test]
    fn test_missing_writes_chart() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut eda =
            EdaExplorer::new(&gold_sample(), EdaConfig::default()).with_artifacts(dir.path());
        let gaps = eda.missing()?;
        assert_eq!(gaps, vec![("latitude".to_string(), 1), ("longitude".to_string(), 1)]);
        assert!(dir.path().join("missing.svg").exists());
        Ok(())
    }

    #[test]
    fn test_correlations_top_k_and_symmetry() -> Result<()> {
        let gold = gold_sample();
        let full = correlation_matrix(&gold, CorrelationMethod::Pearson, None)?;
        assert_eq!(full.columns, vec!["ladder_score", "latitude", "longitude"]);
        let r = full.get("latitude", "longitude").unwrap();
        assert_eq!(Some(r), full.get("longitude", "latitude"));
        assert!((full.get("ladder_score", "ladder_score").unwrap() - 1.0).abs() < 1e-9);

        let top = correlation_matrix(&gold, CorrelationMethod::Spearman, Some(1))?;
        assert_eq!(top.columns, vec!["longitude"]);
        Ok(())
    }

    #[test]
    fn test_run_all_writes_every_chart() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut eda =
            EdaExplorer::new(&gold_sample(), EdaConfig::default()).with_artifacts(dir.path());
        let written = eda.run_all(&["year".to_string()])?;
        let names = relative_paths(&written, dir.path());
        assert_eq!(
            names,
            vec![
                "missing.svg",
                "histograms.svg",
                "boxplots.svg",
                "correlations_pearson.svg",
                "geo_scatter.svg",
                "trend_ladder_score.svg",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_geo_scatter_without_coordinates() -> Result<()> {
        let frame = gold_sample().select(&["country_name".to_string(), "year".to_string()])?;
        let mut eda = EdaExplorer::new(&frame, EdaConfig::default());
        assert!(eda.geo_scatter(None)?.is_empty());
        Ok(())
    }
}
