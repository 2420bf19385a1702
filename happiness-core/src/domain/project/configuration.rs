// happiness-core/src/domain/project/configuration.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

pub const DEFAULT_HAPPINESS_SOURCE: &str =
    "https://www.kaggle.com/api/v1/datasets/download/ajaypalsinghlo/world-happiness-report-2021";
pub const DEFAULT_GEOLOCATION_SOURCE: &str =
    "https://raw.githubusercontent.com/google/dspl/master/samples/google/canonical/countries.csv";

/// How the cleaner fills missing numeric cells.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Imputation {
    /// Mean of the same country, then the global column mean.
    #[default]
    CountryMean,
    ColumnMean,
    Constant { value: f64 },
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationMethod {
    #[default]
    Pearson,
    Spearman,
}

impl CorrelationMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            CorrelationMethod::Pearson => "pearson",
            CorrelationMethod::Spearman => "spearman",
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct PipelineConfig {
    #[serde(default = "default_name")]
    #[validate(length(min = 1))]
    pub name: String,

    #[serde(rename = "data-dir", default = "default_data_dir")]
    #[validate(length(min = 1))]
    pub data_dir: String,

    #[serde(rename = "artifacts-dir", default = "default_artifacts_dir")]
    pub artifacts_dir: String,

    #[serde(rename = "target-path", default = "default_target_path")]
    #[validate(length(min = 1))]
    pub target_path: String,

    /// Extra paths for `clean`. Empty means the generated layers of the layout.
    #[serde(rename = "clean-targets", default)]
    pub clean_targets: Vec<String>,

    #[serde(default)]
    #[validate(nested)]
    pub sources: SourcesConfig,

    #[serde(default)]
    #[validate(nested)]
    pub cleaning: CleaningConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    #[serde(default)]
    #[validate(nested)]
    pub eda: EdaConfig,

    #[serde(default)]
    #[validate(nested)]
    pub dashboard: DashboardConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            artifacts_dir: default_artifacts_dir(),
            target_path: default_target_path(),
            clean_targets: Vec::new(),
            sources: SourcesConfig::default(),
            cleaning: CleaningConfig::default(),
            reconcile: ReconcileConfig::default(),
            eda: EdaConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct SourcesConfig {
    /// URL, local directory or local zip holding the happiness CSVs.
    #[validate(length(min = 1))]
    pub happiness: String,
    #[validate(length(min = 1))]
    pub geolocation: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            happiness: DEFAULT_HAPPINESS_SOURCE.to_string(),
            geolocation: DEFAULT_GEOLOCATION_SOURCE.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct CleaningConfig {
    #[serde(default)]
    #[validate(custom(function = "validate_imputation"))]
    pub imputation: Imputation,
    #[serde(rename = "default-year", default = "default_year")]
    #[validate(range(min = 1900, max = 2100))]
    pub default_year: i32,
}

fn validate_imputation(imputation: &Imputation) -> Result<(), validator::ValidationError> {
    match imputation {
        Imputation::Constant { value } if !value.is_finite() => {
            Err(validator::ValidationError::new("non_finite_constant"))
        }
        _ => Ok(()),
    }
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            imputation: Imputation::default(),
            default_year: default_year(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ReconcileConfig {
    #[serde(rename = "restrict-to-snapshot-countries", default = "default_true")]
    pub restrict_to_snapshot_countries: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            restrict_to_snapshot_countries: true,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct EdaConfig {
    #[serde(rename = "histogram-bins", default = "default_bins")]
    #[validate(range(min = 1, max = 200))]
    pub histogram_bins: usize,
    #[serde(rename = "correlation-method", default)]
    pub correlation_method: CorrelationMethod,
    /// Restrict correlations to the k most variable columns.
    #[serde(rename = "top-k", default)]
    pub top_k: Option<usize>,
}

impl Default for EdaConfig {
    fn default() -> Self {
        Self {
            histogram_bins: default_bins(),
            correlation_method: CorrelationMethod::default(),
            top_k: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Validate)]
pub struct DashboardConfig {
    #[serde(default = "default_host")]
    #[validate(length(min = 1))]
    pub host: String,
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_name() -> String {
    "world_happiness".to_string()
}
fn default_data_dir() -> String {
    "data".to_string()
}
fn default_artifacts_dir() -> String {
    "artifacts".to_string()
}
fn default_target_path() -> String {
    "target".to_string()
}
fn default_year() -> i32 {
    2021
}
fn default_true() -> bool {
    true
}
fn default_bins() -> usize {
    30
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8050
}
