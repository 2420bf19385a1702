// happiness-core/src/domain/project/layout.rs
//
// Where every layer lives on disk, relative to the project directory.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::project::configuration::PipelineConfig;
use crate::domain::schema::Dataset;

pub const BRONZE_MULTI_YEAR: &str = "world-happiness-report.csv";
pub const BRONZE_2021: &str = "world-happiness-report-2021.csv";
pub const BRONZE_GEOLOCATION: &str = "geolocation.csv";

pub const SILVER_MULTI_YEAR: &str = "world_happiness_multi_silver.csv";
pub const SILVER_2021: &str = "world_happiness_2021_silver.csv";
pub const SILVER_GEOLOCATION: &str = "geolocation_silver.csv";

pub const GOLD_FILE: &str = "world_happiness_gold.csv";

pub const RUN_RESULTS: &str = "run_results.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Bronze,
    Silver,
    Gold,
}

impl Layer {
    pub fn as_str(self) -> &'static str {
        match self {
            Layer::Bronze => "bronze",
            Layer::Silver => "silver",
            Layer::Gold => "gold",
        }
    }

    /// Table names registered in the SQL engine, paired with file names.
    pub fn files(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Layer::Bronze => &[
                ("bronze_multi_year", BRONZE_MULTI_YEAR),
                ("bronze_2021", BRONZE_2021),
                ("bronze_geolocation", BRONZE_GEOLOCATION),
            ],
            Layer::Silver => &[
                ("silver_multi_year", SILVER_MULTI_YEAR),
                ("silver_2021", SILVER_2021),
                ("silver_geolocation", SILVER_GEOLOCATION),
            ],
            Layer::Gold => &[("gold", GOLD_FILE)],
        }
    }

    fn entry_for(self, dataset: Dataset) -> (&'static str, &'static str) {
        let idx = match dataset {
            Dataset::MultiYear => 0,
            Dataset::Snapshot2021 => 1,
            Dataset::Geolocation => 2,
        };
        self.files().get(idx).copied().unwrap_or(("gold", GOLD_FILE))
    }

    pub fn table_for(self, dataset: Dataset) -> &'static str {
        self.entry_for(dataset).0
    }

    pub fn file_for(self, dataset: Dataset) -> &'static str {
        self.entry_for(dataset).1
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Layer {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bronze" => Ok(Layer::Bronze),
            "silver" => Ok(Layer::Silver),
            "gold" => Ok(Layer::Gold),
            other => Err(DomainError::SchemaError(format!(
                "unknown layer '{other}' (expected bronze, silver or gold)"
            ))),
        }
    }
}

/// Resolved directories for one project.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    pub root: PathBuf,
    pub data_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub target_dir: PathBuf,
}

impl ProjectLayout {
    pub fn new(project_dir: &Path, config: &PipelineConfig) -> Self {
        let resolve = |p: &str| {
            let path = Path::new(p);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                project_dir.join(path)
            }
        };
        Self {
            root: project_dir.to_path_buf(),
            data_dir: resolve(&config.data_dir),
            artifacts_dir: resolve(&config.artifacts_dir),
            target_dir: resolve(&config.target_path),
        }
    }

    pub fn layer_dir(&self, layer: Layer) -> PathBuf {
        self.data_dir.join(layer.as_str())
    }

    pub fn bronze(&self, file: &str) -> PathBuf {
        self.layer_dir(Layer::Bronze).join(file)
    }

    pub fn silver(&self, file: &str) -> PathBuf {
        self.layer_dir(Layer::Silver).join(file)
    }

    pub fn gold_file(&self) -> PathBuf {
        self.layer_dir(Layer::Gold).join(GOLD_FILE)
    }

    pub fn run_results(&self) -> PathBuf {
        self.target_dir.join(RUN_RESULTS)
    }
}
