// happiness-core/src/application/import.rs
//
// Fills the bronze layer from remote or local sources.

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::domain::error::DomainError;
use crate::domain::naming::quote_ident;
use crate::domain::project::layout::{BRONZE_GEOLOCATION, BRONZE_MULTI_YEAR};
use crate::domain::project::{Layer, ProjectLayout, SourcesConfig};
use crate::domain::report::ImportReport;
use crate::error::HappinessError;
use crate::infrastructure::archive::{copy_csv_tree, extract_csvs, extract_csvs_from_bytes, looks_like_zip};
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;
use crate::ports::connector::{Connector, CsvTyping};
use crate::ports::fetcher::SourceFetcher;

const RAW_GEOLOCATION: &str = "__raw_geolocation";

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Local sources are resolved against the project directory.
fn local_path(layout: &ProjectLayout, source: &str) -> PathBuf {
    let path = Path::new(source);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        layout.root.join(path)
    }
}

fn not_found(path: &Path) -> HappinessError {
    InfrastructureError::SourceNotFound {
        file: path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default(),
        folder: path
            .parent()
            .map(|p| p.display().to_string())
            .unwrap_or_default(),
    }
    .into()
}

/// Last path segment of a URL when it names a CSV file.
fn csv_name_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    name.to_ascii_lowercase().ends_with(".csv").then_some(name)
}

/// Copy every CSV of the happiness source into `bronze/`.
#[instrument(skip(layout, fetcher))]
pub async fn import_happiness(
    layout: &ProjectLayout,
    source: &str,
    fetcher: &dyn SourceFetcher,
) -> Result<Vec<PathBuf>, HappinessError> {
    let bronze = layout.layer_dir(Layer::Bronze);

    let written = if is_remote(source) {
        info!("Downloading {}", source);
        let bytes = fetcher.fetch(source).await?;
        if looks_like_zip(&bytes) {
            extract_csvs_from_bytes(&bytes, &bronze)?
        } else {
            let target = bronze.join(csv_name_from_url(source).unwrap_or(BRONZE_MULTI_YEAR));
            atomic_write(&target, &bytes)?;
            vec![target]
        }
    } else {
        let path = local_path(layout, source);
        if path.is_dir() {
            copy_csv_tree(&path, &bronze)?
        } else if path.is_file() {
            let is_zip = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("zip"));
            if is_zip {
                extract_csvs(File::open(&path)?, &bronze)?
            } else {
                let name = path.file_name().ok_or_else(|| not_found(&path))?;
                let target = bronze.join(name);
                atomic_write(&target, std::fs::read(&path)?)?;
                vec![target]
            }
        } else {
            return Err(not_found(&path));
        }
    };

    info!(files = written.len(), dir = %bronze.display(), "Happiness sources imported");
    Ok(written)
}

/// Fetch the country coordinates unless `bronze/geolocation.csv` is cached.
///
/// Returns true on a cache hit.
#[instrument(skip(layout, fetcher, connector))]
pub async fn import_geolocation(
    layout: &ProjectLayout,
    source: &str,
    fetcher: &dyn SourceFetcher,
    connector: &dyn Connector,
) -> Result<bool, HappinessError> {
    let target = layout.bronze(BRONZE_GEOLOCATION);
    if target.is_file() {
        info!(path = %target.display(), "Geolocation cached, skipping download");
        return Ok(true);
    }

    let bytes = if is_remote(source) {
        info!("Downloading {}", source);
        fetcher.fetch(source).await?
    } else {
        let path = local_path(layout, source);
        if !path.is_file() {
            return Err(not_found(&path));
        }
        std::fs::read(&path)?
    };

    let raw = tempfile::Builder::new().suffix(".csv").tempfile()?;
    std::fs::write(raw.path(), &bytes)?;
    connector
        .register_source(RAW_GEOLOCATION, raw.path(), CsvTyping::AllText)
        .await?;

    let columns: Vec<String> = connector
        .fetch_columns(RAW_GEOLOCATION)
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();
    let find = |wanted: &str| columns.iter().find(|c| c.eq_ignore_ascii_case(wanted));
    let require = |wanted: &str| {
        find(wanted).ok_or_else(|| DomainError::MissingColumn {
            table: source.to_string(),
            column: wanted.to_string(),
        })
    };

    let name = match find("country_name") {
        Some(existing) => existing,
        None => require("name")?,
    };
    let code = match find("country") {
        Some(c) => quote_ident(c),
        None => "CAST(NULL AS VARCHAR)".to_string(),
    };
    let query = format!(
        "SELECT {code} AS country, {} AS country_name, {} AS latitude, {} AS longitude FROM {}",
        quote_ident(name),
        quote_ident(require("latitude")?),
        quote_ident(require("longitude")?),
        quote_ident(RAW_GEOLOCATION)
    );
    connector.export_csv(&query, &target).await?;
    connector
        .execute(&format!("DROP TABLE IF EXISTS {}", quote_ident(RAW_GEOLOCATION)))
        .await?;

    info!(path = %target.display(), "Geolocation imported");
    Ok(false)
}

/// Import both sources and report what landed in bronze.
pub async fn import_sources(
    layout: &ProjectLayout,
    sources: &SourcesConfig,
    fetcher: &dyn SourceFetcher,
    connector: &dyn Connector,
) -> Result<ImportReport, HappinessError> {
    let bronze = layout.layer_dir(Layer::Bronze);
    let mut files: Vec<String> = import_happiness(layout, &sources.happiness, fetcher)
        .await?
        .iter()
        .map(|p| p.strip_prefix(&bronze).unwrap_or(p).display().to_string())
        .collect();

    let geolocation_cached = import_geolocation(layout, &sources.geolocation, fetcher, connector).await?;
    files.push(BRONZE_GEOLOCATION.to_string());
    files.sort();
    files.dedup();

    Ok(ImportReport {
        files,
        geolocation_cached,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::project::PipelineConfig;
    use crate::infrastructure::adapters::duckdb::DuckDBConnector;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::fs;
    use std::io::Write;
    use std::sync::Mutex;

    const COUNTRIES: &str = "country,latitude,longitude,name\nFI,61.92,25.75,Finland\nDK,56.26,9.50,Denmark\n";

    struct CannedFetcher {
        responses: HashMap<String, Vec<u8>>,
        calls: Mutex<Vec<String>>,
    }

    impl CannedFetcher {
        fn new(responses: &[(&str, Vec<u8>)]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SourceFetcher for CannedFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, HappinessError> {
            self.calls.lock().unwrap().push(url.to_string());
            self.responses
                .get(url)
                .cloned()
                .ok_or_else(|| HappinessError::InternalError(format!("no canned response for {url}")))
        }
    }

    fn zip_bytes(members: &[(&str, &str)]) -> Result<Vec<u8>> {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in members {
            writer.start_file(*name, options)?;
            writer.write_all(content.as_bytes())?;
        }
        Ok(writer.finish()?.into_inner())
    }

    fn layout(dir: &Path) -> ProjectLayout {
        ProjectLayout::new(dir, &PipelineConfig::default())
    }

    #[test]
    fn test_csv_name_from_url() {
        assert_eq!(
            csv_name_from_url("https://host/a/countries.csv?raw=1"),
            Some("countries.csv")
        );
        assert_eq!(csv_name_from_url("https://host/download/archive"), None);
    }

    #[tokio::test]
    async fn test_remote_zip_is_extracted() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let url = "https://example.org/happiness";
        let fetcher = CannedFetcher::new(&[(
            url,
            zip_bytes(&[
                ("world-happiness-report.csv", "Country name,year\nFinland,2020\n"),
                ("nested/world-happiness-report-2021.csv", "Country name\nFinland\n"),
                ("README.txt", "ignored"),
            ])?,
        )]);

        let written = import_happiness(&layout(dir.path()), url, &fetcher).await?;
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("data/bronze/nested/world-happiness-report-2021.csv").exists());
        assert!(!dir.path().join("data/bronze/README.txt").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_local_directory_is_copied() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let raw = dir.path().join("raw");
        fs::create_dir_all(&raw)?;
        fs::write(raw.join("world-happiness-report.csv"), "Country name,year\n")?;

        let fetcher = CannedFetcher::new(&[]);
        let written = import_happiness(&layout(dir.path()), "raw", &fetcher).await?;
        assert_eq!(written, vec![dir.path().join("data/bronze/world-happiness-report.csv")]);
        assert!(fetcher.calls.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_local_source() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let fetcher = CannedFetcher::new(&[]);
        let err = import_happiness(&layout(dir.path()), "nowhere.zip", &fetcher)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nowhere.zip"));
        Ok(())
    }

    #[tokio::test]
    async fn test_geolocation_renamed_then_cached() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let url = "https://example.org/countries.csv";
        let fetcher = CannedFetcher::new(&[(url, COUNTRIES.as_bytes().to_vec())]);
        let connector = DuckDBConnector::in_memory()?;
        let layout = layout(dir.path());

        let cached = import_geolocation(&layout, url, &fetcher, &connector).await?;
        assert!(!cached);
        let written = fs::read_to_string(layout.bronze(BRONZE_GEOLOCATION))?;
        assert_eq!(
            written,
            "country,country_name,latitude,longitude\nFI,Finland,61.92,25.75\nDK,Denmark,56.26,9.50\n"
        );

        let cached = import_geolocation(&layout, url, &fetcher, &connector).await?;
        assert!(cached);
        assert_eq!(fetcher.calls.lock().unwrap().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_import_sources_report() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let happiness = "https://example.org/world-happiness-report.csv";
        let countries = "https://example.org/countries.csv";
        let fetcher = CannedFetcher::new(&[
            (happiness, b"Country name,year\nFinland,2020\n".to_vec()),
            (countries, COUNTRIES.as_bytes().to_vec()),
        ]);
        let connector = DuckDBConnector::in_memory()?;
        let sources = SourcesConfig {
            happiness: happiness.to_string(),
            geolocation: countries.to_string(),
        };

        let report = import_sources(&layout(dir.path()), &sources, &fetcher, &connector).await?;
        assert_eq!(report.files, vec!["geolocation.csv", "world-happiness-report.csv"]);
        assert!(!report.geolocation_cached);
        Ok(())
    }
}
