// happiness-core/src/infrastructure/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DatabaseError {
    #[error("DuckDB Engine Error: {0}")]
    #[diagnostic(
        code(happiness::infra::database::duckdb),
        help("An error occurred inside the SQL engine.")
    )]
    DuckDB(#[from] duckdb::Error),
}

#[derive(Error, Debug, Diagnostic)]
pub enum InfrastructureError {
    // --- DATABASE (Abstracted) ---
    #[error(transparent)]
    #[diagnostic(transparent)]
    Database(#[from] DatabaseError),

    // --- FILESYSTEM (IO) ---
    #[error("File System Error: {0}")]
    #[diagnostic(
        code(happiness::infra::io),
        help("Check file permissions or path validity.")
    )]
    Io(#[from] std::io::Error),

    // --- SOURCE FILES ---
    #[error("Could not find '{file}' in {folder}")]
    #[diagnostic(
        code(happiness::infra::source_missing),
        help("Run the previous stage first (e.g. 'happiness import' for the bronze layer).")
    )]
    SourceNotFound { file: String, folder: String },

    #[error("Data file '{file}' in {folder} is empty")]
    #[diagnostic(code(happiness::infra::source_empty))]
    EmptySource { file: String, folder: String },

    #[error("Data file '{file}' appears malformed: {reason}")]
    #[diagnostic(code(happiness::infra::source_malformed))]
    MalformedSource { file: String, reason: String },

    // --- NETWORK / ARCHIVES ---
    #[error("Failed to download '{url}': {source}")]
    #[diagnostic(
        code(happiness::infra::http),
        help("The importer has no offline fallback. Point 'sources' at a local file to work offline.")
    )]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    #[diagnostic(code(happiness::infra::http_client))]
    HttpClient(#[source] reqwest::Error),

    #[error("Archive Error: {0}")]
    #[diagnostic(code(happiness::infra::archive))]
    Archive(#[from] zip::result::ZipError),

    // --- CONFIG / YAML ---
    #[error("YAML Parsing Error: {0}")]
    #[diagnostic(
        code(happiness::infra::yaml),
        help("Check your YAML syntax (indentation, types).")
    )]
    YamlError(#[from] serde_yaml::Error),

    #[error("Configuration Error: {0}")]
    #[diagnostic(code(happiness::infra::config))]
    ConfigError(String),

    // --- RENDERING ---
    #[error("Template Rendering Error: {0}")]
    #[diagnostic(
        code(happiness::infra::template),
        help("Check the Jinja syntax of the dashboard templates.")
    )]
    TemplateError(#[from] minijinja::Error),

    #[error("Chart Rendering Error: {0}")]
    #[diagnostic(code(happiness::infra::chart))]
    Chart(String),
}

// Manual implementation for shortcuts (e.g. `?` operator on duckdb calls)
impl From<duckdb::Error> for InfrastructureError {
    fn from(err: duckdb::Error) -> Self {
        InfrastructureError::Database(DatabaseError::DuckDB(err))
    }
}

impl From<anyhow::Error> for InfrastructureError {
    fn from(err: anyhow::Error) -> Self {
        InfrastructureError::ConfigError(format!("{:#}", err))
    }
}
