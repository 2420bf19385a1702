// happiness-core/src/ports/connector.rs

// What the use cases need from a tabular SQL engine, without knowing which
// engine answers. The DuckDB adapter is the only implementation shipped.

use crate::domain::frame::Frame;
use crate::error::HappinessError;
use async_trait::async_trait;
use std::path::Path;

// Engine-independent description of a column
#[derive(Debug, Clone)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub is_nullable: bool,
}

/// How CSV cells are typed when a file is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvTyping {
    /// Let the engine sniff column types.
    #[default]
    Infer,
    /// Keep every cell as text; coercion happens later in SQL.
    AllText,
}

#[async_trait]
pub trait Connector: Send + Sync {
    async fn execute(&self, query: &str) -> Result<(), HappinessError>;

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, HappinessError>;

    /// Load a headed CSV file into a table named `name` (replacing it).
    async fn register_source(
        &self,
        name: &str,
        path: &Path,
        typing: CsvTyping,
    ) -> Result<(), HappinessError>;

    async fn query_scalar(&self, query: &str) -> Result<u64, HappinessError>;

    /// Run a query and copy its full result into memory.
    async fn fetch_frame(&self, name: &str, query: &str) -> Result<Frame, HappinessError>;

    /// Write the result of a query to a headed CSV file.
    async fn export_csv(&self, query: &str, path: &Path) -> Result<(), HappinessError>;

    fn engine_name(&self) -> &str;
}
