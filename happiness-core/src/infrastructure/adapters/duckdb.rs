// happiness-core/src/infrastructure/adapters/duckdb.rs

use async_trait::async_trait;
use duckdb::types::ValueRef;
use duckdb::{Config, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// Hexagonal imports
use crate::domain::frame::{CellValue, Frame};
use crate::domain::naming::{quote_ident, quote_literal};
use crate::error::HappinessError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::connector::{ColumnSchema, Connector, CsvTyping};

const FRAME_VIEW: &str = "__happiness_frame";

pub struct DuckDBConnector {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDBConnector {
    pub fn new(db_path: &str) -> Result<Self, InfrastructureError> {
        let config = Config::default();

        let conn = if db_path == ":memory:" {
            Connection::open_in_memory_with_flags(config)?
        } else {
            Connection::open_with_flags(db_path, config)?
        };

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Every pipeline run works on a throwaway in-memory database.
    pub fn in_memory() -> Result<Self, InfrastructureError> {
        Self::new(":memory:")
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, HappinessError> {
        self.conn.lock().map_err(|_| {
            HappinessError::Infrastructure(InfrastructureError::Io(std::io::Error::other(
                "DuckDB Mutex Poisoned",
            )))
        })
    }
}

fn table_info(conn: &Connection, table_name: &str) -> Result<Vec<ColumnSchema>, HappinessError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_literal(table_name)))?;

    let rows = stmt.query_map([], |row| {
        Ok(ColumnSchema {
            name: row.get("name")?,
            data_type: row.get("type")?,
            is_nullable: !row.get::<_, bool>("notnull")?,
        })
    })?;

    let mut columns = Vec::new();
    for row in rows {
        columns.push(row?);
    }
    Ok(columns)
}

fn to_cell(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Null,
        ValueRef::Boolean(v) => CellValue::Bool(v),
        ValueRef::TinyInt(v) => CellValue::Int(v.into()),
        ValueRef::SmallInt(v) => CellValue::Int(v.into()),
        ValueRef::Int(v) => CellValue::Int(v.into()),
        ValueRef::BigInt(v) => CellValue::Int(v),
        ValueRef::HugeInt(v) => i64::try_from(v)
            .map(CellValue::Int)
            .unwrap_or(CellValue::Float(v as f64)),
        ValueRef::UTinyInt(v) => CellValue::Int(v.into()),
        ValueRef::USmallInt(v) => CellValue::Int(v.into()),
        ValueRef::UInt(v) => CellValue::Int(v.into()),
        ValueRef::UBigInt(v) => i64::try_from(v)
            .map(CellValue::Int)
            .unwrap_or(CellValue::Float(v as f64)),
        ValueRef::Float(v) => CellValue::Float(v.into()),
        ValueRef::Double(v) => CellValue::Float(v),
        ValueRef::Decimal(v) => v
            .to_string()
            .parse::<f64>()
            .map(CellValue::Float)
            .unwrap_or(CellValue::Null),
        ValueRef::Text(bytes) => CellValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        other => CellValue::Text(format!("{:?}", other)),
    }
}

#[async_trait]
impl Connector for DuckDBConnector {
    async fn execute(&self, query: &str) -> Result<(), HappinessError> {
        let conn = self.lock()?;
        debug!(sql = %query, "execute");
        conn.execute_batch(query)?;
        Ok(())
    }

    async fn fetch_columns(&self, table_name: &str) -> Result<Vec<ColumnSchema>, HappinessError> {
        let conn = self.lock()?;
        table_info(&conn, table_name)
    }

    async fn register_source(
        &self,
        name: &str,
        path: &Path,
        typing: CsvTyping,
    ) -> Result<(), HappinessError> {
        let options = match typing {
            CsvTyping::Infer => "header = true",
            CsvTyping::AllText => "header = true, all_varchar = true",
        };
        let query = format!(
            "CREATE OR REPLACE TABLE {} AS SELECT * FROM read_csv_auto({}, {})",
            quote_ident(name),
            quote_literal(&path.to_string_lossy()),
            options
        );
        self.execute(&query).await
    }

    async fn query_scalar(&self, query: &str) -> Result<u64, HappinessError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(query)?;
        let mut rows = stmt.query([])?;

        let row = rows
            .next()?
            .ok_or_else(|| HappinessError::InternalError("No scalar value returned".into()))?;

        let value: Option<i64> = row.get(0)?;
        Ok(value.map(|v| v.max(0) as u64).unwrap_or(0))
    }

    async fn fetch_frame(&self, name: &str, query: &str) -> Result<Frame, HappinessError> {
        let conn = self.lock()?;
        conn.execute_batch(&format!(
            "CREATE OR REPLACE TEMP VIEW {} AS {}",
            quote_ident(FRAME_VIEW),
            query
        ))?;

        let columns: Vec<String> = table_info(&conn, FRAME_VIEW)?
            .into_iter()
            .map(|c| c.name)
            .collect();

        let mut frame = Frame::new(name, columns);
        {
            let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(FRAME_VIEW)))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let mut cells = Vec::with_capacity(frame.width());
                for i in 0..frame.width() {
                    cells.push(to_cell(row.get_ref(i)?));
                }
                frame.rows.push(cells);
            }
        }

        conn.execute_batch(&format!("DROP VIEW IF EXISTS {}", quote_ident(FRAME_VIEW)))?;
        Ok(frame)
    }

    async fn export_csv(&self, query: &str, path: &Path) -> Result<(), HappinessError> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        // Write next to the target, then rename: readers never see a partial file.
        let temp_path = tempfile::NamedTempFile::new_in(parent)?.into_temp_path();
        {
            let conn = self.lock()?;
            let copy = format!(
                "COPY ({}) TO {} (FORMAT CSV, HEADER, DELIMITER ',')",
                query,
                quote_literal(&temp_path.to_string_lossy())
            );
            debug!(sql = %copy, "export");
            conn.execute_batch(&copy)?;
        }
        temp_path
            .persist(path)
            .map_err(|e| HappinessError::Infrastructure(InfrastructureError::Io(e.error)))?;
        Ok(())
    }

    fn engine_name(&self) -> &str {
        "duckdb"
    }
}
