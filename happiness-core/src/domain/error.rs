// happiness-core/src/domain/error.rs

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum DomainError {
    #[error("Table '{table}' has no column matching '{column}'")]
    #[diagnostic(
        code(happiness::domain::missing_column),
        help("Expected a column named '{column}' (or a close variant such as a different casing).")
    )]
    MissingColumn { table: String, column: String },

    #[error("No shared columns found between '{left}' and '{right}' after normalisation")]
    #[diagnostic(
        code(happiness::domain::no_shared_columns),
        help("Check the alias map: both happiness tables must agree on at least the key columns.")
    )]
    NoSharedColumns { left: String, right: String },

    #[error("Unknown column '{column}' in '{table}'")]
    #[diagnostic(code(happiness::domain::unknown_column))]
    UnknownColumn { table: String, column: String },

    #[error("Schema Error: {0}")]
    #[diagnostic(code(happiness::domain::schema))]
    SchemaError(String),
}
