// happiness-core/src/error.rs

use crate::domain::error::DomainError;
use crate::infrastructure::error::InfrastructureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HappinessError {
    // --- DOMAIN ERRORS (schemas, columns, reconciliation) ---
    #[error(transparent)]
    Domain(#[from] DomainError),

    // --- INFRASTRUCTURE ERRORS (IO, parsing, network) ---
    #[error(transparent)]
    Infrastructure(#[from] InfrastructureError),

    // --- GENERIC / APPLICATION ERRORS ---
    #[error("Internal Error: {0}")]
    InternalError(String),

    #[error("Unsafe path traversal detected: {0}")]
    UnsafePath(String),
}

// Lets `?` lift io and engine errors straight out of use cases.
impl From<std::io::Error> for HappinessError {
    fn from(err: std::io::Error) -> Self {
        HappinessError::Infrastructure(InfrastructureError::Io(err))
    }
}

impl From<duckdb::Error> for HappinessError {
    fn from(err: duckdb::Error) -> Self {
        HappinessError::Infrastructure(err.into())
    }
}
