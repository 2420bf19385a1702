pub mod aliases;
pub mod error;
pub mod frame;
pub mod naming;
pub mod project;
pub mod report;
pub mod schema;
pub mod stats;

// Re-exports to keep imports short elsewhere
pub use error::DomainError;
pub use frame::{CellValue, Frame};
