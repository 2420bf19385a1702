pub mod connector;
pub mod fetcher;

pub use connector::{ColumnSchema, Connector, CsvTyping};
pub use fetcher::SourceFetcher;
