// happiness-core/src/ports/fetcher.rs

use crate::error::HappinessError;
use async_trait::async_trait;

/// A remote byte source (HTTP in production, canned bytes in tests).
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, HappinessError>;
}
