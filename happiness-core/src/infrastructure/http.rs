// happiness-core/src/infrastructure/http.rs

use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, instrument};

use crate::error::HappinessError;
use crate::infrastructure::error::InfrastructureError;
use crate::ports::fetcher::SourceFetcher;

const USER_AGENT: &str = concat!("happiness/", env!("CARGO_PKG_VERSION"));

/// Downloads sources over HTTP(S). One attempt, no retries.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, HappinessError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .user_agent(USER_AGENT)
            .build()
            .map_err(InfrastructureError::HttpClient)?;
        Ok(Self { client })
    }
}

fn http_error(url: &str, source: reqwest::Error) -> HappinessError {
    HappinessError::Infrastructure(InfrastructureError::Http {
        url: url.to_string(),
        source,
    })
}

#[async_trait]
impl SourceFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, HappinessError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| http_error(url, e))?;

        let bytes = response.bytes().await.map_err(|e| http_error(url, e))?;
        info!(bytes = bytes.len(), "Downloaded");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[tokio::test]
    async fn test_fetch_unreachable_host_reports_url() -> Result<()> {
        let fetcher = HttpFetcher::new()?;
        let url = "http://127.0.0.1:1/missing.csv";
        let err = fetcher.fetch(url).await.unwrap_err();
        assert!(matches!(
            err,
            HappinessError::Infrastructure(InfrastructureError::Http { .. })
        ));
        assert!(err.to_string().contains(url));
        Ok(())
    }
}
