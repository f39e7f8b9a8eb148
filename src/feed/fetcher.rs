use std::time::Duration;

use reqwest::Client;

use crate::error::{AppError, Result};

const USER_AGENT: &str = concat!("blog-reminder/", env!("CARGO_PKG_VERSION"));

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// Download the raw feed document.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Other(anyhow::anyhow!(
                "Failed to fetch feed: HTTP {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(AppError::Other(anyhow::anyhow!("Feed response was empty")));
        }

        tracing::debug!(url, bytes = bytes.len(), "Fetched feed");
        Ok(bytes.to_vec())
    }
}
