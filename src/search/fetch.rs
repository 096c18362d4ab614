use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::search::PageFetcher;
use crate::utils::normalizer::sanitize;

/// 两次重试之间的等待时间
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// 基于HTTP的网页抓取器，返回清洗后的正文
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn fetch_once(&self, url: &str, timeout: Duration) -> Result<String> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        let body = response.text().await?;
        Ok(sanitize(&body))
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_content(&self, url: &str, timeout: Duration, retries: u32) -> Result<String> {
        let mut last_error = None;

        for attempt in 0..=retries {
            match self.fetch_once(url, timeout).await {
                Ok(content) => return Ok(content),
                Err(e) => {
                    debug!("🌐 抓取失败 (第 {} / {} 次): {} - {}", attempt + 1, retries + 1, url, e);
                    last_error = Some(e);
                    if attempt < retries {
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Failed to fetch {}", url)))
    }
}
