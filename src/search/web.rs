use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};

use crate::config::SearchConfig;
use crate::search::WebSearch;

/// Tavily 兼容的网页搜索
pub struct TavilySearch {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl TavilySearch {
    pub fn new(client: reqwest::Client, config: &SearchConfig) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl WebSearch for TavilySearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Value> {
        if self.api_key.trim().is_empty() {
            return Err(anyhow!("Web search API key is not configured"));
        }

        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "max_results": limit,
            "search_depth": "basic",
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<Value>().await?)
    }
}
