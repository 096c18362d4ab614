use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use crate::search::OpenAccessResolver;

const UNPAYWALL_API: &str = "https://api.unpaywall.org/v2";

/// 通过 Unpaywall 解析 DOI 对应的开放获取链接
pub struct UnpaywallResolver {
    client: reqwest::Client,
    contact_email: String,
}

impl UnpaywallResolver {
    pub fn new(client: reqwest::Client, contact_email: String) -> Self {
        Self {
            client,
            contact_email,
        }
    }

    async fn lookup(&self, doi: &str) -> anyhow::Result<Option<String>> {
        let response = self
            .client
            .get(lookup_url(doi)?)
            .query(&[("email", self.contact_email.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let data: Value = response.json().await?;
        Ok(best_open_access_link(&data))
    }
}

/// DOI 作为单个路径段追加，`/` 等字符会被转义
fn lookup_url(doi: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(UNPAYWALL_API)?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("Invalid Unpaywall endpoint: {}", UNPAYWALL_API))?
        .push(doi.trim());
    Ok(url)
}

/// 优先取 PDF 直链，其次取落地页
fn best_open_access_link(data: &Value) -> Option<String> {
    let location = data.get("best_oa_location")?;
    let non_empty = |field: &str| {
        location
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|url| !url.is_empty())
    };
    non_empty("url_for_pdf")
        .or_else(|| non_empty("url"))
        .map(str::to_string)
}

#[async_trait]
impl OpenAccessResolver for UnpaywallResolver {
    async fn resolve_pdf(&self, doi: &str) -> Option<String> {
        match self.lookup(doi).await {
            Ok(link) => link,
            Err(e) => {
                debug!("📄 开放获取解析失败 {}: {}", doi, e);
                None
            }
        }
    }
}
