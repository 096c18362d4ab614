use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

use crate::search::AcademicProvider;
use crate::search::academic::strip_markup;
use crate::types::source::{NormalizedRecord, SourceOrigin};

const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

static ABSTRACT_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<AbstractText[^>]*>(.*?)</AbstractText>").unwrap()
});

pub struct PubmedProvider {
    client: reqwest::Client,
}

impl PubmedProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn search_ids(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let retmax = limit.to_string();
        let data: Value = self
            .client
            .get(format!("{}/esearch.fcgi", EUTILS_BASE))
            .query(&[
                ("db", "pubmed"),
                ("retmode", "json"),
                ("retmax", retmax.as_str()),
                ("term", query),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(parse_id_list(&data))
    }

    async fn summaries(&self, ids: &[String]) -> Result<Value> {
        let joined = ids.join(",");
        let data = self
            .client
            .get(format!("{}/esummary.fcgi", EUTILS_BASE))
            .query(&[("db", "pubmed"), ("retmode", "json"), ("id", joined.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(data)
    }

    async fn abstract_for(&self, id: &str) -> Result<String> {
        let xml = self
            .client
            .get(format!("{}/efetch.fcgi", EUTILS_BASE))
            .query(&[("db", "pubmed"), ("retmode", "xml"), ("id", id)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(extract_abstract(&xml))
    }
}

pub(crate) fn parse_id_list(data: &Value) -> Vec<String> {
    data.pointer("/esearchresult/idlist")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn extract_abstract(xml: &str) -> String {
    ABSTRACT_TEXT
        .captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| strip_markup(m.as_str()))
        .unwrap_or_default()
}

#[async_trait]
impl AcademicProvider for PubmedProvider {
    fn name(&self) -> &'static str {
        "pubmed"
    }

    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Pubmed
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<NormalizedRecord>> {
        let ids = self.search_ids(query, limit).await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let summaries = self.summaries(&ids).await?;
        let mut records = Vec::new();
        for id in &ids {
            let Some(item) = summaries.get("result").and_then(|r| r.get(id.as_str())) else {
                continue;
            };
            let title = item
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("Untitled")
                .to_string();

            // 摘要抓取失败不影响该条记录
            let content = match self.abstract_for(id).await {
                Ok(text) => text,
                Err(e) => {
                    debug!("PubMed 摘要获取失败 {}: {}", id, e);
                    String::new()
                }
            };

            records.push(NormalizedRecord {
                title,
                url: format!("https://pubmed.ncbi.nlm.nih.gov/{}/", id),
                content,
                doi: None,
                pdf_url: None,
                relevance_score: None,
            });
        }
        Ok(records)
    }
}
