use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::search::AcademicProvider;
use crate::search::academic::doi_url;
use crate::types::source::{NormalizedRecord, SourceOrigin};

const SEMANTIC_SCHOLAR_API: &str = "https://api.semanticscholar.org/graph/v1/paper/search";
const FIELDS: &str = "title,abstract,year,authors,url,citationCount,externalIds";

pub struct SemanticScholarProvider {
    client: reqwest::Client,
}

impl SemanticScholarProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

pub(crate) fn parse_papers(data: &Value) -> Vec<NormalizedRecord> {
    let Some(papers) = data.get("data").and_then(Value::as_array) else {
        return Vec::new();
    };

    papers
        .iter()
        .map(|paper| {
            let doi = paper
                .pointer("/externalIds/DOI")
                .and_then(Value::as_str)
                .map(str::to_string);
            let url = paper
                .get("url")
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .or_else(|| doi.as_deref().map(doi_url))
                .unwrap_or_default();

            NormalizedRecord {
                title: paper
                    .get("title")
                    .and_then(Value::as_str)
                    .unwrap_or("Untitled")
                    .to_string(),
                url,
                content: paper
                    .get("abstract")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                doi,
                pdf_url: None,
                relevance_score: None,
            }
        })
        .collect()
}

#[async_trait]
impl AcademicProvider for SemanticScholarProvider {
    fn name(&self) -> &'static str {
        "semantic_scholar"
    }

    fn origin(&self) -> SourceOrigin {
        SourceOrigin::SemanticScholar
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<NormalizedRecord>> {
        let limit_param = limit.to_string();
        let data: Value = self
            .client
            .get(SEMANTIC_SCHOLAR_API)
            .query(&[
                ("query", query),
                ("limit", limit_param.as_str()),
                ("fields", FIELDS),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(parse_papers(&data))
    }
}
