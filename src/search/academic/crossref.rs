use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::search::AcademicProvider;
use crate::search::academic::{doi_url, strip_markup};
use crate::types::source::{NormalizedRecord, SourceOrigin};

const CROSSREF_API: &str = "https://api.crossref.org/works";

pub struct CrossrefProvider {
    client: reqwest::Client,
}

impl CrossrefProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

pub(crate) fn parse_works(data: &Value) -> Vec<NormalizedRecord> {
    let Some(items) = data.pointer("/message/items").and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| {
            let doi = item
                .get("DOI")
                .and_then(Value::as_str)
                .filter(|doi| !doi.is_empty())
                .map(str::to_string);
            let title = match item.get("title") {
                Some(Value::Array(titles)) => titles.first().and_then(Value::as_str),
                Some(Value::String(title)) => Some(title.as_str()),
                _ => None,
            }
            .unwrap_or("Untitled")
            .to_string();
            let url = match &doi {
                Some(doi) => doi_url(doi),
                None => item
                    .get("URL")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            };
            let content = item
                .get("abstract")
                .and_then(Value::as_str)
                .map(strip_markup)
                .unwrap_or_default();

            NormalizedRecord {
                title,
                url,
                content,
                doi,
                pdf_url: None,
                relevance_score: None,
            }
        })
        .collect()
}

#[async_trait]
impl AcademicProvider for CrossrefProvider {
    fn name(&self) -> &'static str {
        "crossref"
    }

    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Crossref
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<NormalizedRecord>> {
        let rows = limit.to_string();
        let data: Value = self
            .client
            .get(CROSSREF_API)
            .query(&[("query", query), ("rows", rows.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(parse_works(&data))
    }
}
