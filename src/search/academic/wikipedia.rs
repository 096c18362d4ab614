use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::search::AcademicProvider;
use crate::types::source::{NormalizedRecord, SourceOrigin};

const WIKIPEDIA_API: &str = "https://en.wikipedia.org/w/api.php";

pub struct WikipediaProvider {
    client: reqwest::Client,
}

impl WikipediaProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn page(&self, title: &str) -> Result<Option<NormalizedRecord>> {
        let data: Value = self
            .client
            .get(WIKIPEDIA_API)
            .query(&[
                ("action", "query"),
                ("prop", "extracts|info"),
                ("inprop", "url"),
                ("explaintext", "1"),
                ("format", "json"),
                ("titles", title),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(parse_page(&data))
    }
}

pub(crate) fn parse_search_titles(data: &Value) -> Vec<String> {
    data.pointer("/query/search")
        .and_then(Value::as_array)
        .map(|pages| {
            pages
                .iter()
                .filter_map(|p| p.get("title").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn parse_page(data: &Value) -> Option<NormalizedRecord> {
    let page = data
        .pointer("/query/pages")
        .and_then(Value::as_object)?
        .values()
        .next()?;

    Some(NormalizedRecord {
        title: page.get("title")?.as_str()?.to_string(),
        url: page
            .get("fullurl")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        content: page
            .get("extract")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        doi: None,
        pdf_url: None,
        relevance_score: None,
    })
}

#[async_trait]
impl AcademicProvider for WikipediaProvider {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Wikipedia
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<NormalizedRecord>> {
        let srlimit = limit.to_string();
        let data: Value = self
            .client
            .get(WIKIPEDIA_API)
            .query(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("utf8", ""),
                ("format", "json"),
                ("srlimit", srlimit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut records = Vec::new();
        for title in parse_search_titles(&data) {
            if let Some(record) = self.page(&title).await? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_titles() {
        let data = json!({"query": {"search": [{"title": "Heat pump"}, {"snippet": "x"}]}});
        assert_eq!(parse_search_titles(&data), vec!["Heat pump"]);
    }

    #[test]
    fn test_parse_page() {
        let data = json!({
            "query": {"pages": {"42": {
                "title": "Heat pump",
                "fullurl": "https://en.wikipedia.org/wiki/Heat_pump",
                "extract": "A heat pump is a device."
            }}}
        });
        let record = parse_page(&data).unwrap();
        assert_eq!(record.title, "Heat pump");
        assert_eq!(record.url, "https://en.wikipedia.org/wiki/Heat_pump");
        assert_eq!(record.content, "A heat pump is a device.");

        assert!(parse_page(&json!({"query": {"pages": {}}})).is_none());
    }
}
