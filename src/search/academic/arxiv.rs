use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use crate::search::AcademicProvider;
use crate::search::academic::strip_markup;
use crate::types::source::{NormalizedRecord, SourceOrigin};

const ARXIV_API: &str = "http://export.arxiv.org/api/query";

static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<entry>(.*?)</entry>").unwrap()
});
static TITLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<title>(.*?)</title>").unwrap());
static SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<summary>(.*?)</summary>").unwrap());
static ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<id>(.*?)</id>").unwrap());
static DOI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<arxiv:doi[^>]*>(.*?)</arxiv:doi>").unwrap());

pub struct ArxivProvider {
    client: reqwest::Client,
}

impl ArxivProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// 解析 Atom 响应，缺少标题或地址的条目会被跳过
pub(crate) fn parse_atom(text: &str) -> Vec<NormalizedRecord> {
    ENTRY
        .captures_iter(text)
        .filter_map(|entry| {
            let body = entry.get(1)?.as_str();
            let capture = |re: &Regex| {
                re.captures(body)
                    .and_then(|c| c.get(1))
                    .map(|m| strip_markup(m.as_str()))
            };

            let title = capture(&TITLE).filter(|t| !t.is_empty())?;
            let url = capture(&ID).filter(|u| !u.is_empty())?;
            Some(NormalizedRecord {
                title,
                url,
                content: capture(&SUMMARY).unwrap_or_default(),
                doi: capture(&DOI).filter(|d| !d.is_empty()),
                pdf_url: None,
                relevance_score: None,
            })
        })
        .collect()
}

#[async_trait]
impl AcademicProvider for ArxivProvider {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Arxiv
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<NormalizedRecord>> {
        let search_query = format!("all:{}", query);
        let limit_param = limit.to_string();
        let text = self
            .client
            .get(ARXIV_API)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", limit_param.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut records = parse_atom(&text);
        records.truncate(limit);
        Ok(records)
    }
}
