use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 兜底来源使用的占位地址
pub const PLACEHOLDER_URL: &str = "https://search-results.com";

/// 初始化时的中性相关度
pub const NEUTRAL_RELEVANCE: f64 = 0.5;

/// 来源的提供方标记
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceOrigin {
    #[serde(rename = "web")]
    Web,
    #[serde(rename = "arxiv")]
    Arxiv,
    #[serde(rename = "crossref")]
    Crossref,
    #[serde(rename = "pubmed")]
    Pubmed,
    #[serde(rename = "semantic_scholar")]
    SemanticScholar,
    #[serde(rename = "wikipedia")]
    Wikipedia,
    #[serde(rename = "fallback")]
    Fallback,
}

impl std::fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceOrigin::Web => write!(f, "web"),
            SourceOrigin::Arxiv => write!(f, "arxiv"),
            SourceOrigin::Crossref => write!(f, "crossref"),
            SourceOrigin::Pubmed => write!(f, "pubmed"),
            SourceOrigin::SemanticScholar => write!(f, "semantic_scholar"),
            SourceOrigin::Wikipedia => write!(f, "wikipedia"),
            SourceOrigin::Fallback => write!(f, "fallback"),
        }
    }
}

impl std::str::FromStr for SourceOrigin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "web" | "tavily" => Ok(SourceOrigin::Web),
            "arxiv" => Ok(SourceOrigin::Arxiv),
            "crossref" => Ok(SourceOrigin::Crossref),
            "pubmed" => Ok(SourceOrigin::Pubmed),
            "semantic_scholar" | "semanticscholar" => Ok(SourceOrigin::SemanticScholar),
            "wikipedia" => Ok(SourceOrigin::Wikipedia),
            _ => Err(format!("Unknown source origin: {}", s)),
        }
    }
}

/// 研究来源，采集阶段结束后不再修改
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Source {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(rename = "source_type")]
    pub origin: SourceOrigin,
    pub relevance_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
}

impl Source {
    /// 当采集不到任何来源时合成的兜底来源
    pub fn fallback(query: &str) -> Self {
        Self {
            title: format!("Research on: {}", query),
            url: PLACEHOLDER_URL.to_string(),
            content: format!(
                "Research query: {}. This analysis is based on general knowledge and search results.",
                query
            ),
            origin: SourceOrigin::Fallback,
            relevance_score: 0.8,
            summary: None,
            doi: None,
            pdf_url: None,
        }
    }

    /// 去重键：DOI > URL > 标题，忽略大小写
    pub fn dedup_key(&self) -> String {
        let key = self
            .doi
            .as_deref()
            .filter(|doi| !doi.trim().is_empty())
            .or_else(|| Some(self.url.as_str()).filter(|url| !url.trim().is_empty()))
            .unwrap_or(self.title.as_str());
        key.trim().to_lowercase()
    }

    pub fn has_usable_url(&self) -> bool {
        is_usable_url(&self.url)
    }
}

/// 判断地址是否可用（排除空值、字面量 undefined/null 以及占位地址）
pub fn is_usable_url(url: &str) -> bool {
    let url = url.trim();
    !url.is_empty()
        && !url.eq_ignore_ascii_case("undefined")
        && !url.eq_ignore_ascii_case("null")
        && url.trim_end_matches('/') != PLACEHOLDER_URL
}

/// 学术数据源返回的规范化记录
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct NormalizedRecord {
    pub title: String,
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub doi: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub relevance_score: Option<f64>,
}

/// 经过校验的搜索结果
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: Option<String>,
    pub score: Option<f64>,
}

/// 未经校验的外部搜索记录，字段是否存在都不可信
#[derive(Debug, Clone)]
pub struct UntrustedRecord(pub Value);

impl UntrustedRecord {
    /// 将搜索响应拆分为记录列表，非数组响应返回 None
    pub fn split_payload(payload: Value) -> Option<Vec<UntrustedRecord>> {
        let items = match payload {
            Value::Array(items) => items,
            // 兼容 {"results": [...]} 形式的响应
            Value::Object(mut map) => match map.remove("results") {
                Some(Value::Array(items)) => items,
                _ => return None,
            },
            _ => return None,
        };
        Some(items.into_iter().map(UntrustedRecord).collect())
    }

    /// 校验后提升为内部类型，缺少可用地址时返回 None
    pub fn promote(&self) -> Option<SearchHit> {
        let object = self.0.as_object()?;
        let url = object.get("url")?.as_str()?.trim();
        if !is_usable_url(url) {
            return None;
        }

        let title = object
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or("Web Source")
            .to_string();
        let snippet = object
            .get("content")
            .or_else(|| object.get("snippet"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let score = object.get("score").and_then(Value::as_f64);

        Some(SearchHit {
            title,
            url: url.to_string(),
            snippet,
            score,
        })
    }
}
