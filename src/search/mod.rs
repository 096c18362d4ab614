//! 外部数据源能力：网页搜索、网页抓取、学术元数据检索与开放获取解析
//!
//! 这些能力的返回值都不可信，调用方负责校验与兜底。

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::Config;
use crate::types::source::{NormalizedRecord, SourceOrigin};

pub mod academic;
pub mod fetch;
pub mod unpaywall;
pub mod web;

pub use fetch::HttpPageFetcher;
pub use unpaywall::UnpaywallResolver;
pub use web::TavilySearch;

/// 网页搜索能力，返回原始的未校验响应
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Value>;
}

/// 网页内容抓取能力
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_content(&self, url: &str, timeout: Duration, retries: u32) -> Result<String>;
}

/// 学术元数据检索能力
#[async_trait]
pub trait AcademicProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn origin(&self) -> SourceOrigin;

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<NormalizedRecord>>;
}

/// 开放获取链接解析能力，失败时返回 None
#[async_trait]
pub trait OpenAccessResolver: Send + Sync {
    async fn resolve_pdf(&self, doi: &str) -> Option<String>;
}

/// 创建带统一 User-Agent 与超时的HTTP客户端
pub fn http_client(user_agent: &str, timeout: Duration) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// 根据配置构建启用的学术数据源，未知名称会被忽略
pub fn build_academic_providers(config: &Config) -> Result<Vec<Arc<dyn AcademicProvider>>> {
    let client = http_client(
        &config.fetch.user_agent,
        Duration::from_secs(config.academic.timeout_seconds),
    )?;

    let mut providers: Vec<Arc<dyn AcademicProvider>> = Vec::new();
    for name in &config.academic.providers {
        match name.parse::<SourceOrigin>() {
            Ok(SourceOrigin::Arxiv) => {
                providers.push(Arc::new(academic::ArxivProvider::new(client.clone())))
            }
            Ok(SourceOrigin::Crossref) => {
                providers.push(Arc::new(academic::CrossrefProvider::new(client.clone())))
            }
            Ok(SourceOrigin::Pubmed) => {
                providers.push(Arc::new(academic::PubmedProvider::new(client.clone())))
            }
            Ok(SourceOrigin::SemanticScholar) => providers.push(Arc::new(
                academic::SemanticScholarProvider::new(client.clone()),
            )),
            Ok(SourceOrigin::Wikipedia) => {
                providers.push(Arc::new(academic::WikipediaProvider::new(client.clone())))
            }
            _ => warn!("⚠️ 未知的学术数据源: {}，已忽略", name),
        }
    }
    Ok(providers)
}

/// 构建开放获取解析器，未配置联系邮箱时返回 None
pub fn build_open_access_resolver(config: &Config) -> Result<Option<Arc<dyn OpenAccessResolver>>> {
    if config.academic.contact_email.trim().is_empty() {
        return Ok(None);
    }
    let client = http_client(
        &config.fetch.user_agent,
        Duration::from_secs(config.academic.timeout_seconds),
    )?;
    Ok(Some(Arc::new(UnpaywallResolver::new(
        client,
        config.academic.contact_email.clone(),
    ))))
}
