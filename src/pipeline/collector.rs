use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::config::FetchMode;
use crate::pipeline::profile::DepthProfile;
use crate::pipeline::query_expander::QueryExpander;
use crate::pipeline::relevance::RelevanceScorer;
use crate::pipeline::{ResearchContext, RunLog};
use crate::search::{AcademicProvider, WebSearch};
use crate::types::source::{
    NEUTRAL_RELEVANCE, Source, SourceOrigin, UntrustedRecord, is_usable_url,
};
use crate::utils::normalizer::{sanitize, summarize, truncate_chars};

/// 每个来源附带摘要的长度
const SUMMARY_CHARS: usize = 300;

/// 采集结果
#[derive(Debug, Clone)]
pub struct Collection {
    /// 非空的来源列表
    pub sources: Vec<Source>,
    /// 实际使用的查询
    pub queries: Vec<String>,
}

/// 采集阶段，流水线通过该接口获取来源
#[async_trait]
pub trait CollectionStage: Send + Sync {
    async fn collect(
        &self,
        ctx: &ResearchContext,
        query: &str,
        profile: &DepthProfile,
        hints: &[String],
        log: &mut RunLog,
    ) -> Collection;
}

/// 默认采集阶段，委托给 [`SourceCollector`]
pub struct DefaultCollection;

#[async_trait]
impl CollectionStage for DefaultCollection {
    async fn collect(
        &self,
        ctx: &ResearchContext,
        query: &str,
        profile: &DepthProfile,
        hints: &[String],
        log: &mut RunLog,
    ) -> Collection {
        SourceCollector::new(ctx)
            .collect(query, profile, hints, log)
            .await
    }
}

struct Candidate {
    source: Source,
    explicit_score: Option<f64>,
}

struct ProviderSelection {
    web: Option<Arc<dyn WebSearch>>,
    academic: Vec<Arc<dyn AcademicProvider>>,
}

/// 来源采集器：查询扩展、多数据源检索、内容获取、评分排序与去重
pub struct SourceCollector<'a> {
    ctx: &'a ResearchContext,
}

impl<'a> SourceCollector<'a> {
    pub fn new(ctx: &'a ResearchContext) -> Self {
        Self { ctx }
    }

    /// 单个查询或单个来源的失败只记录日志，返回值始终非空
    pub async fn collect(
        &self,
        query: &str,
        profile: &DepthProfile,
        hints: &[String],
        log: &mut RunLog,
    ) -> Collection {
        let mut queries = QueryExpander::new(self.ctx.llm.clone())
            .expand(query, log)
            .await;
        log.info(format!("Generated {} search variations", queries.len()));
        queries.truncate(profile.max_queries);

        let selection = self.select_providers(hints, log);
        let mut candidates = Vec::new();

        // 查询之间顺序执行
        for search_query in &queries {
            if let Some(web) = &selection.web {
                self.collect_web(web.as_ref(), search_query, profile, &mut candidates, log)
                    .await;
            }
            if !selection.academic.is_empty() {
                self.collect_academic(
                    &selection.academic,
                    search_query,
                    profile,
                    &mut candidates,
                    log,
                )
                .await;
            }
        }

        let scorer = RelevanceScorer::new(self.ctx.llm.clone(), self.ctx.config.scoring.clone());
        let mut sources = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let mut source = candidate.source;
            source.relevance_score = scorer
                .score(&source.content, query, candidate.explicit_score, log)
                .await;
            sources.push(source);
        }

        rank_sources(&mut sources, profile.total_sources);
        let sources = finalize_sources(query, sources, log);
        log.info(format!("Collected {} relevant sources", sources.len()));

        Collection { sources, queries }
    }

    fn select_providers(&self, hints: &[String], log: &mut RunLog) -> ProviderSelection {
        let all = ProviderSelection {
            web: self.ctx.web_search.clone(),
            academic: self.ctx.academic.clone(),
        };
        if hints.is_empty() {
            return all;
        }

        let mut origins = HashSet::new();
        for hint in hints {
            match hint.parse::<SourceOrigin>() {
                Ok(origin) => {
                    origins.insert(origin);
                }
                Err(_) => log.warn(format!("Unknown source hint ignored: {}", hint)),
            }
        }
        if origins.is_empty() {
            log.warn("No recognised source hints, using all enabled providers");
            return all;
        }

        let web = if origins.contains(&SourceOrigin::Web) {
            if all.web.is_none() {
                log.warn("Web search requested but not enabled");
            }
            all.web
        } else {
            None
        };
        let academic = all
            .academic
            .into_iter()
            .filter(|provider| origins.contains(&provider.origin()))
            .collect();

        ProviderSelection { web, academic }
    }

    async fn collect_web(
        &self,
        web: &dyn WebSearch,
        query: &str,
        profile: &DepthProfile,
        candidates: &mut Vec<Candidate>,
        log: &mut RunLog,
    ) {
        let limit = profile
            .max_sources_per_query
            .min(self.ctx.config.search.max_results.max(1));

        let payload = match web.search(query, limit).await {
            Ok(payload) => payload,
            Err(e) => {
                log.warn(format!("Search failed for: {}: {}", query, e));
                return;
            }
        };
        let Some(records) = UntrustedRecord::split_payload(payload) else {
            log.warn(format!("Search results not an array, skipping: {}", query));
            return;
        };

        let hits: Vec<_> = records.iter().filter_map(UntrustedRecord::promote).collect();
        if hits.is_empty() {
            log.warn(format!("No valid results found for: {}", query));
            return;
        }
        log.info(format!("Found {} results for: {}", hits.len(), query));

        let fetch = &self.ctx.config.fetch;
        let timeout = Duration::from_secs(fetch.timeout_seconds);
        for hit in hits.into_iter().take(limit) {
            let outcome = self
                .ctx
                .fetcher
                .fetch_content(&hit.url, timeout, fetch.retries)
                .await;
            let snippet = hit.snippet.as_deref().map(sanitize);
            let Some(content) = self.settle_content(
                &hit.url,
                outcome,
                snippet.as_deref(),
                fetch.min_page_length,
                log,
            ) else {
                continue;
            };

            log.info(format!("Added source: {}", hit.title));
            candidates.push(Candidate {
                source: build_source(
                    hit.title,
                    hit.url,
                    &content,
                    SourceOrigin::Web,
                    None,
                    None,
                    profile,
                ),
                explicit_score: hit.score,
            });
        }
    }

    /// 学术数据源并发查询，各自失败互不影响
    async fn collect_academic(
        &self,
        providers: &[Arc<dyn AcademicProvider>],
        query: &str,
        profile: &DepthProfile,
        candidates: &mut Vec<Candidate>,
        log: &mut RunLog,
    ) {
        let limit = self
            .ctx
            .config
            .academic
            .limit_per_provider
            .min(profile.max_sources_per_query)
            .max(1);
        let results = join_all(providers.iter().map(|p| p.fetch(query, limit))).await;

        let min_length = self.ctx.config.fetch.min_content_length;
        for (provider, result) in providers.iter().zip(results) {
            let records = match result {
                Ok(records) => records,
                Err(e) => {
                    log.warn(format!(
                        "Provider {} failed for: {}: {}",
                        provider.name(),
                        query,
                        e
                    ));
                    continue;
                }
            };

            let mut added = 0;
            for record in records.into_iter().take(limit) {
                if !is_usable_url(&record.url) {
                    log.warn(format!(
                        "Skipped {} result without usable URL: {}",
                        provider.name(),
                        record.title
                    ));
                    continue;
                }
                // 摘要已随元数据返回，不再抓取页面
                let abstract_text = sanitize(&record.content);
                let Some(content) =
                    self.settle_content(&record.url, Ok(abstract_text), None, min_length, log)
                else {
                    continue;
                };

                let pdf_url = match (record.pdf_url, record.doi.as_deref()) {
                    (Some(link), _) => Some(link),
                    (None, Some(doi)) => self.resolve_pdf(doi).await,
                    (None, None) => None,
                };
                let title = if record.title.trim().is_empty() {
                    "Untitled".to_string()
                } else {
                    record.title
                };

                candidates.push(Candidate {
                    source: build_source(
                        title,
                        record.url,
                        &content,
                        provider.origin(),
                        record.doi,
                        pdf_url,
                        profile,
                    ),
                    explicit_score: record.relevance_score,
                });
                added += 1;
            }
            log.info(format!(
                "{} contributed {} sources for: {}",
                provider.name(),
                added,
                query
            ));
        }
    }

    async fn resolve_pdf(&self, doi: &str) -> Option<String> {
        match &self.ctx.open_access {
            Some(resolver) => resolver.resolve_pdf(doi).await,
            None => None,
        }
    }

    /// 内容过短或获取失败时，按抓取模式跳过，或改用搜索摘要，或替换为占位描述
    fn settle_content(
        &self,
        url: &str,
        outcome: Result<String>,
        snippet: Option<&str>,
        min_length: usize,
        log: &mut RunLog,
    ) -> Option<String> {
        let (placeholder, reason) = match outcome {
            Ok(content) if content.chars().count() > min_length => return Some(content),
            Ok(_) => (
                format!(
                    "Content from {} - Unable to load full content due to access restrictions or timeout.",
                    url
                ),
                "insufficient content".to_string(),
            ),
            Err(e) => (
                format!("Content from {} - Access restricted or unavailable.", url),
                e.to_string(),
            ),
        };

        match self.ctx.config.fetch.mode {
            FetchMode::Permissive => {
                log.warn(format!("Skipped {} - {}", url, reason));
                None
            }
            FetchMode::Degraded => {
                if let Some(snippet) = snippet.filter(|s| s.chars().count() > min_length) {
                    log.warn(format!("Using search snippet for {} - {}", url, reason));
                    return Some(snippet.to_string());
                }
                log.warn(format!("Using placeholder for {} - {}", url, reason));
                Some(placeholder)
            }
        }
    }
}

fn build_source(
    title: String,
    url: String,
    content: &str,
    origin: SourceOrigin,
    doi: Option<String>,
    pdf_url: Option<String>,
    profile: &DepthProfile,
) -> Source {
    let content = truncate_chars(content, profile.content_slice_chars).to_string();
    let summary = Some(summarize(&content, SUMMARY_CHARS));
    Source {
        title,
        url,
        content,
        origin,
        relevance_score: NEUTRAL_RELEVANCE,
        summary,
        doi,
        pdf_url,
    }
}

/// 按分数降序稳定排序，同分保持发现顺序
pub fn rank_sources(sources: &mut Vec<Source>, total: usize) {
    sources.sort_by(|a, b| {
        b.relevance_score
            .partial_cmp(&a.relevance_score)
            .unwrap_or(Ordering::Equal)
    });
    sources.truncate(total);
}

/// 兜底、地址复核与去重
pub fn finalize_sources(query: &str, mut sources: Vec<Source>, log: &mut RunLog) -> Vec<Source> {
    if sources.is_empty() {
        log.warn("No sources collected, creating fallback source");
        return vec![Source::fallback(query)];
    }

    sources.retain(Source::has_usable_url);
    if sources.is_empty() {
        log.warn("No valid sources after filtering, creating fallback source");
        return vec![Source::fallback(query)];
    }

    dedup_sources(sources)
}

/// 按 DOI > URL > 标题去重，保留首次出现的来源
pub fn dedup_sources(sources: Vec<Source>) -> Vec<Source> {
    let mut seen = HashSet::new();
    sources
        .into_iter()
        .filter(|source| seen.insert(source.dedup_key()))
        .collect()
}
