use anyhow::{Result, anyhow};
use askademic_rs::config::{Config, FetchMode};
use askademic_rs::error::ResearchError;
use askademic_rs::llm::CompletionModel;
use askademic_rs::pipeline::analyzer::Analyzer;
use askademic_rs::pipeline::collector::{Collection, CollectionStage, SourceCollector};
use askademic_rs::pipeline::{DepthProfile, ResearchContext, ResearchOrchestrator, RunLog};
use askademic_rs::search::{AcademicProvider, OpenAccessResolver, PageFetcher, WebSearch};
use askademic_rs::store::{MemoryRunStore, RunStore};
use askademic_rs::types::analysis::Analysis;
use askademic_rs::types::request::{Depth, ResearchRequest};
use askademic_rs::types::run::{LogLevel, RunStatus};
use askademic_rs::types::source::{NormalizedRecord, PLACEHOLDER_URL, SourceOrigin};
use askademic_rs::utils::token_estimator::TokenEstimator;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const EXPANSION: &str = "Query 1: solar capacity growth 2024\nQuery 2: wind power market outlook";

const ANALYSIS: &str = r#"Here is the analysis:
{
  "summary": "Renewable capacity keeps growing while storage costs fall.",
  "key_findings": ["Solar additions set records", "Wind auctions recovered", "Battery prices declined"],
  "confidence_score": 0.82,
  "recommendations": ["Invest in grid storage", "Streamline permitting"]
}"#;

const REPORT: &str = "# Renewable Energy Trends\n\n## Executive Summary\nCapacity is growing fast.\n\n## Key Findings\n- Solar leads.\n\n## Recommendations\n- Build storage.";

const REFINED: &str = "# Renewable Energy Trends\n\nSolar leads; build storage.";

/// 按提示词开头分派的模型替身
#[derive(Default)]
struct ScriptedModel {
    prompts: Mutex<Vec<String>>,
    fail_report: bool,
}

impl ScriptedModel {
    fn failing_report() -> Self {
        Self {
            fail_report: true,
            ..Self::default()
        }
    }

    fn prompts_starting_with(&self, prefix: &str) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if prompt.starts_with("Generate") {
            Ok(EXPANSION.to_string())
        } else if prompt.starts_with("Rate relevance") {
            Ok("0.9".to_string())
        } else if prompt.starts_with("Provide a") {
            Ok(ANALYSIS.to_string())
        } else if prompt.starts_with("Create a") {
            if self.fail_report {
                Err(anyhow!("report model unavailable"))
            } else {
                Ok(REPORT.to_string())
            }
        } else if prompt.starts_with("Improve this") {
            Ok(REFINED.to_string())
        } else {
            Err(anyhow!("unexpected prompt"))
        }
    }
}

/// 返回固定结构结果的搜索替身，结果地址随查询变化
#[derive(Default)]
struct ScriptedSearch {
    queries: Mutex<Vec<String>>,
}

#[async_trait]
impl WebSearch for ScriptedSearch {
    async fn search(&self, query: &str, limit: usize) -> Result<Value> {
        self.queries.lock().unwrap().push(query.to_string());
        let slug = query.replace(' ', "-");
        let mut results = vec![
            json!({"title": "Broken", "url": "undefined"}),
            json!({"title": "Placeholder", "url": PLACEHOLDER_URL}),
        ];
        for i in 0..limit {
            results.push(json!({
                "title": format!("{} #{}", query, i),
                "url": format!("https://example.org/{}/{}", slug, i),
                "content": "snippet",
            }));
        }
        Ok(json!({ "results": results }))
    }
}

struct PayloadSearch(Value);

#[async_trait]
impl WebSearch for PayloadSearch {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Value> {
        Ok(self.0.clone())
    }
}

struct FailingSearch;

#[async_trait]
impl WebSearch for FailingSearch {
    async fn search(&self, _query: &str, _limit: usize) -> Result<Value> {
        Err(anyhow!("search provider is down"))
    }
}

#[derive(Default)]
struct ScriptedFetcher {
    fail: bool,
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch_content(&self, url: &str, _timeout: Duration, _retries: u32) -> Result<String> {
        if self.fail {
            return Err(anyhow!("connection reset"));
        }
        Ok(format!(
            "The page at {} discusses renewable energy trends, solar capacity growth and storage costs in detail.",
            url
        ))
    }
}

struct StaticProvider {
    name: &'static str,
    origin: SourceOrigin,
    records: Vec<NormalizedRecord>,
}

#[async_trait]
impl AcademicProvider for StaticProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn origin(&self) -> SourceOrigin {
        self.origin
    }

    async fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<NormalizedRecord>> {
        Ok(self.records.clone())
    }
}

struct FailingProvider;

#[async_trait]
impl AcademicProvider for FailingProvider {
    fn name(&self) -> &'static str {
        "crossref"
    }

    fn origin(&self) -> SourceOrigin {
        SourceOrigin::Crossref
    }

    async fn fetch(&self, _query: &str, _limit: usize) -> Result<Vec<NormalizedRecord>> {
        Err(anyhow!("503 Service Unavailable"))
    }
}

struct StaticResolver;

#[async_trait]
impl OpenAccessResolver for StaticResolver {
    async fn resolve_pdf(&self, doi: &str) -> Option<String> {
        Some(format!("https://oa.example.org/{}.pdf", doi))
    }
}

/// 不返回任何来源的采集阶段
struct EmptyCollection;

#[async_trait]
impl CollectionStage for EmptyCollection {
    async fn collect(
        &self,
        _ctx: &ResearchContext,
        query: &str,
        _profile: &DepthProfile,
        _hints: &[String],
        log: &mut RunLog,
    ) -> Collection {
        log.info("Collected 0 relevant sources");
        Collection {
            sources: Vec::new(),
            queries: vec![query.to_string()],
        }
    }
}

fn paper(url: &str, doi: Option<&str>) -> NormalizedRecord {
    NormalizedRecord {
        title: "Storage Cost Trajectories".to_string(),
        url: url.to_string(),
        content: "<p>We model the <i>cost decline</i> of grid-scale battery storage through 2030.</p>"
            .to_string(),
        doi: doi.map(str::to_string),
        pdf_url: None,
        relevance_score: None,
    }
}

fn build_context(
    config: Config,
    model: Arc<ScriptedModel>,
    fetcher: ScriptedFetcher,
) -> (ResearchContext, Arc<MemoryRunStore>) {
    let store = Arc::new(MemoryRunStore::new());
    let ctx = ResearchContext::new(config, model, Arc::new(fetcher), store.clone());
    (ctx, store)
}

#[tokio::test]
async fn scenario_quick_depth_uses_quick_profile() {
    let model = Arc::new(ScriptedModel::default());
    let search = Arc::new(ScriptedSearch::default());
    let (ctx, _store) = build_context(Config::default(), model.clone(), ScriptedFetcher::default());
    let orchestrator = ResearchOrchestrator::new(ctx.with_web_search(search.clone()));

    let run = orchestrator
        .execute(
            "session-a",
            ResearchRequest::new("renewable energy trends", Depth::Quick),
        )
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Completed);
    let output = run.research_output().unwrap();
    let quick = DepthProfile::resolve(Depth::Quick);

    assert!(!output.sources.is_empty());
    assert!(output.sources.len() <= quick.total_sources);
    assert_eq!(output.metadata.sources_collected, output.sources.len());
    assert_eq!(output.metadata.confidence_level, 0.82);
    assert_eq!(
        output.metadata.total_tokens_used,
        TokenEstimator::new().estimate_run(&output.sources, &output.analysis, &output.report)
    );
    assert!(output.sources.iter().all(|s| s.url.starts_with("https://example.org/")));
    assert!(output.sources.iter().all(|s| s.summary.is_some()));

    // quick 深度只使用两个查询
    let queries = search.queries.lock().unwrap().clone();
    assert_eq!(
        queries,
        vec!["renewable energy trends", "solar capacity growth 2024"]
    );

    let report_prompts = model.prompts_starting_with("Create a");
    assert_eq!(report_prompts.len(), 1);
    assert!(report_prompts[0].contains("## Executive Summary\n## Key Findings\n## Recommendations"));
    assert!(report_prompts[0].contains("300-500 words"));
    assert!(!report_prompts[0].contains("## Background"));

    assert_eq!(output.report, REPORT);
    assert!(output.logs[0].starts_with("Research initiated for query: \"renewable energy trends\""));
    assert!(output.logs.iter().any(|l| l.starts_with("Collected ")));
    assert!(!run.logs.is_empty());
}

#[tokio::test]
async fn scenario_all_providers_fail_yields_fallback_source() {
    let model = Arc::new(ScriptedModel::default());
    let (ctx, _store) = build_context(Config::default(), model.clone(), ScriptedFetcher::default());
    let ctx = ctx
        .with_web_search(Arc::new(FailingSearch))
        .with_academic_providers(vec![Arc::new(FailingProvider) as Arc<dyn AcademicProvider>]);

    let profile = DepthProfile::resolve(Depth::Deep);
    let mut log = RunLog::new("direct");
    let collection = SourceCollector::new(&ctx)
        .collect("tidal energy", &profile, &[], &mut log)
        .await;

    assert_eq!(collection.sources.len(), 1);
    let fallback = &collection.sources[0];
    assert_eq!(fallback.url, PLACEHOLDER_URL);
    assert!((fallback.relevance_score - 0.8).abs() < f64::EPSILON);
    assert_eq!(fallback.origin, SourceOrigin::Fallback);
    assert!(fallback.content.contains("tidal energy"));
    assert!(log.warnings() > 0);

    // 分析在兜底来源上正常进行
    let analysis = Analyzer::new(model.clone(), ctx.config.analysis.clone())
        .analyze(&collection.sources, &profile, &mut log)
        .await
        .unwrap();
    assert_eq!(analysis.confidence_score, 0.82);

    let orchestrator = ResearchOrchestrator::new(ctx);
    let run = orchestrator
        .execute("session-b", ResearchRequest::new("tidal energy", Depth::Deep))
        .await
        .unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.research_output().unwrap().sources.len(), 1);
}

#[tokio::test]
async fn scenario_refinement_creates_linked_run() {
    let model = Arc::new(ScriptedModel::default());
    let (ctx, store) = build_context(Config::default(), model.clone(), ScriptedFetcher::default());
    let orchestrator =
        ResearchOrchestrator::new(ctx.with_web_search(Arc::new(ScriptedSearch::default())));

    let original = orchestrator
        .execute(
            "session-c",
            ResearchRequest::new("renewable energy trends", Depth::Deep),
        )
        .await
        .unwrap();
    assert_eq!(original.status, RunStatus::Completed);

    let refined = orchestrator
        .refine(&original.id, "make it shorter")
        .await
        .unwrap();

    assert_ne!(refined.id, original.id);
    assert_eq!(refined.status, RunStatus::Completed);
    assert_eq!(refined.session_id, "session-c");
    assert_eq!(refined.input.original_run_id.as_deref(), Some(original.id.as_str()));
    assert_eq!(refined.input.refinement_feedback.as_deref(), Some("make it shorter"));
    assert_eq!(refined.input.query, original.input.query);

    let original_output = original.research_output().unwrap();
    let refined_output = refined.research_output().unwrap();
    assert_ne!(refined_output.report, original_output.report);
    assert_eq!(refined_output.report, REFINED);
    assert_eq!(refined_output.sources, original_output.sources);
    assert_eq!(
        refined_output.refinement.as_ref().unwrap().feedback,
        "make it shorter"
    );

    let refine_prompts = model.prompts_starting_with("Improve this");
    assert_eq!(refine_prompts.len(), 1);
    assert!(refine_prompts[0].contains(REPORT));

    // 原运行保持不变
    let stored_original = orchestrator.get(&original.id).await.unwrap();
    assert_eq!(stored_original.research_output().unwrap().report, REPORT);
    assert!(stored_original.research_output().unwrap().refinement.is_none());

    let latest = store.latest_for_session("session-c").await.unwrap().unwrap();
    assert_eq!(latest.id, refined.id);
}

#[tokio::test]
async fn refinement_requires_completed_run() {
    let model = Arc::new(ScriptedModel::failing_report());
    let (ctx, store) = build_context(Config::default(), model, ScriptedFetcher::default());
    let orchestrator = ResearchOrchestrator::new(ctx);

    let err = orchestrator.refine("missing", "more detail").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResearchError>(),
        Some(ResearchError::RunNotFound(_))
    ));

    let failed = orchestrator
        .execute("s", ResearchRequest::new("geothermal", Depth::Quick))
        .await
        .unwrap();
    assert_eq!(failed.status, RunStatus::Failed);

    let err = orchestrator.refine(&failed.id, "more detail").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResearchError>(),
        Some(ResearchError::RunNotCompleted(_))
    ));
    // 没有创建新的运行
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn analyzer_rejects_empty_sources() {
    let model = Arc::new(ScriptedModel::default());
    let analyzer = Analyzer::new(model.clone(), Config::default().analysis);
    let mut log = RunLog::new("direct");

    let err = analyzer
        .analyze(&[], &DepthProfile::resolve(Depth::Quick), &mut log)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResearchError>(),
        Some(ResearchError::NoSources)
    ));
    assert_eq!(err.to_string(), "No sources available for analysis");
    assert!(model.prompts_starting_with("Provide a").is_empty());
}

#[tokio::test]
async fn pipeline_failure_is_persisted_as_failed() {
    let model = Arc::new(ScriptedModel::failing_report());
    let (ctx, store) = build_context(Config::default(), model, ScriptedFetcher::default());
    let orchestrator =
        ResearchOrchestrator::new(ctx.with_web_search(Arc::new(ScriptedSearch::default())));

    let run = orchestrator
        .execute("s", ResearchRequest::new("geothermal", Depth::Quick))
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.research_output().is_none());
    assert!(run.failure().unwrap().error.contains("report model unavailable"));

    let stored = store.get(&run.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
    let logs = orchestrator.logs(&run.id).await.unwrap();
    assert!(logs.iter().any(|e| e.level == LogLevel::Error));

    let raw = serde_json::to_value(&stored.output).unwrap();
    assert!(raw.get("error").is_some());
    assert!(raw.get("timestamp").is_some());
    assert!(raw.get("report").is_none());
}

#[tokio::test]
async fn degraded_mode_substitutes_placeholder_content() {
    let model = Arc::new(ScriptedModel::default());
    let (ctx, _store) = build_context(
        Config::default(),
        model,
        ScriptedFetcher { fail: true },
    );
    let ctx = ctx.with_web_search(Arc::new(ScriptedSearch::default()));

    let mut log = RunLog::new("direct");
    let collection = SourceCollector::new(&ctx)
        .collect("heat pumps", &DepthProfile::resolve(Depth::Quick), &[], &mut log)
        .await;

    assert!(!collection.sources.is_empty());
    for source in &collection.sources {
        assert_ne!(source.url, PLACEHOLDER_URL);
        assert_eq!(
            source.content,
            format!("Content from {} - Access restricted or unavailable.", source.url)
        );
    }
}

#[tokio::test]
async fn permissive_mode_skips_unreachable_pages() {
    let mut config = Config::default();
    config.fetch.mode = FetchMode::Permissive;
    let model = Arc::new(ScriptedModel::default());
    let (ctx, _store) = build_context(config, model, ScriptedFetcher { fail: true });
    let ctx = ctx.with_web_search(Arc::new(ScriptedSearch::default()));

    let mut log = RunLog::new("direct");
    let collection = SourceCollector::new(&ctx)
        .collect("heat pumps", &DepthProfile::resolve(Depth::Quick), &[], &mut log)
        .await;

    assert_eq!(collection.sources.len(), 1);
    assert_eq!(collection.sources[0].url, PLACEHOLDER_URL);
}

#[tokio::test]
async fn malformed_search_payloads_are_recoverable() {
    for payload in [
        json!("rate limited"),
        json!({"error": "bad request"}),
        json!([{"url": "undefined"}, {"title": "no url"}, {"url": PLACEHOLDER_URL}]),
    ] {
        let model = Arc::new(ScriptedModel::default());
        let (ctx, _store) = build_context(Config::default(), model, ScriptedFetcher::default());
        let ctx = ctx.with_web_search(Arc::new(PayloadSearch(payload)));

        let mut log = RunLog::new("direct");
        let collection = SourceCollector::new(&ctx)
            .collect("ocean acidification", &DepthProfile::resolve(Depth::Deep), &[], &mut log)
            .await;

        assert_eq!(collection.sources.len(), 1);
        assert_eq!(collection.sources[0].url, PLACEHOLDER_URL);
    }
}

#[tokio::test]
async fn academic_sources_dedup_by_doi_and_resolve_pdf() {
    let model = Arc::new(ScriptedModel::default());
    let (ctx, _store) = build_context(Config::default(), model, ScriptedFetcher::default());
    let providers: Vec<Arc<dyn AcademicProvider>> = vec![
        Arc::new(StaticProvider {
            name: "crossref",
            origin: SourceOrigin::Crossref,
            records: vec![paper("https://doi.org/10.1/store", Some("10.1/STORE"))],
        }),
        Arc::new(FailingProvider),
        Arc::new(StaticProvider {
            name: "semantic_scholar",
            origin: SourceOrigin::SemanticScholar,
            records: vec![paper(
                "https://www.semanticscholar.org/paper/abc",
                Some("10.1/store"),
            )],
        }),
    ];
    let ctx = ctx
        .with_academic_providers(providers)
        .with_open_access(Arc::new(StaticResolver));

    let mut log = RunLog::new("direct");
    let collection = SourceCollector::new(&ctx)
        .collect("battery storage costs", &DepthProfile::resolve(Depth::Deep), &[], &mut log)
        .await;

    assert_eq!(collection.sources.len(), 1);
    let source = &collection.sources[0];
    assert_eq!(source.origin, SourceOrigin::Crossref);
    assert_eq!(source.doi.as_deref(), Some("10.1/STORE"));
    assert_eq!(
        source.pdf_url.as_deref(),
        Some("https://oa.example.org/10.1/STORE.pdf")
    );
    // 摘要中的标记被清理
    assert!(!source.content.contains('<'));
    assert!(source.content.starts_with("We model the cost decline"));
}

#[tokio::test]
async fn source_hints_restrict_providers() {
    let model = Arc::new(ScriptedModel::default());
    let search = Arc::new(ScriptedSearch::default());
    let (ctx, _store) = build_context(Config::default(), model, ScriptedFetcher::default());
    let arxiv: Arc<dyn AcademicProvider> = Arc::new(StaticProvider {
        name: "arxiv",
        origin: SourceOrigin::Arxiv,
        records: vec![paper("http://arxiv.org/abs/2401.00001v1", None)],
    });
    let ctx = ctx
        .with_web_search(search.clone())
        .with_academic_providers(vec![arxiv]);

    let mut log = RunLog::new("direct");
    let hints = vec!["arxiv".to_string(), "myspace".to_string()];
    let collection = SourceCollector::new(&ctx)
        .collect("battery storage costs", &DepthProfile::resolve(Depth::Quick), &hints, &mut log)
        .await;

    assert!(search.queries.lock().unwrap().is_empty());
    assert_eq!(collection.sources.len(), 1);
    assert_eq!(collection.sources[0].origin, SourceOrigin::Arxiv);
    assert!(
        log.lines()
            .iter()
            .any(|l| l == "Unknown source hint ignored: myspace")
    );
}

#[tokio::test]
async fn analysis_fallback_on_malformed_model_output() {
    struct Rambling;

    #[async_trait]
    impl CompletionModel for Rambling {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok("{ this is not json }".to_string())
        }
    }

    let analyzer = Analyzer::new(Arc::new(Rambling), Config::default().analysis);
    let mut log = RunLog::new("direct");
    let analysis = analyzer
        .analyze(
            &[askademic_rs::types::source::Source::fallback("q")],
            &DepthProfile::resolve(Depth::Comprehensive),
            &mut log,
        )
        .await
        .unwrap();
    assert_eq!(analysis, Analysis::fallback());
}

#[tokio::test]
async fn empty_collection_fails_run_with_no_sources() {
    let model = Arc::new(ScriptedModel::default());
    let (ctx, store) = build_context(Config::default(), model.clone(), ScriptedFetcher::default());
    let orchestrator = ResearchOrchestrator::new(ctx.with_collector(Arc::new(EmptyCollection)));

    let run = orchestrator
        .execute("s", ResearchRequest::new("dark matter", Depth::Deep))
        .await
        .unwrap();

    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.research_output().is_none());
    assert_eq!(
        run.failure().unwrap().error,
        "No sources available for analysis"
    );
    assert!(model.prompts_starting_with("Provide a").is_empty());
    assert!(model.prompts_starting_with("Create a").is_empty());

    let stored = store.get(&run.id).await.unwrap().unwrap();
    assert_eq!(stored.status, RunStatus::Failed);
    assert!(stored.logs.iter().any(|e| e.level == LogLevel::Error
        && e.message.contains("No sources available for analysis")));
}

#[tokio::test]
async fn degraded_mode_prefers_search_snippet() {
    let payload = json!([{
        "title": "Heat pump basics",
        "url": "https://example.org/heat-pumps",
        "content": "<b>Heat pumps</b> move heat with a refrigerant cycle and cut household emissions.",
    }]);
    let model = Arc::new(ScriptedModel::default());
    let (ctx, _store) = build_context(
        Config::default(),
        model,
        ScriptedFetcher { fail: true },
    );
    let ctx = ctx.with_web_search(Arc::new(PayloadSearch(payload)));

    let mut log = RunLog::new("direct");
    let collection = SourceCollector::new(&ctx)
        .collect("heat pumps", &DepthProfile::resolve(Depth::Quick), &[], &mut log)
        .await;

    assert_eq!(collection.sources.len(), 1);
    assert_eq!(
        collection.sources[0].content,
        "Heat pumps move heat with a refrigerant cycle and cut household emissions."
    );
}
