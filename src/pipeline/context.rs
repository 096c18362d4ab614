use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::llm::{CompletionModel, LLMClient};
use crate::pipeline::collector::{CollectionStage, DefaultCollection};
use crate::search::{
    self, AcademicProvider, HttpPageFetcher, OpenAccessResolver, PageFetcher, TavilySearch,
    WebSearch,
};
use crate::store::{FileRunStore, RunStore};

/// 流水线运行所需的外部能力与配置
#[derive(Clone)]
pub struct ResearchContext {
    /// 语言模型补全能力
    pub llm: Arc<dyn CompletionModel>,
    /// 网页搜索，未启用时为 None
    pub web_search: Option<Arc<dyn WebSearch>>,
    /// 网页抓取
    pub fetcher: Arc<dyn PageFetcher>,
    /// 学术数据源
    pub academic: Vec<Arc<dyn AcademicProvider>>,
    /// 开放获取解析
    pub open_access: Option<Arc<dyn OpenAccessResolver>>,
    /// 运行记录存储
    pub store: Arc<dyn RunStore>,
    /// 采集阶段
    pub collector: Arc<dyn CollectionStage>,
    /// 配置
    pub config: Config,
}

impl ResearchContext {
    pub fn new(
        config: Config,
        llm: Arc<dyn CompletionModel>,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn RunStore>,
    ) -> Self {
        Self {
            llm,
            web_search: None,
            fetcher,
            academic: Vec::new(),
            open_access: None,
            store,
            collector: Arc::new(DefaultCollection),
            config,
        }
    }

    pub fn with_web_search(mut self, web_search: Arc<dyn WebSearch>) -> Self {
        self.web_search = Some(web_search);
        self
    }

    pub fn with_academic_providers(mut self, providers: Vec<Arc<dyn AcademicProvider>>) -> Self {
        self.academic = providers;
        self
    }

    pub fn with_open_access(mut self, resolver: Arc<dyn OpenAccessResolver>) -> Self {
        self.open_access = Some(resolver);
        self
    }

    pub fn with_collector(mut self, collector: Arc<dyn CollectionStage>) -> Self {
        self.collector = collector;
        self
    }

    /// 按配置装配真实的外部能力，运行记录保存到文件
    pub fn from_config(config: Config) -> Result<Self> {
        let llm = Arc::new(LLMClient::new(&config)?);

        let fetch_client = search::http_client(
            &config.fetch.user_agent,
            Duration::from_secs(config.fetch.timeout_seconds),
        )?;
        let fetcher = Arc::new(HttpPageFetcher::new(fetch_client));
        let store = Arc::new(FileRunStore::new(config.store.runs_dir.clone()));

        let mut context = Self::new(config.clone(), llm, fetcher, store)
            .with_academic_providers(search::build_academic_providers(&config)?);

        if config.search.enabled {
            let search_client = search::http_client(
                &config.fetch.user_agent,
                Duration::from_secs(config.search.timeout_seconds),
            )?;
            context = context.with_web_search(Arc::new(TavilySearch::new(
                search_client,
                &config.search,
            )));
        }
        if let Some(resolver) = search::build_open_access_resolver(&config)? {
            context = context.with_open_access(resolver);
        }

        Ok(context)
    }
}
