//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::cache::CacheManager;
use crate::config::{Config, LLMConfig};
use crate::llm::CompletionModel;

mod providers;

use providers::ProviderClient;

/// 补全结果的缓存分类
const COMPLETION_CACHE_CATEGORY: &str = "completion";

/// 默认系统提示词
const RESEARCH_SYSTEM_PROMPT: &str = "You are a meticulous research assistant. Follow the requested output format exactly and never invent sources.";

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: LLMConfig,
    client: ProviderClient,
    cache: Option<Arc<CacheManager>>,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: &Config) -> Result<Self> {
        let client = ProviderClient::new(&config.llm)?;
        let cache = config
            .cache
            .enabled
            .then(|| Arc::new(CacheManager::new(config.cache.clone())));
        Ok(Self {
            config: config.llm.clone(),
            client,
            cache,
        })
    }

    /// 通用重试逻辑，重试次数有上限
    async fn retry_with_backoff<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let max_retries = self.config.retry_attempts.max(1);
        let retry_delay_ms = self.config.retry_delay_ms;
        let mut retries = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    retries += 1;
                    warn!(
                        "❌ 调用模型服务出错，重试中 (第 {} / {}次尝试): {}",
                        retries, max_retries, err
                    );
                    if retries >= max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(Duration::from_millis(retry_delay_ms)).await;
                }
            }
        }
    }

    /// 单轮对话方法（不使用工具），每次尝试都有超时限制
    pub async fn prompt(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let agent = self.client.create_agent(system_prompt, &self.config)?;
        let timeout = Duration::from_secs(self.config.timeout_seconds);

        self.retry_with_backoff(|| async {
            match tokio::time::timeout(timeout, agent.prompt(user_prompt)).await {
                Ok(result) => result,
                Err(_) => Err(anyhow!(
                    "模型调用超时（{}秒）",
                    self.config.timeout_seconds
                )),
            }
        })
        .await
    }
}

#[async_trait]
impl CompletionModel for LLMClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if let Some(cache) = &self.cache
            && let Ok(Some(cached)) = cache
                .get::<String>(COMPLETION_CACHE_CATEGORY, prompt)
                .await
        {
            return Ok(cached);
        }

        let response = self.prompt(RESEARCH_SYSTEM_PROMPT, prompt).await?;

        if let Some(cache) = &self.cache
            && let Err(e) = cache
                .set(
                    COMPLETION_CACHE_CATEGORY,
                    prompt,
                    response.clone(),
                    Some(self.config.model.clone()),
                )
                .await
        {
            warn!("⚠️ 写入补全缓存失败: {}", e);
        }

        Ok(response)
    }
}
