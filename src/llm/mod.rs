use anyhow::Result;
use async_trait::async_trait;

pub mod client;

pub use client::LLMClient;

/// 文本补全能力：输入prompt，返回模型的原始文本输出
///
/// 结构化输出可能被截断或不是合法JSON，调用方必须自备兜底值。
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}
