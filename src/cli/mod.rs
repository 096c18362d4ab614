use crate::config::{Config, LLMProvider};
use crate::i18n::TargetLanguage;
use crate::types::request::{Depth, ReportFormat, ResearchRequest};
use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// askademic-rs - 由Rust与AI驱动的研究助手
#[derive(Parser, Debug)]
#[command(name = "askademic-rs")]
#[command(
    about = "AI research assistant: expands a query, collects web and academic sources, analyzes them and drafts a structured report."
)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// LLM Provider (openai, moonshot, deepseek, mistral, openrouter, anthropic, gemini, ollama)
    #[arg(long, global = true)]
    pub llm_provider: Option<String>,

    /// LLM API KEY
    #[arg(long, global = true)]
    pub llm_api_key: Option<String>,

    /// LLM API基地址
    #[arg(long, global = true)]
    pub llm_api_base_url: Option<String>,

    /// 模型名称
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// 运行记录目录
    #[arg(long, global = true)]
    pub runs_dir: Option<PathBuf>,

    /// 目标语言 (en, zh, ja, ko, de, fr, ru)
    #[arg(long, global = true)]
    pub target_language: Option<String>,

    /// 是否禁用缓存
    #[arg(long, global = true)]
    pub no_cache: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// 执行一次研究
    Research {
        /// 研究问题
        query: String,

        /// 研究深度 (quick, deep, comprehensive)
        #[arg(short, long, default_value = "deep")]
        depth: String,

        /// 报告格式 (executive, detailed, academic)
        #[arg(short, long)]
        format: Option<String>,

        /// 会话ID
        #[arg(short, long, default_value = "default")]
        session: String,

        /// 限定数据源，可多次指定 (web, arxiv, crossref, pubmed, semantic_scholar, wikipedia)
        #[arg(long = "source")]
        sources: Vec<String>,
    },

    /// 基于反馈精炼已完成的研究
    Refine {
        run_id: String,

        /// 用户反馈
        #[arg(short, long)]
        feedback: String,
    },

    /// 以JSON输出完整的运行记录
    Show { run_id: String },

    /// 查看运行状态
    Status { run_id: String },

    /// 查看运行日志
    Logs { run_id: String },

    /// 查看运行采集到的来源
    Sources { run_id: String },

    /// 查看会话中最近的运行
    Latest { session_id: String },
}

/// 在创建运行之前校验研究参数
pub fn build_request(
    query: &str,
    depth: &str,
    format: Option<&str>,
    sources: &[String],
) -> Result<ResearchRequest> {
    let query = query.trim();
    if query.is_empty() {
        bail!("Query must not be empty");
    }
    let depth = depth.parse::<Depth>().map_err(anyhow::Error::msg)?;

    let mut request = ResearchRequest::new(query, depth).with_sources(
        sources
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    );
    if let Some(format) = format {
        request = request.with_format(format.parse::<ReportFormat>().map_err(anyhow::Error::msg)?);
    }
    Ok(request)
}

impl Args {
    /// 将CLI参数转换为配置，命令行参数覆盖配置文件
    pub fn to_config(&self) -> Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        // 覆盖LLM配置
        if let Some(provider_str) = &self.llm_provider {
            if let Ok(provider) = provider_str.parse::<LLMProvider>() {
                config.llm.provider = provider;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的provider: {}，使用默认provider",
                    provider_str
                );
            }
        }
        if let Some(llm_api_base_url) = &self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url.clone();
        }
        if let Some(llm_api_key) = &self.llm_api_key {
            config.llm.api_key = llm_api_key.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = model.clone();
        }

        // 目标语言配置
        if let Some(target_language_str) = &self.target_language {
            if let Ok(target_language) = target_language_str.parse::<TargetLanguage>() {
                config.target_language = target_language;
            } else {
                eprintln!(
                    "⚠️ 警告: 未知的目标语言: {}，使用默认语言 (English)",
                    target_language_str
                );
            }
        }

        if let Some(runs_dir) = &self.runs_dir {
            config.store.runs_dir = runs_dir.clone();
        }

        // 缓存配置
        if self.no_cache {
            config.cache.enabled = false;
        }

        if self.verbose {
            config.verbose = true;
        }

        Ok(config)
    }
}
