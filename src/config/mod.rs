use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::i18n::TargetLanguage;

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "askademic.toml";

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "moonshot")]
    Moonshot,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "mistral")]
    Mistral,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "gemini")]
    Gemini,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Moonshot => write!(f, "moonshot"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Mistral => write!(f, "mistral"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "moonshot" => Ok(LLMProvider::Moonshot),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "mistral" => Ok(LLMProvider::Mistral),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "gemini" => Ok(LLMProvider::Gemini),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// 内容抓取失败时的处理方式
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchMode {
    /// 跳过无法访问的候选
    #[serde(rename = "permissive")]
    Permissive,
    /// 以占位描述代替无法访问的内容
    #[serde(rename = "degraded")]
    #[default]
    Degraded,
}

/// 相关度评分策略
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringStrategy {
    /// 基于查询词重叠的启发式评分
    #[serde(rename = "heuristic")]
    Heuristic,
    /// 由模型直接打分
    #[serde(rename = "model")]
    #[default]
    Model,
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 报告语言
    pub target_language: TargetLanguage,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// 网页搜索配置
    pub search: SearchConfig,

    /// 网页抓取配置
    pub fetch: FetchConfig,

    /// 学术数据源配置
    pub academic: AcademicConfig,

    /// 相关度评分配置
    pub scoring: ScoringConfig,

    /// 分析阶段配置
    pub analysis: AnalysisConfig,

    /// 运行记录存储配置
    pub store: StoreConfig,

    /// 缓存配置
    pub cache: CacheConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址，为空时使用各Provider的默认地址
    pub api_base_url: String,

    /// 模型名称
    pub model: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度
    pub temperature: f64,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试间隔（毫秒）
    pub retry_delay_ms: u64,

    /// 超时时间（秒）
    pub timeout_seconds: u64,
}

/// 网页搜索配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub enabled: bool,
    pub api_key: String,
    pub endpoint: String,
    /// 单次搜索返回的最大结果数
    pub max_results: usize,
    pub timeout_seconds: u64,
}

/// 网页抓取配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    /// 单次抓取超时（秒）
    pub timeout_seconds: u64,
    /// 抓取失败后的重试次数
    pub retries: u32,
    /// 接受一个来源所需的最短内容长度
    pub min_content_length: usize,
    /// 抓取结果短于该长度时视为无法访问
    pub min_page_length: usize,
    pub mode: FetchMode,
    pub user_agent: String,
}

/// 学术数据源配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AcademicConfig {
    /// 启用的数据源（arxiv, crossref, pubmed, semantic_scholar, wikipedia）
    pub providers: Vec<String>,
    /// 每个数据源每次查询的结果上限
    pub limit_per_provider: usize,
    /// Unpaywall 联系邮箱，为空时不解析开放获取链接
    pub contact_email: String,
    pub timeout_seconds: u64,
}

/// 相关度评分配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ScoringConfig {
    pub strategy: ScoringStrategy,
    /// 数据源已给出评分时直接采用
    pub prefer_explicit_scores: bool,
}

/// 分析阶段配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    /// 每个来源进入分析上下文的最大字符数
    pub source_slice_chars: usize,
    /// 合并后上下文的最大字符数
    pub max_context_chars: usize,
}

/// 运行记录存储配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct StoreConfig {
    pub runs_dir: PathBuf,
}

/// 缓存配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CacheConfig {
    /// 是否启用缓存
    pub enabled: bool,

    /// 缓存目录
    pub cache_dir: PathBuf,

    /// 缓存过期时间（小时）
    pub expire_hours: u64,
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 按优先级加载配置：显式路径 > 当前目录下的默认文件 > 默认值
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let default_config_path = std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(DEFAULT_CONFIG_FILE);
        if default_config_path.exists() {
            return Self::from_file(&default_config_path);
        }

        Ok(Config::default())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_language: TargetLanguage::default(),
            llm: LLMConfig::default(),
            search: SearchConfig::default(),
            fetch: FetchConfig::default(),
            academic: AcademicConfig::default(),
            scoring: ScoringConfig::default(),
            analysis: AnalysisConfig::default(),
            store: StoreConfig::default(),
            cache: CacheConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: std::env::var("ASKADEMIC_LLM_API_KEY").unwrap_or_default(),
            api_base_url: String::new(),
            model: String::from("gpt-4o-mini"),
            max_tokens: 1500,
            temperature: 0.3,
            retry_attempts: 3,
            retry_delay_ms: 2000,
            timeout_seconds: 120,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: std::env::var("TAVILY_API_KEY").unwrap_or_default(),
            endpoint: String::from("https://api.tavily.com/search"),
            max_results: 10,
            timeout_seconds: 30,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            retries: 2,
            min_content_length: 20,
            min_page_length: 50,
            mode: FetchMode::default(),
            user_agent: String::from("askademic-rs/0.3 (research assistant)"),
        }
    }
}

impl Default for AcademicConfig {
    fn default() -> Self {
        Self {
            providers: vec![
                "arxiv".to_string(),
                "crossref".to_string(),
                "pubmed".to_string(),
                "semantic_scholar".to_string(),
                "wikipedia".to_string(),
            ],
            limit_per_provider: 5,
            contact_email: String::new(),
            timeout_seconds: 15,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            strategy: ScoringStrategy::default(),
            prefer_explicit_scores: false,
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            source_slice_chars: 600,
            max_context_chars: 3000,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            runs_dir: PathBuf::from(".askademic/runs"),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_dir: PathBuf::from(".askademic/cache"),
            expire_hours: 168,
        }
    }
}
