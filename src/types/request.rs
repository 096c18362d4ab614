use serde::{Deserialize, Serialize};

/// 研究深度
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    #[serde(rename = "quick")]
    Quick,
    #[serde(rename = "deep")]
    #[default]
    Deep,
    #[serde(rename = "comprehensive")]
    Comprehensive,
}

impl std::fmt::Display for Depth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Depth::Quick => write!(f, "quick"),
            Depth::Deep => write!(f, "deep"),
            Depth::Comprehensive => write!(f, "comprehensive"),
        }
    }
}

impl std::str::FromStr for Depth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quick" => Ok(Depth::Quick),
            "deep" => Ok(Depth::Deep),
            "comprehensive" => Ok(Depth::Comprehensive),
            _ => Err(format!("Unknown depth: {}", s)),
        }
    }
}

/// 报告格式
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    #[serde(rename = "executive")]
    Executive,
    #[serde(rename = "detailed")]
    Detailed,
    #[serde(rename = "academic")]
    Academic,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Executive => write!(f, "executive"),
            ReportFormat::Detailed => write!(f, "detailed"),
            ReportFormat::Academic => write!(f, "academic"),
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "executive" => Ok(ReportFormat::Executive),
            "detailed" => Ok(ReportFormat::Detailed),
            "academic" => Ok(ReportFormat::Academic),
            _ => Err(format!("Unknown report format: {}", s)),
        }
    }
}

/// 一次研究请求，提交后不再修改
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResearchRequest {
    pub query: String,

    pub depth: Depth,

    /// 显式指定的数据源（如 web、arxiv、crossref）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ReportFormat>,

    /// 精炼请求的用户反馈
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement_feedback: Option<String>,

    /// 精炼请求所引用的原始运行
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_run_id: Option<String>,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>, depth: Depth) -> Self {
        Self {
            query: query.into(),
            depth,
            sources: Vec::new(),
            format: None,
            refinement_feedback: None,
            original_run_id: None,
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    /// 基于原始请求构建精炼请求
    pub fn for_refinement(&self, feedback: &str, original_run_id: &str) -> Self {
        Self {
            refinement_feedback: Some(feedback.to_string()),
            original_run_id: Some(original_run_id.to_string()),
            ..self.clone()
        }
    }
}
