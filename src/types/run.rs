use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::analysis::Analysis;
use crate::types::request::ResearchRequest;
use crate::types::source::Source;

/// 运行状态
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Processing => write!(f, "processing"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

impl RunStatus {
    /// pending → processing → {completed | failed}，pending 也可直接失败
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Processing)
                | (RunStatus::Pending, RunStatus::Failed)
                | (RunStatus::Processing, RunStatus::Completed)
                | (RunStatus::Processing, RunStatus::Failed)
        )
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "info")]
    Info,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "error")]
    Error,
}

/// 运行日志条目
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RunMetadata {
    pub sources_collected: usize,
    pub analysis_duration_ms: u64,
    pub confidence_level: f64,
    pub total_tokens_used: usize,
}

/// 精炼信息
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Refinement {
    pub feedback: String,
    pub refined_at: DateTime<Utc>,
}

/// 成功运行的完整输出
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ResearchOutput {
    pub sources: Vec<Source>,
    pub analysis: Analysis,
    pub report: String,
    pub metadata: RunMetadata,
    #[serde(default)]
    pub logs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement: Option<Refinement>,
}

/// 失败运行的错误详情
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RunFailure {
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl RunFailure {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            timestamp: Utc::now(),
        }
    }
}

/// 运行的终态输出
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum RunOutput {
    Completed(Box<ResearchOutput>),
    Failed(RunFailure),
}

impl RunOutput {
    pub fn status(&self) -> RunStatus {
        match self {
            RunOutput::Completed(_) => RunStatus::Completed,
            RunOutput::Failed(_) => RunStatus::Failed,
        }
    }
}

/// 持久化的运行记录
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Run {
    pub id: String,
    pub session_id: String,
    pub input: ResearchRequest,
    pub status: RunStatus,
    #[serde(default)]
    pub output: Option<RunOutput>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Run {
    pub fn new(session_id: &str, input: ResearchRequest) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            input,
            status: RunStatus::Pending,
            output: None,
            logs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 仅在完成状态下返回输出，失败的运行不暴露部分结果
    pub fn research_output(&self) -> Option<&ResearchOutput> {
        match (&self.status, &self.output) {
            (RunStatus::Completed, Some(RunOutput::Completed(output))) => Some(output),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&RunFailure> {
        match &self.output {
            Some(RunOutput::Failed(failure)) => Some(failure),
            _ => None,
        }
    }
}
