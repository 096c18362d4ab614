use thiserror::Error;

use crate::types::run::RunStatus;

/// 会使运行失败或被拒绝的错误
#[derive(Debug, Error)]
pub enum ResearchError {
    #[error("No sources available for analysis")]
    NoSources,

    #[error("Run not found: {0}")]
    RunNotFound(String),

    #[error("Run {0} is not completed")]
    RunNotCompleted(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },
}
