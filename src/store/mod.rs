//! 运行记录存储

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use crate::error::ResearchError;
use crate::types::request::ResearchRequest;
use crate::types::run::{LogEntry, Run, RunOutput, RunStatus};

mod file;
mod memory;

pub use file::FileRunStore;
pub use memory::MemoryRunStore;

/// 运行记录存储。每个运行同一时刻只有一个写入方。
#[async_trait]
pub trait RunStore: Send + Sync {
    /// 以 pending 状态创建运行，返回运行ID
    async fn create(&self, session_id: &str, input: ResearchRequest) -> Result<String>;

    async fn update_status(&self, id: &str, status: RunStatus) -> Result<()>;

    /// 写入终态输出，状态随输出一起切换为 completed 或 failed
    async fn update_output(&self, id: &str, output: RunOutput) -> Result<()>;

    async fn append_logs(&self, id: &str, entries: &[LogEntry]) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Option<Run>>;

    /// 会话中最近创建的运行
    async fn latest_for_session(&self, session_id: &str) -> Result<Option<Run>>;
}

fn transition(run: &mut Run, next: RunStatus) -> Result<(), ResearchError> {
    if !run.status.can_transition_to(next) {
        return Err(ResearchError::InvalidTransition {
            from: run.status,
            to: next,
        });
    }
    run.status = next;
    run.updated_at = Utc::now();
    Ok(())
}

fn apply_output(run: &mut Run, output: RunOutput) -> Result<(), ResearchError> {
    transition(run, output.status())?;
    run.output = Some(output);
    Ok(())
}

fn apply_logs(run: &mut Run, entries: &[LogEntry]) {
    run.logs.extend_from_slice(entries);
    run.updated_at = Utc::now();
}

fn newest<'a>(runs: impl Iterator<Item = &'a Run>, session_id: &str) -> Option<&'a Run> {
    runs.filter(|run| run.session_id == session_id)
        .max_by_key(|run| run.created_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::request::Depth;
    use crate::types::run::RunFailure;

    #[test]
    fn test_apply_output_requires_processing_for_completion() {
        let mut run = Run::new("s1", ResearchRequest::new("q", Depth::Deep));
        let failure = RunOutput::Failed(RunFailure::new("boom"));

        // pending 可以直接失败
        apply_output(&mut run, failure.clone()).unwrap();
        assert_eq!(run.status, RunStatus::Failed);

        // 终态之后不能再写
        let err = apply_output(&mut run, failure).unwrap_err();
        assert!(matches!(err, ResearchError::InvalidTransition { .. }));
    }
}
