use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::ResearchError;
use crate::store::{RunStore, apply_logs, apply_output, newest, transition};
use crate::types::request::ResearchRequest;
use crate::types::run::{LogEntry, Run, RunOutput, RunStatus};

/// 进程内的运行记录存储
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    runs: RwLock<HashMap<String, Run>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }

    async fn modify<F>(&self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Run) -> Result<(), ResearchError> + Send,
    {
        let mut runs = self.runs.write().await;
        let run = runs
            .get_mut(id)
            .ok_or_else(|| ResearchError::RunNotFound(id.to_string()))?;
        f(run)?;
        Ok(())
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn create(&self, session_id: &str, input: ResearchRequest) -> Result<String> {
        let run = Run::new(session_id, input);
        let id = run.id.clone();
        self.runs.write().await.insert(id.clone(), run);
        Ok(id)
    }

    async fn update_status(&self, id: &str, status: RunStatus) -> Result<()> {
        self.modify(id, |run| transition(run, status)).await
    }

    async fn update_output(&self, id: &str, output: RunOutput) -> Result<()> {
        self.modify(id, |run| apply_output(run, output)).await
    }

    async fn append_logs(&self, id: &str, entries: &[LogEntry]) -> Result<()> {
        self.modify(id, |run| {
            apply_logs(run, entries);
            Ok(())
        })
        .await
    }

    async fn get(&self, id: &str) -> Result<Option<Run>> {
        Ok(self.runs.read().await.get(id).cloned())
    }

    async fn latest_for_session(&self, session_id: &str) -> Result<Option<Run>> {
        let runs = self.runs.read().await;
        Ok(newest(runs.values(), session_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::request::Depth;
    use crate::types::run::{LogLevel, RunFailure};
    use chrono::Utc;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryRunStore::new();
        let id = store
            .create("session-1", ResearchRequest::new("heat pumps", Depth::Deep))
            .await
            .unwrap();

        let run = store.get(&id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Pending);
        assert_eq!(run.input.query, "heat pumps");
        assert!(store.get("missing").await.unwrap().is_none());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_status_transitions_are_validated() {
        let store = MemoryRunStore::new();
        let id = store.create("s", ResearchRequest::new("q", Depth::Deep)).await.unwrap();

        let err = store
            .update_status(&id, RunStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResearchError>(),
            Some(ResearchError::InvalidTransition { .. })
        ));

        store.update_status(&id, RunStatus::Processing).await.unwrap();
        store
            .update_output(&id, RunOutput::Failed(RunFailure::new("boom")))
            .await
            .unwrap();

        let run = store.get(&id).await.unwrap().unwrap();
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.failure().unwrap().error, "boom");
    }

    #[tokio::test]
    async fn test_update_unknown_run() {
        let store = MemoryRunStore::new();
        let err = store
            .update_status("nope", RunStatus::Processing)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResearchError>(),
            Some(ResearchError::RunNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_append_logs_and_latest_for_session() {
        let store = MemoryRunStore::new();
        let first = store.create("s", ResearchRequest::new("one", Depth::Deep)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.create("s", ResearchRequest::new("two", Depth::Deep)).await.unwrap();
        store.create("other", ResearchRequest::new("three", Depth::Deep)).await.unwrap();

        store
            .append_logs(
                &first,
                &[LogEntry {
                    at: Utc::now(),
                    level: LogLevel::Info,
                    message: "hello".to_string(),
                }],
            )
            .await
            .unwrap();

        assert_eq!(store.get(&first).await.unwrap().unwrap().logs.len(), 1);
        let latest = store.latest_for_session("s").await.unwrap().unwrap();
        assert_eq!(latest.id, second);
        assert!(store.latest_for_session("nobody").await.unwrap().is_none());
    }
}
