use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::warn;

use crate::error::ResearchError;
use crate::store::{RunStore, apply_logs, apply_output, newest, transition};
use crate::types::request::ResearchRequest;
use crate::types::run::{LogEntry, Run, RunOutput, RunStatus};

/// 每个运行一个JSON文件的存储
pub struct FileRunStore {
    runs_dir: PathBuf,
    // 串行化同一进程内的读改写
    write_lock: Mutex<()>,
}

impl FileRunStore {
    pub fn new(runs_dir: impl Into<PathBuf>) -> Self {
        Self {
            runs_dir: runs_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// 运行ID只允许字母、数字、`-` 和 `_`
    fn run_path(&self, id: &str) -> Option<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        valid.then(|| self.runs_dir.join(format!("{}.json", id)))
    }

    async fn read_run(path: &Path) -> Result<Option<Run>> {
        if !fs::try_exists(path).await? {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read run file: {:?}", path))?;
        let run = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse run file: {:?}", path))?;
        Ok(Some(run))
    }

    async fn write_run(&self, run: &Run) -> Result<()> {
        let path = self
            .run_path(&run.id)
            .ok_or_else(|| ResearchError::RunNotFound(run.id.clone()))?;
        fs::create_dir_all(&self.runs_dir)
            .await
            .with_context(|| format!("Failed to create runs dir: {:?}", self.runs_dir))?;

        let content = serde_json::to_string_pretty(run)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content).await?;
        fs::rename(&tmp_path, &path)
            .await
            .with_context(|| format!("Failed to write run file: {:?}", path))?;
        Ok(())
    }

    async fn modify<F>(&self, id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Run) -> Result<(), ResearchError> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut run = match self.run_path(id) {
            Some(path) => Self::read_run(&path).await?,
            None => None,
        }
        .ok_or_else(|| ResearchError::RunNotFound(id.to_string()))?;

        f(&mut run)?;
        self.write_run(&run).await
    }

    async fn all_runs(&self) -> Result<Vec<Run>> {
        if !fs::try_exists(&self.runs_dir).await? {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        let mut entries = fs::read_dir(&self.runs_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read_run(&path).await {
                Ok(Some(run)) => runs.push(run),
                Ok(None) => {}
                Err(e) => warn!("⚠️ 跳过无法读取的运行记录 {:?}: {}", path, e),
            }
        }
        Ok(runs)
    }
}

#[async_trait]
impl RunStore for FileRunStore {
    async fn create(&self, session_id: &str, input: ResearchRequest) -> Result<String> {
        let run = Run::new(session_id, input);
        let _guard = self.write_lock.lock().await;
        self.write_run(&run).await?;
        Ok(run.id)
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
        match self.run_path(id) {
            Some(path) => Self::read_run(&path).await,
            None => Ok(None),
        }
    }

    async fn latest_for_session(&self, session_id: &str) -> Result<Option<Run>> {
        let runs = self.all_runs().await?;
        Ok(newest(runs.iter(), session_id).cloned())
    }
}
