use chrono::Utc;
use tracing::{error, info, warn};

use crate::types::run::{LogEntry, LogLevel};

/// 单次运行的有序日志，同时镜像到 tracing
#[derive(Debug, Clone)]
pub struct RunLog {
    run_id: String,
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            entries: Vec::new(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    fn push(&mut self, level: LogLevel, message: String) {
        match level {
            LogLevel::Info => info!(run_id = %self.run_id, "📝 {}", message),
            LogLevel::Warn => warn!(run_id = %self.run_id, "⚠️ {}", message),
            LogLevel::Error => error!(run_id = %self.run_id, "❌ {}", message),
        }
        self.entries.push(LogEntry {
            at: Utc::now(),
            level,
            message,
        });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// 仅含消息文本的日志行
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.message.clone()).collect()
    }

    pub fn warnings(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.level == LogLevel::Warn)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_order_and_level() {
        let mut log = RunLog::new("run-1");
        log.info("first");
        log.warn("second");
        log.error("third");

        assert_eq!(log.run_id(), "run-1");
        assert_eq!(log.lines(), vec!["first", "second", "third"]);
        assert_eq!(log.entries()[1].level, LogLevel::Warn);
        assert_eq!(log.warnings(), 1);
    }
}
