//! 研究流水线：采集 → 分析 → 报告，以及基于反馈的精炼

pub mod analyzer;
pub mod collector;
pub mod context;
pub mod orchestrator;
pub mod profile;
pub mod query_expander;
pub mod refine;
pub mod relevance;
pub mod report;
pub mod run_log;

pub use context::ResearchContext;
pub use orchestrator::ResearchOrchestrator;
pub use profile::{DepthProfile, ReportStyle};
pub use run_log::RunLog;
