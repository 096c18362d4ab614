use anyhow::Result;
use chrono::Utc;
use std::time::Instant;
use tracing::info;

use crate::error::ResearchError;
use crate::pipeline::analyzer::Analyzer;
use crate::pipeline::refine::RefinementEngine;
use crate::pipeline::report::ReportGenerator;
use crate::pipeline::{DepthProfile, ReportStyle, ResearchContext, RunLog};
use crate::types::request::ResearchRequest;
use crate::types::run::{
    LogEntry, Refinement, ResearchOutput, Run, RunFailure, RunMetadata, RunOutput, RunStatus,
};
use crate::utils::token_estimator::TokenEstimator;

/// 运行编排：pending → processing → {completed | failed}
pub struct ResearchOrchestrator {
    ctx: ResearchContext,
}

impl ResearchOrchestrator {
    pub fn new(ctx: ResearchContext) -> Self {
        Self { ctx }
    }

    /// 执行一次研究。流水线失败会持久化为 failed 并返回该运行，只有存储错误才返回 Err。
    pub async fn execute(&self, session_id: &str, request: ResearchRequest) -> Result<Run> {
        let store = &self.ctx.store;
        let run_id = store.create(session_id, request.clone()).await?;
        let mut log = RunLog::new(run_id.clone());
        info!("🚀 开始研究任务 {} (depth = {})", run_id, request.depth);

        store.update_status(&run_id, RunStatus::Processing).await?;

        let output = match self.run_pipeline(&request, &mut log).await {
            Ok(output) => RunOutput::Completed(Box::new(output)),
            Err(e) => {
                log.error(format!("Research workflow failed: {}", e));
                RunOutput::Failed(RunFailure::new(e.to_string()))
            }
        };
        self.finish(&run_id, output, &log).await
    }

    async fn run_pipeline(
        &self,
        request: &ResearchRequest,
        log: &mut RunLog,
    ) -> Result<ResearchOutput> {
        let started = Instant::now();
        log.info(format!("Research initiated for query: \"{}\"", request.query));

        let profile = DepthProfile::resolve(request.depth);
        let collection = self
            .ctx
            .collector
            .collect(&self.ctx, &request.query, &profile, &request.sources, log)
            .await;

        let analysis = Analyzer::new(self.ctx.llm.clone(), self.ctx.config.analysis.clone())
            .analyze(&collection.sources, &profile, log)
            .await?;

        let style = ReportStyle::resolve(&profile, request.format);
        let report = ReportGenerator::new(
            self.ctx.llm.clone(),
            self.ctx.config.target_language.clone(),
        )
        .generate(&request.query, &analysis, &style, log)
        .await?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        log.info(format!("Total processing time: {}ms", elapsed_ms));

        let metadata = RunMetadata {
            sources_collected: collection.sources.len(),
            analysis_duration_ms: elapsed_ms,
            confidence_level: analysis.confidence_score,
            total_tokens_used: TokenEstimator::new().estimate_run(
                &collection.sources,
                &analysis,
                &report,
            ),
        };

        Ok(ResearchOutput {
            sources: collection.sources,
            analysis,
            report,
            metadata,
            logs: log.lines(),
            refinement: None,
        })
    }

    /// 基于已完成的运行创建新的精炼运行，原运行保持不变
    pub async fn refine(&self, run_id: &str, feedback: &str) -> Result<Run> {
        let original = self.get(run_id).await?;
        let Some(original_output) = original.research_output().cloned() else {
            return Err(ResearchError::RunNotCompleted(run_id.to_string()).into());
        };

        let store = &self.ctx.store;
        let input = original.input.for_refinement(feedback, run_id);
        let refined_id = store.create(&original.session_id, input).await?;
        let mut log = RunLog::new(refined_id.clone());
        info!("✏️ 精炼研究任务 {} -> {}", run_id, refined_id);

        store.update_status(&refined_id, RunStatus::Processing).await?;
        log.info(format!("Refining research {} based on feedback", run_id));

        let engine = RefinementEngine::new(
            self.ctx.llm.clone(),
            self.ctx.config.target_language.clone(),
        );
        let output = match engine.refine(&original_output.report, feedback).await {
            Ok(report) => {
                log.info(format!(
                    "Refined report generated with {} characters",
                    report.chars().count()
                ));
                RunOutput::Completed(Box::new(refined_output(original_output, report, feedback)))
            }
            Err(e) => {
                log.error(format!("Research refinement failed: {}", e));
                RunOutput::Failed(RunFailure::new(e.to_string()))
            }
        };
        self.finish(&refined_id, output, &log).await
    }

    /// 先写入终态输出再追加日志，并返回最终的运行记录
    async fn finish(&self, run_id: &str, output: RunOutput, log: &RunLog) -> Result<Run> {
        let store = &self.ctx.store;
        let status = output.status();
        store.update_output(run_id, output).await?;
        store.append_logs(run_id, log.entries()).await?;
        info!("🏁 研究任务 {} 结束，状态: {}", run_id, status);
        self.get(run_id).await
    }

    pub async fn get(&self, run_id: &str) -> Result<Run> {
        self.ctx
            .store
            .get(run_id)
            .await?
            .ok_or_else(|| ResearchError::RunNotFound(run_id.to_string()).into())
    }

    pub async fn logs(&self, run_id: &str) -> Result<Vec<LogEntry>> {
        Ok(self.get(run_id).await?.logs)
    }

    pub async fn latest(&self, session_id: &str) -> Result<Option<Run>> {
        self.ctx.store.latest_for_session(session_id).await
    }
}

fn refined_output(original: ResearchOutput, report: String, feedback: &str) -> ResearchOutput {
    let mut logs = original.logs.clone();
    logs.push(format!("Report refined based on feedback: \"{}\"", feedback));

    let total_tokens_used =
        TokenEstimator::new().estimate_run(&original.sources, &original.analysis, &report);

    ResearchOutput {
        metadata: RunMetadata {
            total_tokens_used,
            ..original.metadata
        },
        report,
        logs,
        refinement: Some(Refinement {
            feedback: feedback.to_string(),
            refined_at: Utc::now(),
        }),
        ..original
    }
}
