use anyhow::Result;
use std::sync::Arc;

use crate::config::AnalysisConfig;
use crate::error::ResearchError;
use crate::llm::CompletionModel;
use crate::pipeline::RunLog;
use crate::pipeline::profile::{AnalysisShape, DepthProfile};
use crate::types::analysis::Analysis;
use crate::types::request::Depth;
use crate::types::source::Source;
use crate::utils::normalizer::truncate_chars;
use crate::utils::structured::decode_first_object;

/// 合并上下文中来源之间的分隔符
const SOURCE_DELIMITER: &str = "\n\n---\n\n";

/// 基于来源生成结构化分析
pub struct Analyzer {
    llm: Arc<dyn CompletionModel>,
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(llm: Arc<dyn CompletionModel>, config: AnalysisConfig) -> Self {
        Self { llm, config }
    }

    /// 来源为空时返回 [`ResearchError::NoSources`]；模型输出无法解析时使用固定兜底结果
    pub async fn analyze(
        &self,
        sources: &[Source],
        profile: &DepthProfile,
        log: &mut RunLog,
    ) -> Result<Analysis> {
        if sources.is_empty() {
            return Err(ResearchError::NoSources.into());
        }

        let context = combined_context(
            sources,
            self.config.source_slice_chars,
            self.config.max_context_chars,
        );
        let prompt = analysis_prompt(&context, profile);
        let response = self.llm.complete(&prompt).await?;

        let analysis = match decode_first_object::<Analysis>(&response) {
            Ok(analysis) => analysis.normalized(),
            Err(e) => {
                log.warn(format!("Analysis JSON parse failed, using fallback: {}", e));
                Analysis::fallback()
            }
        };
        let analysis = shape_for_depth(analysis, profile.depth);

        log.info(format!(
            "Analysis completed with confidence: {}",
            analysis.confidence_score
        ));
        Ok(analysis)
    }
}

/// 每个来源一个带标签的片段，整体再截断到上限
pub fn combined_context(sources: &[Source], slice_chars: usize, max_chars: usize) -> String {
    let combined = sources
        .iter()
        .map(|s| {
            format!(
                "Source: {}\nURL: {}\nContent: {}",
                s.title,
                s.url,
                truncate_chars(&s.content, slice_chars)
            )
        })
        .collect::<Vec<_>>()
        .join(SOURCE_DELIMITER);
    truncate_chars(&combined, max_chars).to_string()
}

fn example_list(prefix: &str, count: usize) -> String {
    let items: Vec<String> = (1..=count)
        .map(|i| format!("\"{}{}\"", prefix, i))
        .collect();
    format!("[{}]", items.join(", "))
}

pub fn analysis_prompt(content: &str, profile: &DepthProfile) -> String {
    let AnalysisShape {
        summary_sentences,
        findings,
        recommendations,
        gaps,
    } = profile.analysis;

    let (label, summary_hint, finding_prefix, rec_prefix) = match profile.depth {
        Depth::Quick => ("quick", "Brief", "finding", "rec"),
        Depth::Deep => ("deep", "Comprehensive", "detailed finding", "detailed rec"),
        Depth::Comprehensive => (
            "comprehensive",
            "Thorough",
            "detailed finding",
            "strategic rec",
        ),
    };

    let mut fields = vec![
        format!(
            "  \"summary\": \"{} {}-sentence summary\"",
            summary_hint, summary_sentences
        ),
        format!(
            "  \"key_findings\": {}",
            example_list(finding_prefix, findings)
        ),
        "  \"confidence_score\": 0.8".to_string(),
        format!(
            "  \"recommendations\": {}",
            example_list(rec_prefix, recommendations)
        ),
    ];
    if gaps > 0 {
        fields.push(format!("  \"gaps_identified\": {}", example_list("gap", gaps)));
    }

    format!(
        "Provide a {} analysis in JSON format:\n{}\n\nRespond with a single JSON object and nothing else. confidence_score must be a number between 0.0 and 1.0.\nThe object must conform to this JSON Schema:\n{}\n\nJSON Response:\n{{\n{}\n}}",
        label,
        content,
        analysis_schema(),
        fields.join(",\n")
    )
}

fn analysis_schema() -> String {
    serde_json::to_string(&schemars::schema_for!(Analysis)).unwrap_or_default()
}

/// quick 深度不返回研究空白
fn shape_for_depth(mut analysis: Analysis, depth: Depth) -> Analysis {
    if depth == Depth::Quick {
        analysis.gaps_identified = None;
    }
    analysis
}
