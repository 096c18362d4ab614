use anyhow::Result;
use std::sync::Arc;

use crate::i18n::TargetLanguage;
use crate::llm::CompletionModel;
use crate::pipeline::RunLog;
use crate::pipeline::profile::ReportStyle;
use crate::types::analysis::Analysis;

/// 报告生成器，只做裁剪，不校验结构
pub struct ReportGenerator {
    llm: Arc<dyn CompletionModel>,
    language: TargetLanguage,
}

impl ReportGenerator {
    pub fn new(llm: Arc<dyn CompletionModel>, language: TargetLanguage) -> Self {
        Self { llm, language }
    }

    pub async fn generate(
        &self,
        query: &str,
        analysis: &Analysis,
        style: &ReportStyle,
        log: &mut RunLog,
    ) -> Result<String> {
        let prompt = report_prompt(query, analysis, style, &self.language);
        let report = self.llm.complete(&prompt).await?.trim().to_string();
        log.info(format!(
            "Report generated with {} characters",
            report.chars().count()
        ));
        Ok(report)
    }
}

pub fn report_prompt(
    query: &str,
    analysis: &Analysis,
    style: &ReportStyle,
    language: &TargetLanguage,
) -> String {
    let sections = style
        .sections
        .iter()
        .map(|section| format!("## {}", section))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r###"Create a {label} research report for the query: "{query}"

Analysis Summary: {summary}
Key Findings:
• {findings}
Recommendations:
• {recommendations}
Confidence Level: {confidence:.1}%

Formatting instructions:
- Start with a single "# " title line, then use exactly these "## " sections in this order:
{sections}
- Target length: {min}-{max} words.
- Tone: {tone}.
- {language}

Report:"###,
        label = style.label,
        query = query,
        summary = analysis.summary,
        findings = analysis.key_findings.join("\n• "),
        recommendations = analysis.recommendations.join("\n• "),
        confidence = analysis.confidence_score * 100.0,
        sections = sections,
        min = style.word_range.0,
        max = style.word_range.1,
        tone = style.tone,
        language = language.prompt_instruction(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::profile::DepthProfile;
    use crate::types::request::Depth;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl CompletionModel for Echo {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok("\n\n  # Report\n\nBody text  \n".to_string())
        }
    }

    #[test]
    fn test_prompt_embeds_analysis_and_style() {
        let style = ReportStyle::for_depth(&DepthProfile::resolve(Depth::Quick));
        let prompt = report_prompt(
            "renewable energy trends",
            &Analysis::fallback(),
            &style,
            &TargetLanguage::English,
        );

        assert!(prompt.starts_with("Create a quick research report for the query: \"renewable energy trends\""));
        assert!(prompt.contains("Confidence Level: 70.0%"));
        assert!(prompt.contains("• Multiple relevant sources analyzed\n• Key information patterns identified"));
        assert!(prompt.contains("## Executive Summary\n## Key Findings\n## Recommendations"));
        assert!(prompt.contains("300-500 words"));
        assert!(prompt.contains(
            "- Start with a single \"# \" title line, then use exactly these \"## \" sections in this order:"
        ));
        assert!(prompt.ends_with("Report:"));
    }

    #[test]
    fn test_prompt_includes_language_instruction() {
        let style = ReportStyle::for_depth(&DepthProfile::resolve(Depth::Deep));
        let prompt = report_prompt("q", &Analysis::fallback(), &style, &TargetLanguage::Chinese);
        assert!(prompt.contains("请使用中文撰写报告"));
    }

    #[tokio::test]
    async fn test_generate_trims_output() {
        let generator = ReportGenerator::new(Arc::new(Echo), TargetLanguage::English);
        let style = ReportStyle::for_depth(&DepthProfile::resolve(Depth::Quick));
        let mut log = RunLog::new("r");

        let report = generator
            .generate("q", &Analysis::fallback(), &style, &mut log)
            .await
            .unwrap();
        assert_eq!(report, "# Report\n\nBody text");
        assert_eq!(log.lines(), vec!["Report generated with 19 characters"]);
    }
}
