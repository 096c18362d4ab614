use anyhow::Result;
use std::sync::Arc;

use crate::i18n::TargetLanguage;
use crate::llm::CompletionModel;

/// 根据用户反馈改写已有报告，不重新采集或分析
pub struct RefinementEngine {
    llm: Arc<dyn CompletionModel>,
    language: TargetLanguage,
}

impl RefinementEngine {
    pub fn new(llm: Arc<dyn CompletionModel>, language: TargetLanguage) -> Self {
        Self { llm, language }
    }

    pub async fn refine(&self, prior_report: &str, feedback: &str) -> Result<String> {
        let prompt = refine_prompt(prior_report, feedback, &self.language);
        Ok(self.llm.complete(&prompt).await?.trim().to_string())
    }
}

pub fn refine_prompt(prior_report: &str, feedback: &str, language: &TargetLanguage) -> String {
    format!(
        "Improve this research report based on user feedback:\n\nORIGINAL REPORT:\n{}\n\nUSER FEEDBACK:\n{}\n\n{}\nPlease provide an improved version that addresses the feedback while maintaining accuracy:",
        prior_report,
        feedback,
        language.prompt_instruction()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Shorten;

    #[async_trait]
    impl CompletionModel for Shorten {
        async fn complete(&self, prompt: &str) -> Result<String> {
            assert!(prompt.contains("USER FEEDBACK:\nmake it shorter"));
            Ok("  # Short report  ".to_string())
        }
    }

    #[test]
    fn test_refine_prompt_embeds_report_and_feedback() {
        let prompt = refine_prompt("# Long report", "cite more papers", &TargetLanguage::English);
        assert!(prompt.starts_with("Improve this research report based on user feedback:"));
        assert!(prompt.contains("ORIGINAL REPORT:\n# Long report"));
        assert!(prompt.contains("USER FEEDBACK:\ncite more papers"));
    }

    #[tokio::test]
    async fn test_refine_returns_trimmed_text() {
        let engine = RefinementEngine::new(Arc::new(Shorten), TargetLanguage::English);
        let refined = engine.refine("# Long report", "make it shorter").await.unwrap();
        assert_eq!(refined, "# Short report");
    }
}
