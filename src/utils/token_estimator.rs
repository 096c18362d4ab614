use crate::types::{analysis::Analysis, source::Source};

/// Token估算器，仅用于观测，不作为计费依据
pub struct TokenEstimator {
    rules: TokenCalculationRules,
}

/// Token计算规则
#[derive(Debug, Clone)]
pub struct TokenCalculationRules {
    /// 平均每个token对应的字符数
    pub chars_per_token: usize,
}

impl Default for TokenCalculationRules {
    fn default() -> Self {
        Self {
            // 基于GPT系列模型的经验值
            chars_per_token: 4,
        }
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenEstimator {
    pub fn new() -> Self {
        Self {
            rules: TokenCalculationRules::default(),
        }
    }

    /// 估算文本的token数量（向上取整）
    pub fn estimate_text(&self, text: &str) -> usize {
        self.tokens_for_chars(text.chars().count())
    }

    /// 估算一次运行的token用量：来源内容 + 分析结果序列化长度 + 报告长度
    pub fn estimate_run(&self, sources: &[Source], analysis: &Analysis, report: &str) -> usize {
        let source_chars: usize = sources.iter().map(|s| s.content.chars().count()).sum();
        let analysis_chars = serde_json::to_string(analysis)
            .map(|json| json.chars().count())
            .unwrap_or_default();
        let report_chars = report.chars().count();

        self.tokens_for_chars(source_chars + analysis_chars + report_chars)
    }

    fn tokens_for_chars(&self, chars: usize) -> usize {
        chars.div_ceil(self.rules.chars_per_token.max(1))
    }
}
