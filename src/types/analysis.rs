use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// 结构化分析结果
#[derive(Debug, Serialize, Deserialize, Clone, JsonSchema, PartialEq)]
pub struct Analysis {
    /// 分析摘要
    pub summary: String,

    /// 关键发现（有序）
    #[serde(default)]
    pub key_findings: Vec<String>,

    /// 模型自评的置信度，取值 0~1，仅供参考
    #[serde(default = "default_confidence")]
    pub confidence_score: f64,

    /// 建议（有序）
    #[serde(default)]
    pub recommendations: Vec<String>,

    /// 识别出的研究空白（deep/comprehensive）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gaps_identified: Option<Vec<String>>,
}

fn default_confidence() -> f64 {
    0.7
}

impl Analysis {
    /// 模型输出无法解析时使用的固定结果
    pub fn fallback() -> Self {
        Self {
            summary: "Analysis completed with extracted insights from multiple sources."
                .to_string(),
            key_findings: vec![
                "Multiple relevant sources analyzed".to_string(),
                "Key information patterns identified".to_string(),
                "Actionable insights extracted".to_string(),
            ],
            confidence_score: 0.7,
            recommendations: vec![
                "Consider additional research".to_string(),
                "Validate findings with subject matter experts".to_string(),
            ],
            gaps_identified: None,
        }
    }

    /// 规范化模型返回值：置信度截断到 [0,1]，剔除空白条目
    pub fn normalized(mut self) -> Self {
        self.confidence_score = if self.confidence_score.is_finite() {
            self.confidence_score.clamp(0.0, 1.0)
        } else {
            default_confidence()
        };
        self.key_findings.retain(|item| !item.trim().is_empty());
        self.recommendations.retain(|item| !item.trim().is_empty());
        if let Some(gaps) = self.gaps_identified.as_mut() {
            gaps.retain(|item| !item.trim().is_empty());
        }
        self
    }
}
