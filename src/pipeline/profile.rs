use crate::types::request::{Depth, ReportFormat};

/// 分析阶段对模型输出规模的要求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisShape {
    /// 摘要句数描述，如 "2" 或 "3-4"
    pub summary_sentences: &'static str,
    pub findings: usize,
    pub recommendations: usize,
    /// 为 0 时不请求 gaps_identified 字段
    pub gaps: usize,
}

/// 由研究深度派生的执行参数，不做持久化
#[derive(Debug, Clone, PartialEq)]
pub struct DepthProfile {
    pub depth: Depth,
    /// 使用的扩展查询数（含原始查询）
    pub max_queries: usize,
    /// 每个查询、每个数据源最多采集的结果数
    pub max_sources_per_query: usize,
    /// 排序后保留的来源总数
    pub total_sources: usize,
    /// 单个来源内容的截断长度（字符）
    pub content_slice_chars: usize,
    /// 报告目标字数范围
    pub word_range: (usize, usize),
    /// 报告必需的章节（有序）
    pub sections: &'static [&'static str],
    pub analysis: AnalysisShape,
}

const QUICK_SECTIONS: &[&str] = &["Executive Summary", "Key Findings", "Recommendations"];

const DEEP_SECTIONS: &[&str] = &[
    "Executive Summary",
    "Background",
    "Key Findings",
    "Analysis",
    "Recommendations",
    "Research Gaps",
];

const COMPREHENSIVE_SECTIONS: &[&str] = &[
    "Executive Summary",
    "Introduction",
    "Methodology",
    "Key Findings",
    "Detailed Analysis",
    "Recommendations",
    "Research Gaps",
    "Conclusion",
];

impl DepthProfile {
    pub fn resolve(depth: Depth) -> Self {
        match depth {
            Depth::Quick => Self {
                depth,
                max_queries: 2,
                max_sources_per_query: 3,
                total_sources: 3,
                content_slice_chars: 2000,
                word_range: (300, 500),
                sections: QUICK_SECTIONS,
                analysis: AnalysisShape {
                    summary_sentences: "2",
                    findings: 3,
                    recommendations: 2,
                    gaps: 0,
                },
            },
            Depth::Deep => Self {
                depth,
                max_queries: 3,
                max_sources_per_query: 4,
                total_sources: 5,
                content_slice_chars: 3000,
                word_range: (500, 1000),
                sections: DEEP_SECTIONS,
                analysis: AnalysisShape {
                    summary_sentences: "3-4",
                    findings: 4,
                    recommendations: 3,
                    gaps: 2,
                },
            },
            Depth::Comprehensive => Self {
                depth,
                max_queries: 3,
                max_sources_per_query: 5,
                total_sources: 8,
                content_slice_chars: 4000,
                word_range: (1000, 1500),
                sections: COMPREHENSIVE_SECTIONS,
                analysis: AnalysisShape {
                    summary_sentences: "4-5",
                    findings: 5,
                    recommendations: 3,
                    gaps: 3,
                },
            },
        }
    }
}

/// 报告的篇幅与结构要求
#[derive(Debug, Clone, PartialEq)]
pub struct ReportStyle {
    pub label: &'static str,
    pub word_range: (usize, usize),
    pub sections: &'static [&'static str],
    pub tone: &'static str,
}

impl ReportStyle {
    pub fn for_depth(profile: &DepthProfile) -> Self {
        let (label, tone) = match profile.depth {
            Depth::Quick => ("quick", "concise and direct"),
            Depth::Deep => ("deep", "analytical and evidence-focused"),
            Depth::Comprehensive => ("comprehensive", "thorough and formal"),
        };
        Self {
            label,
            word_range: profile.word_range,
            sections: profile.sections,
            tone,
        }
    }

    pub fn for_format(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Executive => Self {
                label: "executive",
                word_range: (300, 500),
                sections: QUICK_SECTIONS,
                tone: "executive summary style",
            },
            ReportFormat::Detailed => Self {
                label: "detailed",
                word_range: (500, 1000),
                sections: &[
                    "Executive Summary",
                    "Background",
                    "Key Findings",
                    "Analysis",
                    "Recommendations",
                    "Conclusion",
                ],
                tone: "comprehensive analysis",
            },
            ReportFormat::Academic => Self {
                label: "academic",
                word_range: (800, 1200),
                sections: &[
                    "Abstract",
                    "Introduction",
                    "Methodology",
                    "Findings",
                    "Discussion",
                    "Recommendations",
                    "Conclusion",
                ],
                tone: "academic paper style",
            },
        }
    }

    /// 显式格式优先，否则按深度决定
    pub fn resolve(profile: &DepthProfile, format: Option<ReportFormat>) -> Self {
        match format {
            Some(format) => Self::for_format(format),
            None => Self::for_depth(profile),
        }
    }
}
