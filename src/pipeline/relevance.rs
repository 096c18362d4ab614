use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use crate::config::{ScoringConfig, ScoringStrategy};
use crate::llm::CompletionModel;
use crate::pipeline::RunLog;
use crate::types::source::NEUTRAL_RELEVANCE;
use crate::utils::normalizer::{sanitize, truncate_chars};

/// 送入评分提示词的内容长度
const SCORING_CONTENT_CHARS: usize = 500;

static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").unwrap());

/// 相关度评分器
pub struct RelevanceScorer {
    llm: Arc<dyn CompletionModel>,
    config: ScoringConfig,
}

impl RelevanceScorer {
    pub fn new(llm: Arc<dyn CompletionModel>, config: ScoringConfig) -> Self {
        Self { llm, config }
    }

    /// 返回 [0,1] 内的分数，`explicit` 为数据源自带的评分
    pub async fn score(
        &self,
        content: &str,
        query: &str,
        explicit: Option<f64>,
        log: &mut RunLog,
    ) -> f64 {
        if self.config.prefer_explicit_scores
            && let Some(score) = explicit.filter(|s| s.is_finite())
        {
            return clamp_score(score);
        }

        match self.config.strategy {
            ScoringStrategy::Heuristic => heuristic_score(content, query),
            ScoringStrategy::Model => self.model_score(content, query, log).await,
        }
    }

    async fn model_score(&self, content: &str, query: &str, log: &mut RunLog) -> f64 {
        let prompt = scoring_prompt(content, query);
        match self.llm.complete(&prompt).await {
            Ok(response) => parse_score(&response).unwrap_or_else(|| {
                log.warn(format!(
                    "Unparseable relevance score, using {}: {}",
                    NEUTRAL_RELEVANCE,
                    truncate_chars(response.trim(), 80)
                ));
                NEUTRAL_RELEVANCE
            }),
            Err(e) => {
                log.warn(format!(
                    "Relevance scoring failed, using {}: {}",
                    NEUTRAL_RELEVANCE, e
                ));
                NEUTRAL_RELEVANCE
            }
        }
    }
}

pub fn scoring_prompt(content: &str, query: &str) -> String {
    format!(
        "Rate relevance from 0.0 to 1.0:\n\nQuery: {}\nContent: {}\n\nScore:",
        query,
        truncate_chars(content, SCORING_CONTENT_CHARS)
    )
}

/// 解析模型返回的第一个数字并截断到 [0,1]
pub fn parse_score(response: &str) -> Option<f64> {
    NUMBER
        .find(response)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|score| score.is_finite())
        .map(clamp_score)
}

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, 1.0)
}

fn word_tokens(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// 查询词在正文中整词出现的比例
pub fn heuristic_score(content: &str, query: &str) -> f64 {
    let query_tokens = word_tokens(query);
    let content_tokens = word_tokens(&sanitize(content));
    if query_tokens.is_empty() || content_tokens.is_empty() {
        return 0.0;
    }

    let matched = query_tokens
        .iter()
        .filter(|token| content_tokens.contains(*token))
        .count();
    clamp_score(matched as f64 / query_tokens.len() as f64)
}
