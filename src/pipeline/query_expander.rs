use regex::Regex;
use std::sync::{Arc, LazyLock};

use crate::llm::CompletionModel;
use crate::pipeline::RunLog;

/// 扩展结果的上限（含原始查询）
pub const MAX_QUERIES: usize = 3;

/// 形如 "Query 1: ..." / "- Academic: ..." 的行
static LABELED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*•]\s*|\d+[.)]\s*)?([^:]{1,40}):\s*(.*?)\s*$").unwrap()
});

/// 查询扩展器
pub struct QueryExpander {
    llm: Arc<dyn CompletionModel>,
}

impl QueryExpander {
    pub fn new(llm: Arc<dyn CompletionModel>) -> Self {
        Self { llm }
    }

    /// 返回的第一个元素总是原始查询；模型调用失败时退化为 `[query]`
    pub async fn expand(&self, query: &str, log: &mut RunLog) -> Vec<String> {
        let prompt = expansion_prompt(query, MAX_QUERIES - 1);
        match self.llm.complete(&prompt).await {
            Ok(response) => {
                let queries = merge_variants(query, parse_variants(&response));
                if queries.len() == 1 {
                    log.warn("Query expansion produced no usable variants");
                }
                queries
            }
            Err(e) => {
                log.warn(format!("Query expansion failed, using original query: {}", e));
                vec![query.to_string()]
            }
        }
    }
}

pub fn expansion_prompt(query: &str, count: usize) -> String {
    let mut prompt = format!(
        "Generate {} diverse search queries for: \"{}\"\nMake them specific and focused. Return one per line in the form \"label: query\".\n\n",
        count, query
    );
    for i in 1..=count {
        prompt.push_str(&format!("Query {}:\n", i));
    }
    prompt
}

/// 只保留 "label: query" 形式的行
pub fn parse_variants(response: &str) -> Vec<String> {
    response
        .lines()
        .filter_map(|line| LABELED_LINE.captures(line))
        .filter_map(|caps| caps.get(2).map(|m| m.as_str()))
        .map(|text| text.trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace()))
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .collect()
}

fn merge_variants(original: &str, variants: Vec<String>) -> Vec<String> {
    let mut queries = vec![original.to_string()];
    for variant in variants {
        if queries.len() >= MAX_QUERIES {
            break;
        }
        if !queries.iter().any(|q| q.eq_ignore_ascii_case(&variant)) {
            queries.push(variant);
        }
    }
    queries
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;

    struct Scripted(Result<String, String>);

    #[async_trait]
    impl CompletionModel for Scripted {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            self.0.clone().map_err(|e| anyhow!(e))
        }
    }

    #[test]
    fn test_parse_variants_discards_unlabeled_lines() {
        let response = "Here are some queries\nQuery 1: solar panel efficiency 2024\n\nQuery 2:\n- Policy: \"renewable subsidies europe\"\nrandom line";
        assert_eq!(
            parse_variants(response),
            vec!["solar panel efficiency 2024", "renewable subsidies europe"]
        );
    }

    #[test]
    fn test_merge_keeps_original_first_and_drops_duplicates() {
        let merged = merge_variants(
            "Wind Power",
            vec![
                "wind power".to_string(),
                "offshore wind costs".to_string(),
                "offshore wind costs".to_string(),
                "turbine recycling".to_string(),
                "grid integration".to_string(),
            ],
        );
        assert_eq!(
            merged,
            vec!["Wind Power", "offshore wind costs", "turbine recycling"]
        );
    }

    #[tokio::test]
    async fn test_expand_degrades_on_model_failure() {
        let expander = QueryExpander::new(Arc::new(Scripted(Err("timeout".to_string()))));
        let mut log = RunLog::new("r");

        let queries = expander.expand("battery recycling", &mut log).await;
        assert_eq!(queries, vec!["battery recycling"]);
        assert_eq!(log.warnings(), 1);
    }

    #[tokio::test]
    async fn test_expand_with_garbage_output() {
        let expander = QueryExpander::new(Arc::new(Scripted(Ok("no colons here".to_string()))));
        let mut log = RunLog::new("r");

        let queries = expander.expand("battery recycling", &mut log).await;
        assert_eq!(queries, vec!["battery recycling"]);
    }

    #[test]
    fn test_expansion_prompt_lists_slots() {
        let prompt = expansion_prompt("heat pumps", 2);
        assert!(prompt.contains("\"heat pumps\""));
        assert!(prompt.contains("Query 1:"));
        assert!(prompt.contains("Query 2:"));
    }
}
