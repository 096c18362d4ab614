//! 学术元数据检索：arXiv、Crossref、PubMed、Semantic Scholar、Wikipedia

mod arxiv;
mod crossref;
mod pubmed;
mod semantic_scholar;
mod wikipedia;

pub use arxiv::ArxivProvider;
pub use crossref::CrossrefProvider;
pub use pubmed::PubmedProvider;
pub use semantic_scholar::SemanticScholarProvider;
pub use wikipedia::WikipediaProvider;

use std::sync::LazyLock;

use regex::Regex;

static MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// 去掉摘要中的内嵌标记（如 JATS 标签）并压缩空白
pub(crate) fn strip_markup(text: &str) -> String {
    let without_tags = MARKUP.replace_all(text, " ");
    SPACES.replace_all(&without_tags, " ").trim().to_string()
}

pub(crate) fn doi_url(doi: &str) -> String {
    format!("https://doi.org/{}", doi.trim())
}
