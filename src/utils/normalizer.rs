//! 内容规范化 - 清洗抓取到的原始文本并生成抽取式摘要

use regex::Regex;
use std::sync::LazyLock;

const ELLIPSIS: &str = "...";

static BLOCK_TAGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<noscript\b[^>]*>.*?</noscript\s*>|<!--.*?-->")
        .expect("block tag pattern")
});

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("markup tag pattern"));

static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(we use cookies[^.!?]*[.!?]?|this (web)?site uses cookies[^.!?]*[.!?]?|accept (all )?cookies|cookie (policy|settings|preferences)|(please )?enable javascript[^.!?]*[.!?]?|you need to enable javascript to run this app\.?|javascript is (required|disabled)[^.!?]*[.!?]?|skip to (main )?content)",
    )
    .expect("boilerplate pattern")
});

static SCRIPT_FRAGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)function\s*\w*\s*\([^)]*\)\s*\{[^{}]*\}|(?:window|document)\.[\w.]+\s*(?:=[^;]*;|\([^)]*\)\s*;?)|\b(?:var|let|const)\s+\w+\s*=[^;]*;",
    )
    .expect("script fragment pattern")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// 清洗原始文本：去除 script/style 块、标签、常见样板文案与嵌入的脚本片段，并压缩空白
pub fn sanitize(raw: &str) -> String {
    let text = BLOCK_TAGS.replace_all(raw, " ");
    let text = MARKUP_TAG.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = SCRIPT_FRAGMENT.replace_all(&text, " ");
    let text = BOILERPLATE.replace_all(&text, " ");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// 生成不超过 max_len 个字符的抽取式摘要（省略号追加在末尾）
///
/// 按整句累积，只有在一句都放不下时才按字符硬截断。
pub fn summarize(text: &str, max_len: usize) -> String {
    let text = sanitize(text);
    if text.chars().count() <= max_len {
        return text;
    }

    let mut summary = String::new();
    let mut summary_len = 0;
    for sentence in split_sentences(&text) {
        let sentence_len = sentence.chars().count();
        let added = if summary.is_empty() {
            sentence_len
        } else {
            sentence_len + 1
        };
        if summary_len + added > max_len {
            break;
        }
        if !summary.is_empty() {
            summary.push(' ');
        }
        summary.push_str(sentence);
        summary_len += added;
    }

    if summary.is_empty() {
        let truncated = truncate_chars(&text, max_len);
        return format!("{}{}", truncated.trim_end(), ELLIPSIS);
    }

    let trimmed = summary.trim_end_matches(|c: char| {
        c.is_whitespace() || matches!(c, '.' | ',' | ';' | ':' | '!' | '?')
    });
    format!("{}{}", trimmed, ELLIPSIS)
}

/// 按句末标点（后接空白）切分句子
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?')
            && let Some(&(next_idx, next)) = chars.peek()
            && next.is_whitespace()
        {
            let sentence = text[start..next_idx].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = idx + c.len_utf8();
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// 按字符数截断，保证不会切在 UTF-8 字符中间
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
