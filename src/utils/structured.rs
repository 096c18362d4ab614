//! 从模型的自由文本输出中尽力解析结构化对象

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("No JSON object found in response")]
    NoObject,
    #[error("Invalid JSON object: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// 文本中首个 `{` 开始的括号平衡片段（忽略字符串字面量中的括号）
pub fn first_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    balanced_end(&text[start..]).map(|len| &text[start..start + len])
}

/// 返回从首个 `{` 开始的平衡片段长度
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// 只解析首个候选片段，失败时直接报错，兜底值由调用方决定
pub fn decode_first_object<T: DeserializeOwned>(text: &str) -> Result<T, DecodeError> {
    let span = first_object_span(text).ok_or(DecodeError::NoObject)?;
    Ok(serde_json::from_str(span)?)
}
