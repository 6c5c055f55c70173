//! 结构化提取
//!
//! 模型输出是自由文本，目标 JSON 对象可能混在说明性文字、
//! markdown 代码围栏等噪声中间。这里只认第一个括号配平的 JSON 对象，
//! 串字面量内部的花括号不计入深度。
//!
//! 纯同步函数，不触碰共享状态，可安全重试。

use serde_json::Value;
use thiserror::Error;

/// 提取错误
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no JSON object located")]
    NoJsonObject,

    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("missing field {0}")]
    MissingField(String),
}

/// 从自由文本中提取第一个配平 JSON 对象里名为 `field` 的数组
///
/// 元素形状校验是调用方的责任，这里原样返回数组。
pub fn extract_array(text: &str, field: &str) -> Result<Vec<Value>, ExtractError> {
    let object_str = locate_json_object(text).ok_or(ExtractError::NoJsonObject)?;

    let value: Value = serde_json::from_str(object_str)
        .map_err(|e| ExtractError::MalformedJson(e.to_string()))?;

    match value.get(field) {
        Some(Value::Array(items)) => Ok(items.clone()),
        _ => Err(ExtractError::MissingField(field.to_string())),
    }
}

/// 定位第一个括号配平的 JSON 对象子串
///
/// 深度扫描时忽略字符串字面量内的花括号（含转义引号）。
fn locate_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }

    // 扫到结尾仍未配平
    None
}
