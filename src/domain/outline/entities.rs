//! Outline Context - Entities
//!
//! 模型输出归一化后的分卷/章节草稿。
//! 草稿尚未持久化（没有服务端分配的 id），持久化后的记录见
//! `application::ports::stores`。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::OutlineError;

/// 分卷草稿
///
/// 不变量:
/// - `order_index` 1 起始，在所属大纲内连续
/// - `chapter_count` >= 1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDraft {
    pub title: String,
    pub core_conflict: String,
    pub content: String,
    pub key_events: Vec<String>,
    pub character_development: String,
    pub chapter_count: u32,
    pub order_index: u32,
}

impl VolumeDraft {
    /// 从模型生成的 JSON 元素归一化
    ///
    /// - `title` 必需
    /// - `chapter_count` 缺失时回退到 `default_chapter_count`
    /// - `order_index` 缺失时回退到 1 起始的位置 `position`
    pub fn from_generated(
        value: &Value,
        position: u32,
        default_chapter_count: u32,
    ) -> Result<Self, OutlineError> {
        let title = required_str(value, "title")?;
        let chapter_count = match value.get("chapter_count") {
            None | Some(Value::Null) => default_chapter_count,
            Some(v) => u32_field(v, "chapter_count")?,
        };
        if chapter_count == 0 {
            return Err(OutlineError::InvalidChapterCount(chapter_count));
        }
        let order_index = match value.get("order_index") {
            None | Some(Value::Null) => position,
            Some(v) => u32_field(v, "order_index")?,
        };

        Ok(Self {
            title,
            core_conflict: optional_str(value, "core_conflict"),
            content: optional_str(value, "content"),
            key_events: string_list(value, "key_events"),
            character_development: optional_str(value, "character_development"),
            chapter_count,
            order_index,
        })
    }
}

/// 章节草稿（大纲阶段的章节规划，区别于编辑器里的正文章节）
///
/// 不变量:
/// - `order_index` 1 起始，在所属分卷内连续，范围 `1..=volume.chapter_count`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterDraft {
    pub title: String,
    pub core_event: String,
    pub emotional_goal: String,
    pub word_count_estimate: u32,
    pub content: String,
    pub order_index: u32,
}

impl ChapterDraft {
    /// 从模型生成的 JSON 元素归一化
    ///
    /// - `title` 与 `core_event` 必需，缺一整批拒绝（由调用方执行整批策略）
    /// - `order_index` 永远由流水线指定，不信任模型输出，
    ///   否则模型乱标序号会破坏连续性不变量
    pub fn from_generated(value: &Value, order_index: u32) -> Result<Self, OutlineError> {
        let title = required_str(value, "title")?;
        let core_event = required_str(value, "core_event")?;
        let word_count_estimate = match value.get("word_count_estimate") {
            None | Some(Value::Null) => 0,
            Some(v) => u32_field(v, "word_count_estimate")?,
        };

        Ok(Self {
            title,
            core_event,
            emotional_goal: optional_str(value, "emotional_goal"),
            word_count_estimate,
            content: optional_str(value, "content"),
            order_index,
        })
    }
}

fn required_str(value: &Value, field: &'static str) -> Result<String, OutlineError> {
    match value.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) | None | Some(Value::Null) => {
            Err(OutlineError::MissingField(field))
        }
        Some(_) => Err(OutlineError::InvalidField(field)),
    }
}

fn optional_str(value: &Value, field: &str) -> String {
    match value.get(field) {
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    }
}

fn string_list(value: &Value, field: &str) -> Vec<String> {
    match value.get(field) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn u32_field(value: &Value, field: &'static str) -> Result<u32, OutlineError> {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or(OutlineError::InvalidField(field))
}
