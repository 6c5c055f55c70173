//! Outline Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OutlineError;

/// 大纲唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutlineId(Uuid);

impl OutlineId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for OutlineId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OutlineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 分卷唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolumeId(Uuid);

impl VolumeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for VolumeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for VolumeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 章节唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChapterId(Uuid);

impl ChapterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ChapterId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChapterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 标题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title(String);

impl Title {
    pub fn new(title: impl Into<String>) -> Result<Self, OutlineError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(OutlineError::InvalidTitle("标题不能为空".to_string()));
        }
        if title.chars().count() > 200 {
            return Err(OutlineError::InvalidTitle(
                "标题长度不能超过200字符".to_string(),
            ));
        }
        Ok(Self(title))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Title {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 大纲正文
///
/// `content` 字段持久化时是不透明字符串，内部编码为 JSON 记录，
/// 至少包含一个 `content` 字段保存模型生成的原始叙事文本。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineContent {
    content: String,
}

impl OutlineContent {
    /// 从模型生成的原始文本构造
    pub fn from_raw_text(raw: impl Into<String>) -> Self {
        Self {
            content: raw.into(),
        }
    }

    /// 编码为持久化用的不透明字符串
    pub fn encode(&self) -> String {
        // OutlineContent 只含 String 字段，序列化不会失败
        serde_json::to_string(self).unwrap_or_else(|_| self.content.clone())
    }

    /// 从持久化字符串解码
    ///
    /// 兼容旧数据：无法按 JSON 解析时，整个字符串视为原始文本
    pub fn decode(stored: &str) -> Self {
        serde_json::from_str(stored).unwrap_or_else(|_| Self {
            content: stored.to_string(),
        })
    }

    pub fn raw_text(&self) -> &str {
        &self.content
    }
}
