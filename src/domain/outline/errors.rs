//! Outline Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("无效的标题: {0}")]
    InvalidTitle(String),

    #[error("生成记录缺少必需字段: {0}")]
    MissingField(&'static str),

    #[error("生成记录字段类型错误: {0}")]
    InvalidField(&'static str),

    #[error("章节数无效: {0}")]
    InvalidChapterCount(u32),
}
