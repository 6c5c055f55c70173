//! 应用层错误定义
//!
//! 分解流水线的统一错误分类。每一类对调用方有可区分的语义：
//! 传输失败可重发请求，提取失败可重试解析，保存失败可只重试保存。

use thiserror::Error;

use crate::application::ports::{GenerationError, StoreError};
use crate::domain::outline::OutlineError;
use crate::domain::ExtractError;

/// 分解流水线错误
#[derive(Debug, Error)]
pub enum DecomposeError {
    /// 网络失败、非 2xx 响应、或 `[DONE]` 前中断（含超时）
    #[error("Could not reach generation service: {0}")]
    StreamTransport(String),

    /// 生成输出中找不到/解析不了结构化记录
    #[error("Generation service returned malformed output: {0}")]
    Extraction(#[from] ExtractError),

    /// 提取出的元素缺少必需字段，所在整批被拒绝
    #[error("Generated record failed validation: {0}")]
    Validation(String),

    /// 外部 CRUD API 拒绝保存
    #[error("Could not save result: {0}")]
    Persistence(String),

    /// 调用方主动取消
    #[error("Generation session cancelled")]
    Cancelled,

    /// 状态机位置不允许该操作（如并发开启第二个会话）
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl DecomposeError {
    /// 该错误是否允许同一批次的一次自动重试
    pub fn is_batch_retryable(&self) -> bool {
        matches!(
            self,
            DecomposeError::Extraction(_) | DecomposeError::Validation(_)
        )
    }
}

impl From<GenerationError> for DecomposeError {
    fn from(err: GenerationError) -> Self {
        Self::StreamTransport(err.to_string())
    }
}

impl From<StoreError> for DecomposeError {
    fn from(err: StoreError) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<OutlineError> for DecomposeError {
    fn from(err: OutlineError) -> Self {
        Self::Validation(err.to_string())
    }
}
