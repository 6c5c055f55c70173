//! Generation Port - 出站端口
//!
//! 把生成端点抽象为不透明的流式文本服务：一次调用产出一个
//! 惰性、有限、不可重启的文本块序列，以哨兵或错误终止。
//! 具体实现在 infrastructure/llm 层。

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Serialize;
use thiserror::Error;

/// 生成服务错误
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Cannot connect to generation service: {0}")]
    Network(String),

    #[error("Generation service returned HTTP {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Generation request timed out")]
    Timeout,
}

/// 对话消息
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// 一次流式生成请求
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

/// 已解码文本块的流
///
/// 块边界由网络决定，与协议行边界无关；帧解析在上层完成。
pub type TextChunkStream = BoxStream<'static, Result<String, GenerationError>>;

/// Generation Port
#[async_trait]
pub trait GenerationPort: Send + Sync {
    /// 打开一次流式生成调用
    ///
    /// 返回 Err 表示连接阶段失败（网络不通、非 2xx 状态）；
    /// 连接成功后的传输错误通过流元素返回。
    async fn open_stream(
        &self,
        request: GenerationRequest,
    ) -> Result<TextChunkStream, GenerationError>;
}
