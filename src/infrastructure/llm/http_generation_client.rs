//! HTTP Generation Client - 调用外部流式生成服务
//!
//! 实现 GenerationPort trait，通过 HTTP 调用外部 LLM 网关
//!
//! 外部生成 API:
//! POST {base_url}/api/ai/generate
//! Request: {"messages": [...], "max_tokens": ..., "stream": true}  (JSON)
//! Response: text/event-stream，`data: ` 行承载 `{"content": "..."}`，
//! `data: [DONE]` 表示结束

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::application::ports::{
    ChatMessage, GenerationError, GenerationPort, GenerationRequest, TextChunkStream,
};

/// 生成请求体 (JSON)
#[derive(Debug, Serialize)]
struct GenerationHttpRequest<'a> {
    messages: &'a [ChatMessage],
    max_tokens: u32,
    stream: bool,
}

/// HTTP 生成客户端配置
#[derive(Debug, Clone)]
pub struct HttpGenerationClientConfig {
    /// 生成服务基础 URL
    pub base_url: String,
    /// 建连超时时间（秒）
    ///
    /// 只约束建连与响应头，不约束流本体：流的截止时长由摄取层
    /// 管理并随产出顺延。
    pub connect_timeout_secs: u64,
}

impl Default for HttpGenerationClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout_secs: 30,
        }
    }
}

impl HttpGenerationClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }
}

/// HTTP 生成客户端
///
/// 通过 HTTP 调用外部流式生成服务
pub struct HttpGenerationClient {
    client: Client,
    config: HttpGenerationClientConfig,
}

impl HttpGenerationClient {
    /// 创建新的 HTTP 生成客户端
    pub fn new(config: HttpGenerationClientConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// 使用默认配置创建客户端
    pub fn with_default_config() -> Result<Self, GenerationError> {
        Self::new(HttpGenerationClientConfig::default())
    }

    /// 获取生成 URL
    fn generate_url(&self) -> String {
        format!("{}/api/ai/generate", self.config.base_url)
    }
}

#[async_trait]
impl GenerationPort for HttpGenerationClient {
    async fn open_stream(
        &self,
        request: GenerationRequest,
    ) -> Result<TextChunkStream, GenerationError> {
        let http_request = GenerationHttpRequest {
            messages: &request.messages,
            max_tokens: request.max_tokens,
            stream: true,
        };

        tracing::debug!(
            url = %self.generate_url(),
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "Opening generation stream"
        );

        let response = self
            .client
            .post(self.generate_url())
            .json(&http_request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::Service {
                status: status.as_u16(),
                message,
            });
        }

        // 字节块可能落在多字节 UTF-8 序列中间；不完整的尾部字节
        // 留到下一块再解码，保证逐块产出的都是完整字符。
        let chunks = response
            .bytes_stream()
            .scan(Vec::<u8>::new(), |pending, item| {
                let out = match item {
                    Ok(bytes) => {
                        pending.extend_from_slice(&bytes);
                        Ok(drain_valid_utf8(pending))
                    }
                    Err(e) => Err(map_transport_error(e)),
                };
                futures_util::future::ready(Some(out))
            })
            .filter(|item| {
                futures_util::future::ready(!matches!(item, Ok(text) if text.is_empty()))
            })
            .boxed();

        Ok(chunks)
    }
}

/// 取出缓冲中可解码的 UTF-8 前缀，尾部不完整序列留在缓冲里
fn drain_valid_utf8(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let out = text.to_string();
            pending.clear();
            out
        }
        Err(e) => {
            let valid = e.valid_up_to();
            let out = String::from_utf8_lossy(&pending[..valid]).into_owned();
            pending.drain(..valid);
            out
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else if e.is_connect() {
        GenerationError::Network(format!("Cannot connect to generation service: {}", e))
    } else {
        GenerationError::Network(e.to_string())
    }
}
