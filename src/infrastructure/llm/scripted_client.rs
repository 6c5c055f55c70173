//! Scripted Generation Client - 用于测试的生成客户端
//!
//! 按预先编排的脚本回放原始传输块，不实际调用生成服务。
//! 每次 `open_stream` 消费一个脚本，顺序与编排一致。

use async_trait::async_trait;
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::application::ports::{
    GenerationError, GenerationPort, GenerationRequest, TextChunkStream,
};

/// 一次 open_stream 的回放脚本
#[derive(Debug, Clone)]
struct Script {
    /// 依次产出的原始传输块（含协议帧文本）
    chunks: Vec<String>,
    /// 块放完后注入的传输错误（None 表示正常结束）
    trailing_error: Option<String>,
    /// 块放完后挂起不结束（模拟迟迟不给产出的服务）
    stall: bool,
}

/// Scripted Generation Client
///
/// 用于测试，按脚本回放传输块
#[derive(Debug, Default)]
pub struct ScriptedGenerationClient {
    scripts: Mutex<VecDeque<Script>>,
    calls: AtomicU32,
}

impl ScriptedGenerationClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 编排一次完整的生成：content 被封装为单行帧并以哨兵收尾
    pub fn push_content(&self, content: &str) {
        let payload = serde_json::json!({ "content": content });
        self.push_chunks(vec![format!("data: {}\ndata: [DONE]\n", payload)]);
    }

    /// 编排一次任意原始块序列的生成（用于模拟网络切块）
    pub fn push_chunks(&self, chunks: Vec<String>) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push_back(Script {
                chunks,
                trailing_error: None,
                stall: false,
            });
        }
    }

    /// 编排一次在若干块之后传输中断的生成
    pub fn push_transport_failure(&self, chunks: Vec<String>, message: &str) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push_back(Script {
                chunks,
                trailing_error: Some(message.to_string()),
                stall: false,
            });
        }
    }

    /// 编排一次在若干块之后挂起不结束的生成（演练取消/超时）
    pub fn push_stalled(&self, chunks: Vec<String>) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.push_back(Script {
                chunks,
                trailing_error: None,
                stall: true,
            });
        }
    }

    /// 已发起的 open_stream 次数（断言重试行为用）
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationPort for ScriptedGenerationClient {
    async fn open_stream(
        &self,
        _request: GenerationRequest,
    ) -> Result<TextChunkStream, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let script = self
            .scripts
            .lock()
            .ok()
            .and_then(|mut scripts| scripts.pop_front())
            .ok_or_else(|| GenerationError::Network("script exhausted".to_string()))?;

        let mut items: Vec<Result<String, GenerationError>> =
            script.chunks.into_iter().map(Ok).collect();
        if let Some(message) = script.trailing_error {
            items.push(Err(GenerationError::Network(message)));
        }

        let replay = futures_util::stream::iter(items);
        if script.stall {
            Ok(replay.chain(futures_util::stream::pending()).boxed())
        } else {
            Ok(replay.boxed())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn request() -> GenerationRequest {
        GenerationRequest {
            messages: vec![],
            max_tokens: 1024,
        }
    }

    #[tokio::test]
    async fn test_scripts_replay_in_order() {
        let client = ScriptedGenerationClient::new();
        client.push_chunks(vec!["first".to_string()]);
        client.push_chunks(vec!["second".to_string()]);

        let mut stream = client.open_stream(request()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "first");

        let mut stream = client.open_stream(request()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "second");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_script_fails_connect() {
        let client = ScriptedGenerationClient::new();
        assert!(client.open_stream(request()).await.is_err());
    }

    #[tokio::test]
    async fn test_trailing_error_surfaces_as_stream_element() {
        let client = ScriptedGenerationClient::new();
        client.push_transport_failure(vec!["data: ".to_string()], "connection reset");

        let mut stream = client.open_stream(request()).await.unwrap();
        assert!(stream.next().await.unwrap().is_ok());
        assert!(stream.next().await.unwrap().is_err());
        assert!(stream.next().await.is_none());
    }
}
