//! Generation Session - 生成会话
//!
//! 一个分解步骤对应一个临时会话：持有累积文本、目标数量、
//! 已接受数量与取消令牌。步骤终止（成功/取消/不可恢复错误）
//! 即丢弃，不持久化。

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// 生成会话（临时，不持久化）
#[derive(Debug)]
pub struct GenerationSession {
    id: String,
    cancel: CancellationToken,
    accumulated: String,
    streaming: bool,
    target_count: u32,
    accepted_count: u32,
}

impl GenerationSession {
    pub fn new(target_count: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            cancel: CancellationToken::new(),
            accumulated: String::new(),
            streaming: false,
            target_count,
            accepted_count: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 取消令牌（供调用方在步骤外部触发取消）
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn begin_streaming(&mut self) {
        self.streaming = true;
        self.accumulated.clear();
    }

    pub fn end_streaming(&mut self) {
        self.streaming = false;
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// 记录当前累积文本（中途取消时调用方仍可取走已累积部分）
    pub fn set_accumulated(&mut self, text: &str) {
        self.accumulated.clear();
        self.accumulated.push_str(text);
    }

    pub fn accumulated(&self) -> &str {
        &self.accumulated
    }

    pub fn target_count(&self) -> u32 {
        self.target_count
    }

    pub fn accepted_count(&self) -> u32 {
        self.accepted_count
    }

    pub fn set_accepted_count(&mut self, count: u32) {
        self.accepted_count = count;
    }
}
