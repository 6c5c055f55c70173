//! Stream Ingestor - 流式摄取
//!
//! 同一时刻只驱动一个打开的流式请求：逐块送入帧解析器，
//! 把增量文本接到运行缓冲上，并在每次缓冲增长后用完整缓冲
//! 回调观察者（消费方总是看到到目前为止的全文）。
//!
//! 截止时间策略：默认从请求开始 5 分钟；缓冲字符数每跨过一个
//! 1000 字符阈值就把截止时间顺延为「现在 + 默认时长」——只顺延，
//! 不缩短。长文生成得以完成，静默的生成不会无限挂起。

use std::time::Duration;

use futures_util::StreamExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{GenerationError, TextChunkStream};
use crate::domain::FrameParser;

/// 默认流截止时长：5 分钟
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(300);

/// 截止时间顺延的缓冲字符数阈值
pub const EXTEND_THRESHOLD_CHARS: usize = 1000;

/// 摄取配置
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub stream_timeout: Duration,
    pub extend_threshold_chars: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            extend_threshold_chars: EXTEND_THRESHOLD_CHARS,
        }
    }
}

/// 摄取错误
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("stream transport failed: {0}")]
    Transport(#[from] GenerationError),

    #[error("stream deadline exceeded")]
    DeadlineExceeded,

    #[error("stream cancelled")]
    Cancelled,
}

/// 流式摄取器
#[derive(Debug, Clone, Default)]
pub struct StreamIngestor {
    config: IngestConfig,
}

impl StreamIngestor {
    pub fn new(config: IngestConfig) -> Self {
        Self { config }
    }

    /// 摄取一个文本块流直到哨兵、自然结束、取消或超时
    ///
    /// - 成功：返回最终完整缓冲（complete 路径）
    /// - 取消：不触发 complete，半成品只通过最后一次 update 可见
    /// - 超时/传输错误：同取消，错误上浮
    pub async fn ingest(
        &self,
        mut chunks: TextChunkStream,
        cancel: &CancellationToken,
        mut on_update: impl FnMut(&str) + Send,
    ) -> Result<String, StreamError> {
        let mut parser = FrameParser::new();
        let mut buffer = String::new();
        let mut char_count = 0usize;
        let mut extend_marks = 0usize;

        let sleep = tokio::time::sleep(self.config.stream_timeout);
        tokio::pin!(sleep);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(StreamError::Cancelled),
                _ = &mut sleep => return Err(StreamError::DeadlineExceeded),
                next = chunks.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    let batch = parser.feed(&chunk);
                    if !batch.fragments.is_empty() {
                        for fragment in &batch.fragments {
                            char_count += fragment.chars().count();
                            buffer.push_str(fragment);
                        }

                        let marks = char_count / self.config.extend_threshold_chars;
                        if marks > extend_marks {
                            extend_marks = marks;
                            sleep.as_mut().reset(
                                tokio::time::Instant::now() + self.config.stream_timeout,
                            );
                            tracing::debug!(
                                chars = char_count,
                                "Stream deadline extended"
                            );
                        }

                        on_update(&buffer);
                    }
                    if batch.done {
                        return Ok(buffer);
                    }
                }
                Some(Err(e)) => return Err(StreamError::Transport(e)),
                None => {
                    // 自然结束：冲刷最后一个未换行的行
                    let batch = parser.finish();
                    for fragment in &batch.fragments {
                        buffer.push_str(fragment);
                    }
                    if !batch.fragments.is_empty() {
                        on_update(&buffer);
                    }
                    return Ok(buffer);
                }
            }
        }
    }
}
