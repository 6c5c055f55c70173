//! Progress Port - 进度观察端口
//!
//! 流式增量与状态机迁移通过显式的观察者接口对外暴露，
//! 由宿主应用的共享状态持有，不依赖进程级全局事件总线。
//! broadcast 实现在 infrastructure/events 层。

use serde::{Deserialize, Serialize};

/// 分解流水线状态机位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    GeneratingOutline,
    OutlineReady,
    DecomposingVolumes,
    VolumesReady,
    DecomposingChapters { batch: u32, total_batches: u32 },
    ChaptersReady,
    Failed,
    Cancelled,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::GeneratingOutline => "generating_outline",
            PipelineState::OutlineReady => "outline_ready",
            PipelineState::DecomposingVolumes => "decomposing_volumes",
            PipelineState::VolumesReady => "volumes_ready",
            PipelineState::DecomposingChapters { .. } => "decomposing_chapters",
            PipelineState::ChaptersReady => "chapters_ready",
            PipelineState::Failed => "failed",
            PipelineState::Cancelled => "cancelled",
        }
    }

    /// 是否处于在途（可取消/可失败）状态
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            PipelineState::GeneratingOutline
                | PipelineState::DecomposingVolumes
                | PipelineState::DecomposingChapters { .. }
        )
    }
}

/// 进度事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ProgressEvent {
    /// 状态机迁移
    StateChanged {
        session_id: String,
        state: PipelineState,
    },
    /// 流式增量：text 是到目前为止的完整缓冲快照，不是差量
    StreamDelta { session_id: String, text: String },
    /// 一批章节通过提取+校验
    BatchAccepted {
        session_id: String,
        start: u32,
        end: u32,
    },
    /// 单条记录持久化成功
    RecordPersisted {
        session_id: String,
        kind: String,
        order_index: u32,
    },
    /// 单条记录持久化失败（步骤继续，结果降级）
    RecordPersistFailed {
        session_id: String,
        kind: String,
        order_index: u32,
        error: String,
    },
    /// 步骤失败
    StepFailed { session_id: String, message: String },
    /// 会话被取消
    SessionCancelled { session_id: String },
}

impl ProgressEvent {
    /// 事件所属会话
    pub fn session_id(&self) -> &str {
        match self {
            ProgressEvent::StateChanged { session_id, .. }
            | ProgressEvent::StreamDelta { session_id, .. }
            | ProgressEvent::BatchAccepted { session_id, .. }
            | ProgressEvent::RecordPersisted { session_id, .. }
            | ProgressEvent::RecordPersistFailed { session_id, .. }
            | ProgressEvent::StepFailed { session_id, .. }
            | ProgressEvent::SessionCancelled { session_id } => session_id,
        }
    }
}

/// Progress Sink Port
pub trait ProgressSink: Send + Sync {
    fn publish(&self, event: ProgressEvent);
}

/// 无观察者场景的空实现
#[derive(Debug, Default)]
pub struct NoopProgressSink;

impl ProgressSink for NoopProgressSink {
    fn publish(&self, _event: ProgressEvent) {}
}
