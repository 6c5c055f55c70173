//! 应用层 - Application Layer
//!
//! 分解流水线的用例编排：流式摄取、批次规划执行、状态机控制。
//! 通过 `ports` 中的端口与外部世界（生成服务、CRUD API、进度订阅方）交互。

pub mod error;
pub mod ports;

mod controller;
mod ingest;
mod prompts;
mod session;

pub use controller::{
    ControllerConfig, DecompositionController, StepOutcome, DEFAULT_CHAPTER_COUNT,
    DEFAULT_MAX_TOKENS,
};
pub use error::DecomposeError;
pub use ingest::{IngestConfig, StreamError, StreamIngestor, DEFAULT_STREAM_TIMEOUT, EXTEND_THRESHOLD_CHARS};
pub use prompts::OutlineRequest;
pub use session::GenerationSession;
