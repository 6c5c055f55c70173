//! Domain Layer - 领域层
//!
//! 包含:
//! - Outline Context: 大纲/分卷/章节限界上下文
//! - 共享的纯文本处理模块: 协议帧解析、结构化提取、连贯性渲染、批次规划

pub mod outline;

mod batch_plan;
mod continuity;
mod extract;
mod stream_frame;

pub use batch_plan::{BatchPlanner, BatchRange, DEFAULT_BATCH_SIZE};
pub use continuity::{continuity_block, ContinuityEntry};
pub use extract::{extract_array, ExtractError};
pub use stream_frame::{FrameBatch, FrameParser, DATA_PREFIX, DONE_SENTINEL};
