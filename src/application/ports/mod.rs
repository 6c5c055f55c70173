//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod generation;
mod progress;
mod stores;

pub use generation::{
    ChatMessage, GenerationError, GenerationPort, GenerationRequest, TextChunkStream,
};
pub use progress::{NoopProgressSink, PipelineState, ProgressEvent, ProgressSink};
pub use stores::{
    ChapterRecord, ChapterStorePort, OutlineRecord, OutlineStorePort, StoreError, VolumeRecord,
    VolumeStorePort,
};
