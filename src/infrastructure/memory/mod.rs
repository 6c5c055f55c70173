//! In-Memory Implementations
//!
//! Store 端口的内存实现，供测试与离线试运行使用

mod stores;

pub use stores::{InMemoryChapterStore, InMemoryOutlineStore, InMemoryVolumeStore};
