//! 持久化 API 适配器
//!
//! 三个 Store 端口的 HTTP 实现

mod http_story_store;

pub use http_story_store::{HttpStoryStore, HttpStoryStoreConfig};
