//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod api;
pub mod events;
pub mod llm;
pub mod memory;

pub use api::{HttpStoryStore, HttpStoryStoreConfig};
pub use events::ProgressPublisher;
pub use llm::{HttpGenerationClient, HttpGenerationClientConfig, ScriptedGenerationClient};
pub use memory::{InMemoryChapterStore, InMemoryOutlineStore, InMemoryVolumeStore};
