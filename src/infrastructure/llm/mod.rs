//! 生成服务适配器
//!
//! GenerationPort 的两个实现：HTTP 流式客户端（生产）与脚本回放客户端（测试）

mod http_generation_client;
mod scripted_client;

pub use http_generation_client::{HttpGenerationClient, HttpGenerationClientConfig};
pub use scripted_client::ScriptedGenerationClient;
