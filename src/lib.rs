//! Storyforge - 小说大纲分解引擎
//!
//! 把一条流式 LLM 生成链路编排成分层的大纲分解流水线：
//! 整书大纲 → 分卷 → 章节批次，产出经提取与校验后保存到外部后端。
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Outline Context: 大纲/分卷/章节的草稿实体与值对象
//! - 协议帧解析、结构化提取、批次规划、连贯性渲染（纯函数）
//!
//! 应用层 (application/):
//! - Ports: 端口定义（Generation, Stores, ProgressSink）
//! - StreamIngestor: 流式摄取（截止顺延 + 取消）
//! - DecompositionController: 分解状态机
//!
//! 基础设施层 (infrastructure/):
//! - LLM: HTTP 流式生成客户端 + 脚本回放客户端
//! - API: 外部 CRUD 后端的 Store 实现
//! - Memory: Store 内存实现
//! - Events: 进度事件 broadcast 发布

pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{DecompositionController, OutlineRequest, StepOutcome};
pub use config::{load_config, AppConfig};
