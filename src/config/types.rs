//! Configuration Types
//!
//! 定义所有配置结构体

use std::time::Duration;

use serde::Deserialize;

use crate::application::{ControllerConfig, IngestConfig};

/// 应用主配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 生成服务配置
    #[serde(default)]
    pub generation: GenerationConfig,

    /// 持久化 API 配置
    #[serde(default)]
    pub api: ApiConfig,

    /// 分解流水线配置
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation: GenerationConfig::default(),
            api: ApiConfig::default(),
            pipeline: PipelineConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置装配控制器参数
    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig {
            batch_size: self.pipeline.batch_size,
            default_chapter_count: self.pipeline.default_chapter_count,
            max_tokens: self.generation.max_tokens,
            ingest: self.generation.ingest(),
        }
    }
}

/// 生成服务（流式 LLM 网关）配置
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// 生成服务基础 URL
    #[serde(default = "default_generation_url")]
    pub base_url: String,

    /// 单次生成请求的 max_tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// 流式截止时长（秒），产出持续时自动顺延
    #[serde(default = "default_stream_timeout")]
    pub stream_timeout_secs: u64,

    /// 每新增多少字符顺延一次截止时间
    #[serde(default = "default_extend_threshold")]
    pub extend_threshold_chars: usize,
}

fn default_generation_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_stream_timeout() -> u64 {
    300
}

fn default_extend_threshold() -> usize {
    1000
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_generation_url(),
            max_tokens: default_max_tokens(),
            stream_timeout_secs: default_stream_timeout(),
            extend_threshold_chars: default_extend_threshold(),
        }
    }
}

impl GenerationConfig {
    /// 装配流式摄取配置
    pub fn ingest(&self) -> IngestConfig {
        IngestConfig {
            stream_timeout: Duration::from_secs(self.stream_timeout_secs),
            extend_threshold_chars: self.extend_threshold_chars,
        }
    }
}

/// 持久化 API（大纲/分卷/章节 CRUD 后端）配置
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// CRUD API 基础 URL
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:5060".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout_secs: default_api_timeout(),
        }
    }
}

/// 分解流水线配置
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// 单批最多生成的章节数
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// 模型未标注时的默认单卷章节数
    #[serde(default = "default_chapter_count")]
    pub default_chapter_count: u32,
}

fn default_batch_size() -> u32 {
    8
}

fn default_chapter_count() -> u32 {
    6
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            default_chapter_count: default_chapter_count(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
