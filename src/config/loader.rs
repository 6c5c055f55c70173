//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `STORYFORGE_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `STORYFORGE_GENERATION__BASE_URL=http://llm-gateway:8000`
/// - `STORYFORGE_API__BASE_URL=http://backend:5060`
/// - `STORYFORGE_PIPELINE__BATCH_SIZE=4`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 首先设置默认值（最低优先级）
    builder = builder
        .set_default("generation.base_url", "http://localhost:8000")?
        .set_default("generation.max_tokens", 4096)?
        .set_default("generation.stream_timeout_secs", 300)?
        .set_default("generation.extend_threshold_chars", 1000)?
        .set_default("api.base_url", "http://localhost:5060")?
        .set_default("api.timeout_secs", 30)?
        .set_default("pipeline.batch_size", 8)?
        .set_default("pipeline.default_chapter_count", 6)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 添加配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        // 搜索默认配置文件
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 添加环境变量（最高优先级）
    // 前缀: STORYFORGE_
    // 层级分隔符: __ (双下划线)
    // 例如: STORYFORGE_GENERATION__BASE_URL=http://llm-gateway:8000
    builder = builder.add_source(
        Environment::with_prefix("STORYFORGE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    // 4. 构建配置
    let config = builder.build()?;

    // 5. 反序列化为 AppConfig
    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    // 6. 验证配置
    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.generation.base_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "Generation base URL cannot be empty".to_string(),
        ));
    }

    if config.generation.stream_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Stream timeout cannot be 0".to_string(),
        ));
    }

    if config.generation.extend_threshold_chars == 0 {
        return Err(ConfigError::ValidationError(
            "Extend threshold cannot be 0".to_string(),
        ));
    }

    if config.api.base_url.is_empty() {
        return Err(ConfigError::ValidationError(
            "API base URL cannot be empty".to_string(),
        ));
    }

    if config.pipeline.batch_size == 0 {
        return Err(ConfigError::ValidationError(
            "Batch size cannot be 0".to_string(),
        ));
    }

    if config.pipeline.default_chapter_count == 0 {
        return Err(ConfigError::ValidationError(
            "Default chapter count cannot be 0".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Generation URL: {}", config.generation.base_url);
    tracing::info!("Generation Max Tokens: {}", config.generation.max_tokens);
    tracing::info!(
        "Stream Timeout: {}s (extend every {} chars)",
        config.generation.stream_timeout_secs,
        config.generation.extend_threshold_chars
    );
    tracing::info!("API URL: {}", config.api.base_url);
    tracing::info!("API Timeout: {}s", config.api.timeout_secs);
    tracing::info!("Batch Size: {}", config.pipeline.batch_size);
    tracing::info!(
        "Default Chapter Count: {}",
        config.pipeline.default_chapter_count
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_passes_for_valid_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_empty_generation_url() {
        let mut config = AppConfig::default();
        config.generation.base_url = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_batch_size() {
        let mut config = AppConfig::default();
        config.pipeline.batch_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_stream_timeout() {
        let mut config = AppConfig::default();
        config.generation.stream_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }
}
