//! Bootstrap - 装配入口
//!
//! 宿主应用的初始化助手：日志初始化与生产适配器装配。
//! 库本身不绑定运行时入口，由宿主决定何时调用。

use std::sync::Arc;

use anyhow::Context;

use crate::application::DecompositionController;
use crate::config::{AppConfig, LogConfig};
use crate::infrastructure::{
    HttpGenerationClient, HttpGenerationClientConfig, HttpStoryStore, HttpStoryStoreConfig,
    ProgressPublisher,
};

/// 初始化日志（优先级：RUST_LOG 环境变量 > 配置文件级别）
pub fn init_logging(config: &LogConfig) {
    let log_filter = format!("{},storyforge={}", config.level, config.level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    if config.json {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

/// 用生产适配器装配分解控制器
///
/// 返回控制器与进度发布器；发布器由宿主持有，用于注册订阅通道。
pub fn build_controller(
    config: &AppConfig,
) -> anyhow::Result<(DecompositionController, Arc<ProgressPublisher>)> {
    let generation = HttpGenerationClient::new(
        HttpGenerationClientConfig::new(&config.generation.base_url),
    )
    .context("Failed to build generation client")?;

    let store = Arc::new(
        HttpStoryStore::new(
            HttpStoryStoreConfig::new(&config.api.base_url)
                .with_timeout(config.api.timeout_secs),
        )
        .context("Failed to build story store client")?,
    );

    let publisher = ProgressPublisher::new().arc();

    let controller = DecompositionController::new(
        config.controller(),
        Arc::new(generation),
        store.clone(),
        store.clone(),
        store,
        publisher.clone(),
    );

    Ok((controller, publisher))
}
