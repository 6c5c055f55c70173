//! HTTP Story Store - 调用项目后端的 CRUD API
//!
//! 实现 OutlineStorePort / VolumeStorePort / ChapterStorePort，
//! 把已接受记录保存到外部后端并读取持久化集合。
//!
//! 外部 API（JSON）:
//! - POST {base_url}/api/outlines
//! - PUT  {base_url}/api/outlines/{id}
//! - POST {base_url}/api/outlines/{outline_id}/volumes
//! - GET  {base_url}/api/outlines/{outline_id}/volumes
//! - POST {base_url}/api/volumes/{volume_id}/chapters
//! - GET  {base_url}/api/volumes/{volume_id}/chapters

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use crate::application::ports::{
    ChapterRecord, ChapterStorePort, OutlineRecord, OutlineStorePort, StoreError, VolumeRecord,
    VolumeStorePort,
};
use crate::domain::outline::{ChapterDraft, OutlineId, VolumeDraft, VolumeId};

/// 大纲创建请求体 (JSON)
#[derive(Debug, Serialize)]
struct CreateOutlineRequest<'a> {
    project_id: Uuid,
    title: &'a str,
    content: &'a str,
}

/// HTTP Story Store 配置
#[derive(Debug, Clone)]
pub struct HttpStoryStoreConfig {
    /// CRUD API 基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpStoryStoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5060".to_string(),
            timeout_secs: 30,
        }
    }
}

impl HttpStoryStoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP Story Store
///
/// 三个 Store 端口共用一个 HTTP 客户端
pub struct HttpStoryStore {
    client: Client,
    config: HttpStoryStoreConfig,
}

impl HttpStoryStore {
    /// 创建新的 HTTP Story Store
    pub fn new(config: HttpStoryStoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, StoreError> {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        decode_response(response).await
    }

    async fn put_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, StoreError> {
        let response = self
            .client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        decode_response(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;
        decode_response(response).await
    }
}

/// 把响应映射为记录或 Store 错误
async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, StoreError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        let message = response.text().await.unwrap_or_default();
        return Err(StoreError::NotFound(message));
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(StoreError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait]
impl OutlineStorePort for HttpStoryStore {
    async fn create(
        &self,
        project_id: Uuid,
        title: &str,
        content: &str,
    ) -> Result<OutlineRecord, StoreError> {
        let body = CreateOutlineRequest {
            project_id,
            title,
            content,
        };
        let record: OutlineRecord = self.post_json("/api/outlines", &body).await?;
        tracing::debug!(outline_id = %record.id, "Outline created via API");
        Ok(record)
    }

    async fn update(&self, record: &OutlineRecord) -> Result<OutlineRecord, StoreError> {
        self.put_json(&format!("/api/outlines/{}", record.id), record)
            .await
    }
}

#[async_trait]
impl VolumeStorePort for HttpStoryStore {
    async fn create(
        &self,
        outline_id: OutlineId,
        draft: &VolumeDraft,
    ) -> Result<VolumeRecord, StoreError> {
        let record: VolumeRecord = self
            .post_json(&format!("/api/outlines/{}/volumes", outline_id), draft)
            .await?;
        tracing::debug!(
            volume_id = %record.id,
            order_index = record.draft.order_index,
            "Volume created via API"
        );
        Ok(record)
    }

    async fn find_by_outline(
        &self,
        outline_id: OutlineId,
    ) -> Result<Vec<VolumeRecord>, StoreError> {
        self.get_json(&format!("/api/outlines/{}/volumes", outline_id))
            .await
    }
}

#[async_trait]
impl ChapterStorePort for HttpStoryStore {
    async fn create(
        &self,
        volume_id: VolumeId,
        draft: &ChapterDraft,
    ) -> Result<ChapterRecord, StoreError> {
        let record: ChapterRecord = self
            .post_json(&format!("/api/volumes/{}/chapters", volume_id), draft)
            .await?;
        tracing::debug!(
            chapter_id = %record.id,
            order_index = record.draft.order_index,
            "Chapter created via API"
        );
        Ok(record)
    }

    async fn find_by_volume(&self, volume_id: VolumeId) -> Result<Vec<ChapterRecord>, StoreError> {
        self.get_json(&format!("/api/volumes/{}/chapters", volume_id))
            .await
    }
}
