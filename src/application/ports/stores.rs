//! Store Ports - 出站端口
//!
//! 大纲/分卷/章节的持久化走外部 CRUD API（项目后端），
//! 本引擎只消费 create/list，两者都不假设后端有事务性批量语义。
//! 具体实现在 infrastructure 层（HTTP 客户端与内存实现）。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::outline::{ChapterDraft, ChapterId, OutlineId, VolumeDraft, VolumeId};

/// Store 错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cannot reach persistence API: {0}")]
    Network(String),

    #[error("Persistence API rejected request: HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid persistence payload: {0}")]
    Serialization(String),

    #[error("Entity not found: {0}")]
    NotFound(String),
}

/// 大纲记录（持久化后，带服务端分配的 id）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineRecord {
    pub id: OutlineId,
    pub project_id: Uuid,
    pub title: String,
    /// 不透明字符串，内部编码见 `domain::outline::OutlineContent`
    pub content: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 分卷记录（持久化后）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub id: VolumeId,
    pub outline_id: OutlineId,
    #[serde(flatten)]
    pub draft: VolumeDraft,
    pub created_at: DateTime<Utc>,
}

/// 章节记录（大纲阶段，持久化后）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub id: ChapterId,
    pub volume_id: VolumeId,
    #[serde(flatten)]
    pub draft: ChapterDraft,
    pub created_at: DateTime<Utc>,
}

/// Outline Store Port
#[async_trait]
pub trait OutlineStorePort: Send + Sync {
    /// 创建大纲，返回带服务端 id 的记录
    async fn create(
        &self,
        project_id: Uuid,
        title: &str,
        content: &str,
    ) -> Result<OutlineRecord, StoreError>;

    /// 更新大纲（显式编辑路径；本流水线不会隐式删除大纲）
    async fn update(&self, record: &OutlineRecord) -> Result<OutlineRecord, StoreError>;
}

/// Volume Store Port
#[async_trait]
pub trait VolumeStorePort: Send + Sync {
    async fn create(
        &self,
        outline_id: OutlineId,
        draft: &VolumeDraft,
    ) -> Result<VolumeRecord, StoreError>;

    async fn find_by_outline(&self, outline_id: OutlineId)
        -> Result<Vec<VolumeRecord>, StoreError>;
}

/// Chapter Store Port
#[async_trait]
pub trait ChapterStorePort: Send + Sync {
    async fn create(
        &self,
        volume_id: VolumeId,
        draft: &ChapterDraft,
    ) -> Result<ChapterRecord, StoreError>;

    /// 查询分卷已持久化的章节
    ///
    /// 续传时已接受数量以此为准（唯一事实来源），不信内存计数。
    async fn find_by_volume(&self, volume_id: VolumeId) -> Result<Vec<ChapterRecord>, StoreError>;
}
