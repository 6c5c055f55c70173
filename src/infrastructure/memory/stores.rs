//! In-Memory Store Implementations
//!
//! 三个 Store 端口的内存实现，供测试与离线试运行使用。
//! 支持按 order_index 注入保存失败，用于演练降级路径。

use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::application::ports::{
    ChapterRecord, ChapterStorePort, OutlineRecord, OutlineStorePort, StoreError, VolumeRecord,
    VolumeStorePort,
};
use crate::domain::outline::{ChapterDraft, ChapterId, OutlineId, VolumeDraft, VolumeId};
use async_trait::async_trait;

/// 内存大纲 Store
pub struct InMemoryOutlineStore {
    records: DashMap<OutlineId, OutlineRecord>,
}

impl InMemoryOutlineStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for InMemoryOutlineStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutlineStorePort for InMemoryOutlineStore {
    async fn create(
        &self,
        project_id: Uuid,
        title: &str,
        content: &str,
    ) -> Result<OutlineRecord, StoreError> {
        let now = Utc::now();
        let record = OutlineRecord {
            id: OutlineId::new(),
            project_id,
            title: title.to_string(),
            content: content.to_string(),
            version: 1,
            created_at: now,
            updated_at: now,
        };
        self.records.insert(record.id, record.clone());
        tracing::info!(outline_id = %record.id, "Outline stored in memory");
        Ok(record)
    }

    async fn update(&self, record: &OutlineRecord) -> Result<OutlineRecord, StoreError> {
        let mut stored = self
            .records
            .get_mut(&record.id)
            .ok_or_else(|| StoreError::NotFound(record.id.to_string()))?;
        stored.title = record.title.clone();
        stored.content = record.content.clone();
        stored.version += 1;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }
}

/// 内存分卷 Store
pub struct InMemoryVolumeStore {
    records: DashMap<VolumeId, VolumeRecord>,
    rejected_orders: Mutex<HashSet<u32>>,
}

impl InMemoryVolumeStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            rejected_orders: Mutex::new(HashSet::new()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 注入：该 order_index 的保存请求一律被拒绝
    pub fn reject_order(&self, order_index: u32) {
        if let Ok(mut rejected) = self.rejected_orders.lock() {
            rejected.insert(order_index);
        }
    }

    fn is_rejected(&self, order_index: u32) -> bool {
        self.rejected_orders
            .lock()
            .map(|rejected| rejected.contains(&order_index))
            .unwrap_or(false)
    }
}

impl Default for InMemoryVolumeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VolumeStorePort for InMemoryVolumeStore {
    async fn create(
        &self,
        outline_id: OutlineId,
        draft: &VolumeDraft,
    ) -> Result<VolumeRecord, StoreError> {
        if self.is_rejected(draft.order_index) {
            return Err(StoreError::Rejected {
                status: 422,
                message: format!("volume {} rejected", draft.order_index),
            });
        }

        let record = VolumeRecord {
            id: VolumeId::new(),
            outline_id,
            draft: draft.clone(),
            created_at: Utc::now(),
        };
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_outline(
        &self,
        outline_id: OutlineId,
    ) -> Result<Vec<VolumeRecord>, StoreError> {
        let mut volumes: Vec<VolumeRecord> = self
            .records
            .iter()
            .filter(|entry| entry.outline_id == outline_id)
            .map(|entry| entry.clone())
            .collect();
        volumes.sort_by_key(|record| record.draft.order_index);
        Ok(volumes)
    }
}

/// 内存章节 Store
pub struct InMemoryChapterStore {
    records: DashMap<ChapterId, ChapterRecord>,
    rejected_orders: Mutex<HashSet<u32>>,
}

impl InMemoryChapterStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            rejected_orders: Mutex::new(HashSet::new()),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 注入：该 order_index 的保存请求一律被拒绝
    pub fn reject_order(&self, order_index: u32) {
        if let Ok(mut rejected) = self.rejected_orders.lock() {
            rejected.insert(order_index);
        }
    }

    /// 解除注入的拒绝（模拟后端恢复后的续传）
    pub fn clear_rejections(&self) {
        if let Ok(mut rejected) = self.rejected_orders.lock() {
            rejected.clear();
        }
    }

    fn is_rejected(&self, order_index: u32) -> bool {
        self.rejected_orders
            .lock()
            .map(|rejected| rejected.contains(&order_index))
            .unwrap_or(false)
    }
}

impl Default for InMemoryChapterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChapterStorePort for InMemoryChapterStore {
    async fn create(
        &self,
        volume_id: VolumeId,
        draft: &ChapterDraft,
    ) -> Result<ChapterRecord, StoreError> {
        if self.is_rejected(draft.order_index) {
            return Err(StoreError::Rejected {
                status: 422,
                message: format!("chapter {} rejected", draft.order_index),
            });
        }

        let record = ChapterRecord {
            id: ChapterId::new(),
            volume_id,
            draft: draft.clone(),
            created_at: Utc::now(),
        };
        self.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_volume(&self, volume_id: VolumeId) -> Result<Vec<ChapterRecord>, StoreError> {
        let mut chapters: Vec<ChapterRecord> = self
            .records
            .iter()
            .filter(|entry| entry.volume_id == volume_id)
            .map(|entry| entry.clone())
            .collect();
        chapters.sort_by_key(|record| record.draft.order_index);
        Ok(chapters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter_draft(order_index: u32) -> ChapterDraft {
        ChapterDraft {
            title: format!("第{order_index}章"),
            core_event: "事件".to_string(),
            emotional_goal: String::new(),
            word_count_estimate: 0,
            content: String::new(),
            order_index,
        }
    }

    #[tokio::test]
    async fn test_outline_create_and_update() {
        let store = InMemoryOutlineStore::new();
        let record = store
            .create(Uuid::new_v4(), "测试大纲", "正文")
            .await
            .unwrap();
        assert_eq!(record.version, 1);

        let mut edited = record.clone();
        edited.content = "修订正文".to_string();
        let updated = store.update(&edited).await.unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.content, "修订正文");
    }

    #[tokio::test]
    async fn test_chapters_listed_sorted_by_order() {
        let store = InMemoryChapterStore::new();
        let volume_id = VolumeId::new();
        for order_index in [3, 1, 2] {
            store
                .create(volume_id, &chapter_draft(order_index))
                .await
                .unwrap();
        }

        let chapters = store.find_by_volume(volume_id).await.unwrap();
        let orders: Vec<u32> = chapters.iter().map(|c| c.draft.order_index).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_rejected_order_fails_create() {
        let store = InMemoryChapterStore::new();
        let volume_id = VolumeId::new();
        store.reject_order(2);

        assert!(store.create(volume_id, &chapter_draft(1)).await.is_ok());
        assert!(store.create(volume_id, &chapter_draft(2)).await.is_err());

        store.clear_rejections();
        assert!(store.create(volume_id, &chapter_draft(2)).await.is_ok());
    }
}
