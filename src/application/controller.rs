//! Decomposition Controller - 分解状态机
//!
//! 编排 大纲 → 分卷 → 章节 的完整分解流程：
//! 发起生成请求，驱动 摄取/提取/批次规划/连贯性渲染，
//! 经外部 CRUD API 持久化已接受记录，并对外暴露状态机位置与进度。
//!
//! 状态机:
//! `Idle → GeneratingOutline → OutlineReady → DecomposingVolumes →
//!  VolumesReady → DecomposingChapters(batch k of n) → ChaptersReady`，
//! 任意在途状态可进入 `Failed`，任意流式状态可进入 `Cancelled`。
//!
//! 并发模型：同一控制器同一时刻至多一个生成会话（入口闸门直接拒绝
//! 第二个并发步骤），章节批次严格串行——下一批的提示词依赖上一批
//! 已接受的产出。

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::application::error::DecomposeError;
use crate::application::ingest::{IngestConfig, StreamError, StreamIngestor};
use crate::application::ports::{
    ChapterRecord, ChapterStorePort, ChatMessage, GenerationPort, GenerationRequest,
    OutlineRecord, OutlineStorePort, PipelineState, ProgressEvent, ProgressSink, VolumeRecord,
    VolumeStorePort,
};
use crate::application::prompts::{self, OutlineRequest};
use crate::application::session::GenerationSession;
use crate::domain::outline::{ChapterDraft, OutlineContent, Title, VolumeDraft};
use crate::domain::{
    continuity_block, extract_array, BatchPlanner, BatchRange, ContinuityEntry,
    DEFAULT_BATCH_SIZE,
};

/// 默认单卷章节数（模型未给出 chapter_count 时的回退值）
pub const DEFAULT_CHAPTER_COUNT: u32 = 6;

/// 默认单次生成的 max_tokens
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// 控制器配置
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// 单批最多生成的章节数
    pub batch_size: u32,
    /// 模型未标注时的默认单卷章节数
    pub default_chapter_count: u32,
    /// 单次生成请求的 max_tokens
    pub max_tokens: u32,
    /// 流式摄取配置（截止时长/顺延阈值）
    pub ingest: IngestConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            default_chapter_count: DEFAULT_CHAPTER_COUNT,
            max_tokens: DEFAULT_MAX_TOKENS,
            ingest: IngestConfig::default(),
        }
    }
}

/// 一个分解步骤的结果
///
/// `degraded` 表示有记录保存失败（生成与校验成功，但后端拒绝保存），
/// 逐条原因在 `failures` 里：调用方可以只重试保存，不必重新生成。
#[derive(Debug, Clone)]
pub struct StepOutcome<T> {
    pub records: Vec<T>,
    pub degraded: bool,
    pub failures: Vec<String>,
}

impl<T> StepOutcome<T> {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            degraded: false,
            failures: Vec::new(),
        }
    }
}

/// 分解控制器
pub struct DecompositionController {
    config: ControllerConfig,
    ingestor: StreamIngestor,
    generation: Arc<dyn GenerationPort>,
    outline_store: Arc<dyn OutlineStorePort>,
    volume_store: Arc<dyn VolumeStorePort>,
    chapter_store: Arc<dyn ChapterStorePort>,
    progress: Arc<dyn ProgressSink>,

    state: Mutex<PipelineState>,
    selected_outline: Mutex<Option<OutlineRecord>>,
    /// 在途会话的取消令牌（无在途会话时为 None）
    current_cancel: Mutex<Option<CancellationToken>>,
    /// 会话闸门：同一时刻至多一个生成会话
    gate: tokio::sync::Mutex<()>,
}

impl DecompositionController {
    pub fn new(
        config: ControllerConfig,
        generation: Arc<dyn GenerationPort>,
        outline_store: Arc<dyn OutlineStorePort>,
        volume_store: Arc<dyn VolumeStorePort>,
        chapter_store: Arc<dyn ChapterStorePort>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        let ingestor = StreamIngestor::new(config.ingest.clone());
        Self {
            config,
            ingestor,
            generation,
            outline_store,
            volume_store,
            chapter_store,
            progress,
            state: Mutex::new(PipelineState::Idle),
            selected_outline: Mutex::new(None),
            current_cancel: Mutex::new(None),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    /// 当前状态机位置
    pub fn state(&self) -> PipelineState {
        self.state
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(PipelineState::Idle)
    }

    /// 当前选中的大纲
    pub fn selected_outline(&self) -> Option<OutlineRecord> {
        self.selected_outline
            .lock()
            .ok()
            .and_then(|guard| guard.clone())
    }

    /// 显式选中一个已有大纲（续传/重入场景）
    pub fn select_outline(&self, record: OutlineRecord) {
        if let Ok(mut guard) = self.selected_outline.lock() {
            *guard = Some(record);
        }
    }

    /// 取消在途的生成会话（协作式：关闭流、停止批次循环）
    ///
    /// 当前批次未持久化的半成品被丢弃，之前已持久化的批次保留。
    pub fn cancel(&self) {
        let token = self
            .current_cancel
            .lock()
            .ok()
            .and_then(|guard| guard.clone());
        if let Some(token) = token {
            tracing::info!("Cancelling active generation session");
            token.cancel();
        }
    }

    // ========================================================================
    // Idle → GeneratingOutline → OutlineReady
    // ========================================================================

    /// 从项目元数据生成整书大纲（单次生成，不走批次规划）
    ///
    /// 成功后大纲被持久化并成为选中大纲。
    pub async fn generate_outline(
        &self,
        request: OutlineRequest,
    ) -> Result<OutlineRecord, DecomposeError> {
        let _gate = self.acquire_gate()?;
        let mut session = GenerationSession::new(1);
        self.install_cancel(&session);
        let result = self.generate_outline_inner(&request, &mut session).await;
        self.conclude(&session, result)
    }

    async fn generate_outline_inner(
        &self,
        request: &OutlineRequest,
        session: &mut GenerationSession,
    ) -> Result<OutlineRecord, DecomposeError> {
        let title = Title::new(&request.title)?;

        self.set_state(session.id(), PipelineState::GeneratingOutline);
        let text = self
            .stream_text(session, prompts::outline_messages(request))
            .await?;
        if text.trim().is_empty() {
            return Err(DecomposeError::Validation(
                "generation produced an empty outline".to_string(),
            ));
        }

        let content = OutlineContent::from_raw_text(text).encode();
        let record = self
            .outline_store
            .create(request.project_id, title.as_str(), &content)
            .await?;

        tracing::info!(
            outline_id = %record.id,
            project_id = %request.project_id,
            "Outline generated and persisted"
        );
        self.progress.publish(ProgressEvent::RecordPersisted {
            session_id: session.id().to_string(),
            kind: "outline".to_string(),
            order_index: 1,
        });

        if let Ok(mut guard) = self.selected_outline.lock() {
            *guard = Some(record.clone());
        }
        self.set_state(session.id(), PipelineState::OutlineReady);
        Ok(record)
    }

    // ========================================================================
    // OutlineReady → DecomposingVolumes → VolumesReady
    // ========================================================================

    /// 把选中大纲分解为分卷（单次生成 + 结构化提取）
    ///
    /// 提取/校验失败自动重试一次；逐卷独立持久化，单卷保存失败
    /// 不阻止其余卷，整步结果标记降级。
    pub async fn decompose_volumes(&self) -> Result<StepOutcome<VolumeRecord>, DecomposeError> {
        let outline = self.selected_outline().ok_or_else(|| {
            DecomposeError::InvalidState("no outline selected".to_string())
        })?;
        let _gate = self.acquire_gate()?;
        let mut session = GenerationSession::new(1);
        self.install_cancel(&session);
        let result = self.decompose_volumes_inner(&outline, &mut session).await;
        self.conclude(&session, result)
    }

    async fn decompose_volumes_inner(
        &self,
        outline: &OutlineRecord,
        session: &mut GenerationSession,
    ) -> Result<StepOutcome<VolumeRecord>, DecomposeError> {
        self.set_state(session.id(), PipelineState::DecomposingVolumes);
        let raw_text = OutlineContent::decode(&outline.content)
            .raw_text()
            .to_string();

        let drafts = match self.attempt_volume_extraction(session, &raw_text).await {
            Ok(drafts) => drafts,
            Err(e) if e.is_batch_retryable() => {
                tracing::warn!(error = %e, "Volume extraction rejected, retrying once");
                self.attempt_volume_extraction(session, &raw_text).await?
            }
            Err(e) => return Err(e),
        };

        let mut outcome = StepOutcome::new();
        for draft in &drafts {
            match self.volume_store.create(outline.id, draft).await {
                Ok(record) => {
                    self.progress.publish(ProgressEvent::RecordPersisted {
                        session_id: session.id().to_string(),
                        kind: "volume".to_string(),
                        order_index: draft.order_index,
                    });
                    outcome.records.push(record);
                }
                Err(e) => {
                    tracing::error!(
                        order_index = draft.order_index,
                        error = %e,
                        "Volume persist failed"
                    );
                    self.progress.publish(ProgressEvent::RecordPersistFailed {
                        session_id: session.id().to_string(),
                        kind: "volume".to_string(),
                        order_index: draft.order_index,
                        error: e.to_string(),
                    });
                    outcome.degraded = true;
                    outcome
                        .failures
                        .push(format!("volume {}: {}", draft.order_index, e));
                }
            }
        }

        tracing::info!(
            outline_id = %outline.id,
            volumes = outcome.records.len(),
            degraded = outcome.degraded,
            "Volume decomposition finished"
        );
        self.set_state(session.id(), PipelineState::VolumesReady);
        Ok(outcome)
    }

    async fn attempt_volume_extraction(
        &self,
        session: &mut GenerationSession,
        raw_text: &str,
    ) -> Result<Vec<VolumeDraft>, DecomposeError> {
        let text = self
            .stream_text(session, prompts::volume_messages(raw_text))
            .await?;
        let items = extract_array(&text, "volumes")?;
        if items.is_empty() {
            return Err(DecomposeError::Validation(
                "generation produced an empty volume list".to_string(),
            ));
        }

        let mut drafts = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            drafts.push(VolumeDraft::from_generated(
                item,
                position as u32 + 1,
                self.config.default_chapter_count,
            )?);
        }
        Ok(drafts)
    }

    // ========================================================================
    // VolumesReady → DecomposingChapters(batch k of n) → ChaptersReady
    // ========================================================================

    /// 把一个分卷分解为章节（多批，严格串行，可续传）
    ///
    /// 已接受数量从持久化集合重新计算（唯一事实来源），
    /// 不使用内存计数；中断后再次调用从缺口处继续，不重复已保存章节。
    pub async fn decompose_chapters(
        &self,
        volume: &VolumeRecord,
    ) -> Result<StepOutcome<ChapterRecord>, DecomposeError> {
        let _gate = self.acquire_gate()?;
        let mut session = GenerationSession::new(volume.draft.chapter_count);
        self.install_cancel(&session);
        let result = self.decompose_chapters_inner(volume, &mut session).await;
        self.conclude(&session, result)
    }

    async fn decompose_chapters_inner(
        &self,
        volume: &VolumeRecord,
        session: &mut GenerationSession,
    ) -> Result<StepOutcome<ChapterRecord>, DecomposeError> {
        let mut accepted = self.chapter_store.find_by_volume(volume.id).await?;
        accepted.sort_by_key(|record| record.draft.order_index);
        verify_contiguous(&accepted)?;
        session.set_accepted_count(accepted.len() as u32);

        if !accepted.is_empty() {
            tracing::info!(
                volume_id = %volume.id,
                resumed_from = accepted.len(),
                target = volume.draft.chapter_count,
                "Resuming chapter decomposition from persisted collection"
            );
        }

        let planner = BatchPlanner::new(volume.draft.chapter_count, self.config.batch_size);
        let mut outcome = StepOutcome::new();

        while let Some(range) = planner.next_range(accepted.len() as u32) {
            self.set_state(
                session.id(),
                PipelineState::DecomposingChapters {
                    batch: planner.batch_number(accepted.len() as u32),
                    total_batches: planner.total_batches(),
                },
            );

            // 整批失败（提取/校验）自动从同一区间重试一次，不会部分合并
            let drafts = match self
                .attempt_chapter_batch(session, volume, &accepted, range)
                .await
            {
                Ok(drafts) => drafts,
                Err(e) if e.is_batch_retryable() => {
                    tracing::warn!(
                        start = range.start,
                        end = range.end,
                        error = %e,
                        "Chapter batch rejected, retrying same range once"
                    );
                    self.attempt_chapter_batch(session, volume, &accepted, range)
                        .await?
                }
                Err(e) => return Err(e),
            };

            self.progress.publish(ProgressEvent::BatchAccepted {
                session_id: session.id().to_string(),
                start: range.start,
                end: range.end,
            });

            // 批内逐章持久化：单章失败不阻止同批其余章的尝试
            let mut batch_failures = Vec::new();
            for draft in &drafts {
                match self.chapter_store.create(volume.id, draft).await {
                    Ok(record) => {
                        self.progress.publish(ProgressEvent::RecordPersisted {
                            session_id: session.id().to_string(),
                            kind: "chapter".to_string(),
                            order_index: draft.order_index,
                        });
                        accepted.push(record);
                        session.set_accepted_count(accepted.len() as u32);
                    }
                    Err(e) => {
                        tracing::error!(
                            volume_id = %volume.id,
                            order_index = draft.order_index,
                            error = %e,
                            "Chapter persist failed"
                        );
                        self.progress.publish(ProgressEvent::RecordPersistFailed {
                            session_id: session.id().to_string(),
                            kind: "chapter".to_string(),
                            order_index: draft.order_index,
                            error: e.to_string(),
                        });
                        batch_failures.push(format!("chapter {}: {}", draft.order_index, e));
                    }
                }
            }

            if !batch_failures.is_empty() {
                // 保存缺口会破坏持久化集合的序号连续性，继续生成只会
                // 放大错位；就此止步，已保存章节保留，续传时重新计数。
                return Err(DecomposeError::Persistence(batch_failures.join("; ")));
            }
        }

        if accepted.len() as u32 != volume.draft.chapter_count {
            return Err(DecomposeError::InvalidState(format!(
                "chapter collection incomplete: {} of {}",
                accepted.len(),
                volume.draft.chapter_count
            )));
        }
        verify_contiguous(&accepted)?;

        tracing::info!(
            volume_id = %volume.id,
            chapters = accepted.len(),
            "Chapter decomposition finished"
        );
        outcome.records = accepted;
        self.set_state(session.id(), PipelineState::ChaptersReady);
        Ok(outcome)
    }

    async fn attempt_chapter_batch(
        &self,
        session: &mut GenerationSession,
        volume: &VolumeRecord,
        accepted: &[ChapterRecord],
        range: BatchRange,
    ) -> Result<Vec<ChapterDraft>, DecomposeError> {
        let entries: Vec<ContinuityEntry> = accepted
            .iter()
            .map(|record| ContinuityEntry {
                ordinal: record.draft.order_index,
                title: record.draft.title.clone(),
                summary: record.draft.core_event.clone(),
            })
            .collect();
        let continuity = continuity_block(&entries);

        let text = self
            .stream_text(
                session,
                prompts::chapter_batch_messages(volume, &continuity, range),
            )
            .await?;

        let items = extract_array(&text, "chapters")?;
        // 模型可能超发；只取区间长度，序号一律由区间指定
        let mut drafts = Vec::new();
        for (offset, item) in items.iter().take(range.len() as usize).enumerate() {
            drafts.push(ChapterDraft::from_generated(
                item,
                range.start + offset as u32,
            )?);
        }
        if drafts.is_empty() {
            return Err(DecomposeError::Validation(
                "generation produced an empty chapter batch".to_string(),
            ));
        }
        Ok(drafts)
    }

    // ========================================================================
    // 共用
    // ========================================================================

    /// 发起一次流式生成并摄取到完整文本
    async fn stream_text(
        &self,
        session: &mut GenerationSession,
        messages: Vec<ChatMessage>,
    ) -> Result<String, DecomposeError> {
        let request = GenerationRequest {
            messages,
            max_tokens: self.config.max_tokens,
        };
        let chunks = self.generation.open_stream(request).await?;
        session.begin_streaming();

        let cancel = session.cancel_token();
        let session_id = session.id().to_string();
        let progress = Arc::clone(&self.progress);
        let mut latest = String::new();

        let result = self
            .ingestor
            .ingest(chunks, &cancel, |text| {
                latest.clear();
                latest.push_str(text);
                progress.publish(ProgressEvent::StreamDelta {
                    session_id: session_id.clone(),
                    text: text.to_string(),
                });
            })
            .await;

        // 半成品快照留在会话里：取消后调用方仍可显式取走
        session.set_accumulated(&latest);
        session.end_streaming();

        match result {
            Ok(text) => Ok(text),
            Err(StreamError::Cancelled) => Err(DecomposeError::Cancelled),
            Err(StreamError::DeadlineExceeded) => Err(DecomposeError::StreamTransport(
                "stream deadline exceeded before [DONE]".to_string(),
            )),
            Err(StreamError::Transport(e)) => Err(DecomposeError::StreamTransport(e.to_string())),
        }
    }

    fn acquire_gate(&self) -> Result<tokio::sync::MutexGuard<'_, ()>, DecomposeError> {
        self.gate.try_lock().map_err(|_| {
            DecomposeError::InvalidState(
                "another generation session is already active".to_string(),
            )
        })
    }

    fn install_cancel(&self, session: &GenerationSession) {
        if let Ok(mut guard) = self.current_cancel.lock() {
            *guard = Some(session.cancel_token());
        }
    }

    fn clear_cancel(&self) {
        if let Ok(mut guard) = self.current_cancel.lock() {
            *guard = None;
        }
    }

    /// 步骤收尾：清除取消令牌，失败/取消时落入终态并发布事件
    fn conclude<T>(
        &self,
        session: &GenerationSession,
        result: Result<T, DecomposeError>,
    ) -> Result<T, DecomposeError> {
        self.clear_cancel();
        match &result {
            Ok(_) => {}
            Err(DecomposeError::Cancelled) => {
                self.set_state(session.id(), PipelineState::Cancelled);
                self.progress.publish(ProgressEvent::SessionCancelled {
                    session_id: session.id().to_string(),
                });
            }
            Err(e) => {
                self.set_state(session.id(), PipelineState::Failed);
                self.progress.publish(ProgressEvent::StepFailed {
                    session_id: session.id().to_string(),
                    message: e.to_string(),
                });
            }
        }
        result
    }

    fn set_state(&self, session_id: &str, state: PipelineState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state.clone();
        }
        tracing::debug!(state = state.as_str(), "Pipeline state changed");
        self.progress.publish(ProgressEvent::StateChanged {
            session_id: session_id.to_string(),
            state,
        });
    }
}

/// 校验持久化集合的序号连续性（1 起始，无缺口无重复）
fn verify_contiguous(records: &[ChapterRecord]) -> Result<(), DecomposeError> {
    for (position, record) in records.iter().enumerate() {
        let expected = position as u32 + 1;
        if record.draft.order_index != expected {
            return Err(DecomposeError::InvalidState(format!(
                "persisted chapters are not contiguous: expected order_index {} at position {}, found {}",
                expected,
                position + 1,
                record.draft.order_index
            )));
        }
    }
    Ok(())
}
