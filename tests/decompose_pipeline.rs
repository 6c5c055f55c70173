//! 分解流水线集成测试
//!
//! 用脚本回放客户端 + 内存 Store 驱动完整状态机：
//! 大纲 → 分卷 → 章节批次，含重试、续传、取消与降级路径。

use std::sync::Arc;
use std::time::Duration;

use storyforge::application::ports::{PipelineState, ProgressEvent};
use storyforge::application::{
    ControllerConfig, DecompositionController, DecomposeError, OutlineRequest,
};
use storyforge::domain::outline::{OutlineContent, OutlineId};
use storyforge::infrastructure::{
    InMemoryChapterStore, InMemoryOutlineStore, InMemoryVolumeStore, ProgressPublisher,
    ScriptedGenerationClient,
};

struct Harness {
    controller: Arc<DecompositionController>,
    client: Arc<ScriptedGenerationClient>,
    volumes: Arc<InMemoryVolumeStore>,
    chapters: Arc<InMemoryChapterStore>,
    publisher: Arc<ProgressPublisher>,
}

fn harness() -> Harness {
    let client = Arc::new(ScriptedGenerationClient::new());
    let outlines = InMemoryOutlineStore::new().arc();
    let volumes = InMemoryVolumeStore::new().arc();
    let chapters = InMemoryChapterStore::new().arc();
    let publisher = ProgressPublisher::new().arc();

    let controller = Arc::new(DecompositionController::new(
        ControllerConfig::default(),
        client.clone(),
        outlines,
        volumes.clone(),
        chapters.clone(),
        publisher.clone(),
    ));

    Harness {
        controller,
        client,
        volumes,
        chapters,
        publisher,
    }
}

fn outline_request() -> OutlineRequest {
    OutlineRequest {
        project_id: uuid::Uuid::new_v4(),
        title: "沧海遗珠".to_string(),
        genre: "玄幻".to_string(),
        synopsis: "少年自海底遗迹中醒来，背负失落王朝的秘密。".to_string(),
    }
}

/// 单行帧片段（不带哨兵）
fn frame_fragment(text: &str) -> String {
    format!("data: {}\n", serde_json::json!({ "content": text }))
}

fn volumes_payload(chapter_counts: &[u32]) -> String {
    let volumes: Vec<_> = chapter_counts
        .iter()
        .enumerate()
        .map(|(position, count)| {
            let ordinal = position + 1;
            serde_json::json!({
                "title": format!("第{ordinal}卷"),
                "core_conflict": format!("第{ordinal}卷核心冲突"),
                "content": format!("第{ordinal}卷剧情概述"),
                "key_events": [format!("事件{ordinal}A"), format!("事件{ordinal}B")],
                "character_development": "主角逐渐成长",
                "chapter_count": count,
                "order_index": ordinal,
            })
        })
        .collect();
    serde_json::json!({ "volumes": volumes }).to_string()
}

fn chapters_payload(ordinals: std::ops::Range<u32>) -> String {
    let chapters: Vec<_> = ordinals
        .map(|n| {
            serde_json::json!({
                "title": format!("第{n}章"),
                "core_event": format!("事件{n}"),
                "emotional_goal": "紧张",
                "word_count_estimate": 3000,
                "content": format!("第{n}章剧情概述"),
            })
        })
        .collect();
    serde_json::json!({ "chapters": chapters }).to_string()
}

/// 准备一个已选中大纲（跳过大纲生成步骤）
fn select_outline(h: &Harness) {
    h.controller.select_outline(storyforge::application::ports::OutlineRecord {
        id: OutlineId::new(),
        project_id: uuid::Uuid::new_v4(),
        title: "沧海遗珠".to_string(),
        content: OutlineContent::from_raw_text("第一幕：海底遗迹。第二幕：王朝秘辛。").encode(),
        version: 1,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    });
}

#[tokio::test]
async fn test_full_pipeline_reaches_chapters_ready() {
    let h = harness();
    h.client.push_content("整书大纲：少年、遗迹、王朝。");
    h.client.push_content(&volumes_payload(&[14]));
    h.client.push_content(&chapters_payload(1..9));
    h.client.push_content(&chapters_payload(9..15));

    let outline = h.controller.generate_outline(outline_request()).await.unwrap();
    assert_eq!(h.controller.state(), PipelineState::OutlineReady);
    assert_eq!(
        OutlineContent::decode(&outline.content).raw_text(),
        "整书大纲：少年、遗迹、王朝。"
    );

    let volumes = h.controller.decompose_volumes().await.unwrap();
    assert_eq!(h.controller.state(), PipelineState::VolumesReady);
    assert_eq!(volumes.records.len(), 1);
    assert!(!volumes.degraded);
    assert_eq!(volumes.records[0].draft.chapter_count, 14);

    let chapters = h
        .controller
        .decompose_chapters(&volumes.records[0])
        .await
        .unwrap();
    assert_eq!(h.controller.state(), PipelineState::ChaptersReady);
    assert!(!chapters.degraded);

    let orders: Vec<u32> = chapters
        .records
        .iter()
        .map(|c| c.draft.order_index)
        .collect();
    assert_eq!(orders, (1..=14).collect::<Vec<u32>>());
    // 14 章 / 每批 8 → 两次章节生成 + 大纲 + 分卷
    assert_eq!(h.client.call_count(), 4);
}

#[tokio::test]
async fn test_malformed_batch_retried_once_then_accepted() {
    let h = harness();
    select_outline(&h);
    h.client.push_content(&volumes_payload(&[6]));
    let volumes = h.controller.decompose_volumes().await.unwrap();

    h.client.push_content("抱歉，我无法输出结构化数据。");
    h.client.push_content(&chapters_payload(1..7));

    let chapters = h
        .controller
        .decompose_chapters(&volumes.records[0])
        .await
        .unwrap();
    // 重试不产生重复：恰好 6 章，序号连续
    let orders: Vec<u32> = chapters
        .records
        .iter()
        .map(|c| c.draft.order_index)
        .collect();
    assert_eq!(orders, (1..=6).collect::<Vec<u32>>());
    // 分卷 1 次 + 章节批次失败 1 次 + 重试 1 次
    assert_eq!(h.client.call_count(), 3);
}

#[tokio::test]
async fn test_retry_exhausted_fails_step() {
    let h = harness();
    select_outline(&h);
    h.client.push_content(&volumes_payload(&[6]));
    let volumes = h.controller.decompose_volumes().await.unwrap();

    h.client.push_content("第一次：没有对象");
    h.client.push_content("第二次：还是没有对象");

    let result = h.controller.decompose_chapters(&volumes.records[0]).await;
    assert!(matches!(result, Err(DecomposeError::Extraction(_))));
    assert_eq!(h.controller.state(), PipelineState::Failed);
    assert_eq!(h.client.call_count(), 3);

    // 失败的批次不写入任何记录，此前保存的集合原样保留
    use storyforge::application::ports::ChapterStorePort;
    let persisted = h
        .chapters
        .find_by_volume(volumes.records[0].id)
        .await
        .unwrap();
    assert!(persisted.is_empty());
}

#[tokio::test]
async fn test_cancel_mid_second_batch_keeps_first_batch_only() {
    let h = harness();
    select_outline(&h);
    h.client.push_content(&volumes_payload(&[20]));
    let volumes = h.controller.decompose_volumes().await.unwrap();
    let volume = volumes.records[0].clone();

    // 第一批完整返回，第二批挂起
    h.client.push_content(&chapters_payload(1..9));
    h.client.push_stalled(vec![frame_fragment("第二批生成中……")]);

    let controller = h.controller.clone();
    let worker = volume.clone();
    let handle = tokio::spawn(async move { controller.decompose_chapters(&worker).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    h.controller.cancel();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(DecomposeError::Cancelled)));
    assert_eq!(h.controller.state(), PipelineState::Cancelled);

    // 第一批的 8 章已保存，第二批不贡献任何记录
    use storyforge::application::ports::ChapterStorePort;
    let persisted = h.chapters.find_by_volume(volume.id).await.unwrap();
    let orders: Vec<u32> = persisted.iter().map(|c| c.draft.order_index).collect();
    assert_eq!(orders, (1..=8).collect::<Vec<u32>>());

    // 续传：从持久化集合重新计数，补齐剩余两批
    h.client.push_content(&chapters_payload(9..17));
    h.client.push_content(&chapters_payload(17..21));
    let resumed = h.controller.decompose_chapters(&volume).await.unwrap();
    let orders: Vec<u32> = resumed
        .records
        .iter()
        .map(|c| c.draft.order_index)
        .collect();
    assert_eq!(orders, (1..=20).collect::<Vec<u32>>());
    assert_eq!(h.controller.state(), PipelineState::ChaptersReady);
}

#[tokio::test]
async fn test_empty_chapter_batch_is_validation_failure() {
    let h = harness();
    select_outline(&h);
    h.client.push_content(&volumes_payload(&[6]));
    let volumes = h.controller.decompose_volumes().await.unwrap();

    h.client.push_content(&chapters_payload(1..1));
    h.client.push_content(&chapters_payload(1..1));

    let result = h.controller.decompose_chapters(&volumes.records[0]).await;
    assert!(matches!(result, Err(DecomposeError::Validation(_))));
    assert_eq!(h.controller.state(), PipelineState::Failed);
}

#[tokio::test]
async fn test_resumption_seeds_accepted_from_store() {
    let h = harness();
    select_outline(&h);
    h.client.push_content(&volumes_payload(&[14]));
    let volumes = h.controller.decompose_volumes().await.unwrap();
    let volume = &volumes.records[0];

    // 之前的会话已保存 1..=9 章
    use storyforge::application::ports::ChapterStorePort;
    let seed: serde_json::Value = serde_json::from_str(&chapters_payload(1..10)).unwrap();
    for (i, item) in seed["chapters"].as_array().unwrap().iter().enumerate() {
        let draft =
            storyforge::domain::outline::ChapterDraft::from_generated(item, i as u32 + 1).unwrap();
        h.chapters.create(volume.id, &draft).await.unwrap();
    }

    // 只需一批 [10, 15)
    h.client.push_content(&chapters_payload(10..15));
    let chapters = h.controller.decompose_chapters(volume).await.unwrap();

    let orders: Vec<u32> = chapters
        .records
        .iter()
        .map(|c| c.draft.order_index)
        .collect();
    assert_eq!(orders, (1..=14).collect::<Vec<u32>>());
    // 分卷 1 次 + 续传只补一批
    assert_eq!(h.client.call_count(), 2);
}

#[tokio::test]
async fn test_oversupplied_batch_truncated_to_range() {
    let h = harness();
    select_outline(&h);
    h.client.push_content(&volumes_payload(&[6]));
    let volumes = h.controller.decompose_volumes().await.unwrap();

    // 模型超发 10 章，只有前 6 章在区间内
    h.client.push_content(&chapters_payload(1..11));
    let chapters = h
        .controller
        .decompose_chapters(&volumes.records[0])
        .await
        .unwrap();
    assert_eq!(chapters.records.len(), 6);
    assert_eq!(h.controller.state(), PipelineState::ChaptersReady);
}

#[tokio::test]
async fn test_cancel_mid_stream_discards_partial_batch() {
    let h = harness();
    h.client.push_stalled(vec![frame_fragment("正在生成大纲……")]);

    let controller = h.controller.clone();
    let handle = tokio::spawn(async move { controller.generate_outline(outline_request()).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.controller.cancel();

    let result = handle.await.unwrap();
    assert!(matches!(result, Err(DecomposeError::Cancelled)));
    assert_eq!(h.controller.state(), PipelineState::Cancelled);
}

#[tokio::test]
async fn test_concurrent_session_rejected() {
    let h = harness();
    h.client.push_stalled(vec![frame_fragment("慢速生成中")]);

    let controller = h.controller.clone();
    let handle = tokio::spawn(async move { controller.generate_outline(outline_request()).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let second = h.controller.generate_outline(outline_request()).await;
    assert!(matches!(second, Err(DecomposeError::InvalidState(_))));

    h.controller.cancel();
    assert!(matches!(
        handle.await.unwrap(),
        Err(DecomposeError::Cancelled)
    ));
}

#[tokio::test]
async fn test_volume_persist_failure_degrades_step() {
    let h = harness();
    select_outline(&h);
    h.volumes.reject_order(2);
    h.client.push_content(&volumes_payload(&[8, 6, 10]));

    let outcome = h.controller.decompose_volumes().await.unwrap();
    assert!(outcome.degraded);
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(h.controller.state(), PipelineState::VolumesReady);
}

#[tokio::test]
async fn test_chapter_persist_gap_halts_and_blocks_resume() {
    let h = harness();
    select_outline(&h);
    h.client.push_content(&volumes_payload(&[6]));
    let volumes = h.controller.decompose_volumes().await.unwrap();
    let volume = &volumes.records[0];

    h.chapters.reject_order(3);
    h.client.push_content(&chapters_payload(1..7));

    let result = h.controller.decompose_chapters(volume).await;
    assert!(matches!(result, Err(DecomposeError::Persistence(_))));

    // 缺口集合不允许直接续传，需要先修复
    h.chapters.clear_rejections();
    let resumed = h.controller.decompose_chapters(volume).await;
    assert!(matches!(resumed, Err(DecomposeError::InvalidState(_))));
}

#[tokio::test]
async fn test_progress_events_cover_outline_step() {
    let h = harness();
    let mut global = h.publisher.subscribe_global();
    h.client.push_content("整书大纲正文。");

    h.controller.generate_outline(outline_request()).await.unwrap();

    let mut saw_generating = false;
    let mut saw_delta_snapshot = false;
    let mut saw_persisted = false;
    let mut saw_ready = false;
    while let Ok(event) = global.try_recv() {
        match event {
            ProgressEvent::StateChanged { state, .. } => match state {
                PipelineState::GeneratingOutline => saw_generating = true,
                PipelineState::OutlineReady => saw_ready = true,
                _ => {}
            },
            ProgressEvent::StreamDelta { text, .. } => {
                // 快照语义：事件携带到此刻的完整缓冲
                if text == "整书大纲正文。" {
                    saw_delta_snapshot = true;
                }
            }
            ProgressEvent::RecordPersisted { kind, .. } => {
                if kind == "outline" {
                    saw_persisted = true;
                }
            }
            _ => {}
        }
    }

    assert!(saw_generating);
    assert!(saw_delta_snapshot);
    assert!(saw_persisted);
    assert!(saw_ready);
}

#[tokio::test]
async fn test_volumes_without_selected_outline_rejected() {
    let h = harness();
    let result = h.controller.decompose_volumes().await;
    assert!(matches!(result, Err(DecomposeError::InvalidState(_))));
    // 未进入流式阶段，不应有生成调用
    assert_eq!(h.client.call_count(), 0);
}
