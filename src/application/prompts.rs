//! 提示词构造
//!
//! 三类生成调用的消息模板：整书大纲（单次）、分卷规划（单次）、
//! 章节批次（多批，携带连贯性上下文与显式章节号区间）。
//! 结构化输出要求与 `domain::extract` 的字段名保持一致。

use crate::application::ports::{ChatMessage, VolumeRecord};
use crate::domain::BatchRange;

/// 大纲生成请求的项目元数据
#[derive(Debug, Clone)]
pub struct OutlineRequest {
    pub project_id: uuid::Uuid,
    pub title: String,
    pub genre: String,
    pub synopsis: String,
}

/// 整书大纲（自由文本，单次生成）
pub fn outline_messages(request: &OutlineRequest) -> Vec<ChatMessage> {
    let system = "你是一位经验丰富的小说策划编辑，擅长搭建完整的长篇叙事结构。";
    let user = format!(
        "请为下面的小说项目撰写一份整书大纲，包含核心冲突、主线走向、\
         主要人物弧光与结局方向，直接输出大纲正文：\n\
         书名：{}\n类型：{}\n简介：{}",
        request.title, request.genre, request.synopsis
    );
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// 大纲 → 分卷（结构化输出，单次生成）
pub fn volume_messages(outline_text: &str) -> Vec<ChatMessage> {
    let system = "你是一位经验丰富的小说策划编辑。你只输出一个 JSON 对象，不要附加解释。";
    let user = format!(
        "根据以下整书大纲，把故事划分为若干卷。输出 JSON 对象，\
         顶层字段 volumes 是数组，每个元素包含：\
         title（卷名）、core_conflict（本卷核心冲突）、content（本卷剧情概述）、\
         key_events（关键事件字符串数组）、character_development（人物成长）、\
         chapter_count（本卷章节数，整数）、order_index（1 起始的卷序号，整数）。\n\n\
         整书大纲：\n{outline_text}"
    );
    vec![ChatMessage::system(system), ChatMessage::user(user)]
}

/// 分卷 → 章节批次（结构化输出，显式命名章节号区间）
pub fn chapter_batch_messages(
    volume: &VolumeRecord,
    continuity: &str,
    range: BatchRange,
) -> Vec<ChatMessage> {
    let system = "你是一位经验丰富的小说策划编辑。你只输出一个 JSON 对象，不要附加解释。";

    let mut user = format!(
        "为《{}》规划章节。本卷共 {} 章，核心冲突：{}。\n卷内容概述：{}\n",
        volume.draft.title,
        volume.draft.chapter_count,
        volume.draft.core_conflict,
        volume.draft.content,
    );
    if !volume.draft.key_events.is_empty() {
        user.push_str(&format!("关键事件：{}\n", volume.draft.key_events.join("；")));
    }
    if !continuity.is_empty() {
        user.push('\n');
        user.push_str(continuity);
    }
    user.push_str(&format!(
        "\n本次只生成第 {} 章到第 {} 章，共 {} 章。\
         输出 JSON 对象，顶层字段 chapters 是数组，按章节顺序排列，\
         每个元素包含：title（章节标题）、core_event（本章核心事件）、\
         emotional_goal（情绪目标）、word_count_estimate（预计字数，整数）、\
         content（本章剧情概述）。",
        range.start,
        range.last(),
        range.len(),
    ));

    vec![ChatMessage::system(system), ChatMessage::user(user)]
}
