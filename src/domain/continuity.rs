//! 连贯性上下文
//!
//! 章节分解是分批进行的，后一批的提示词要带上前面已接受的同级记录，
//! 模型才能接续既有剧情。渲染是无状态且保序的：相同输入永远产出
//! 相同文本。

/// 参与连贯性渲染的一条已接受记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuityEntry {
    /// 1 起始的序号
    pub ordinal: u32,
    pub title: String,
    /// 核心叙事字段（章节为 core_event）
    pub summary: String,
}

/// 渲染已接受章节的连贯性区块
///
/// 无已接受记录时返回空字符串（提示词中不出现该区块）。
pub fn continuity_block(entries: &[ContinuityEntry]) -> String {
    if entries.is_empty() {
        return String::new();
    }

    let mut block = String::from("已生成的章节如下，请与其保持剧情连贯，不要重复或矛盾：\n");
    for entry in entries {
        block.push_str(&format!(
            "第{}章《{}》：{}\n",
            entry.ordinal, entry.title, entry.summary
        ));
    }
    block
}
