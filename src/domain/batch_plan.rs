//! 批次规划
//!
//! 章节分解一次生成一批（默认 8 章），规划器根据已接受数量计算
//! 下一批的 1 起始半开区间 `[start, end)`。纯函数：未接受新记录时
//! 重复调用返回完全相同的区间，调用方只在整批提取+校验都成功后
//! 才推进已接受数量，保证既不漏号也不重号。

/// 默认批大小
pub const DEFAULT_BATCH_SIZE: u32 = 8;

/// 1 起始的半开批次区间 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchRange {
    pub start: u32,
    pub end: u32,
}

impl BatchRange {
    /// 区间内记录数
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// 区间最后一个序号（闭端）
    pub fn last(&self) -> u32 {
        self.end - 1
    }
}

/// 批次规划器
#[derive(Debug, Clone, Copy)]
pub struct BatchPlanner {
    target_count: u32,
    batch_size: u32,
}

impl BatchPlanner {
    pub fn new(target_count: u32, batch_size: u32) -> Self {
        Self {
            target_count,
            batch_size: batch_size.max(1),
        }
    }

    pub fn target_count(&self) -> u32 {
        self.target_count
    }

    /// 给定已接受数量，计算下一批区间；全部完成时返回 None
    pub fn next_range(&self, accepted: u32) -> Option<BatchRange> {
        let start = accepted + 1;
        if start > self.target_count {
            return None;
        }
        let end = (accepted + self.batch_size).min(self.target_count) + 1;
        Some(BatchRange { start, end })
    }

    /// 总批数（用于进度展示 batch k of n）
    pub fn total_batches(&self) -> u32 {
        self.target_count.div_ceil(self.batch_size)
    }

    /// 已接受数量对应的批次序号（1 起始）
    pub fn batch_number(&self, accepted: u32) -> u32 {
        accepted / self.batch_size + 1
    }
}
