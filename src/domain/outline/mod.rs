//! Outline Context - 大纲限界上下文
//!
//! 职责:
//! - 大纲/分卷/章节的值对象与草稿实体
//! - 模型输出到草稿的归一化与校验

mod entities;
mod errors;
mod value_objects;

pub use entities::{ChapterDraft, VolumeDraft};
pub use errors::OutlineError;
pub use value_objects::{ChapterId, OutlineContent, OutlineId, Title, VolumeId};
