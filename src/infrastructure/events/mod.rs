//! 进度事件推送

mod progress;

pub use progress::ProgressPublisher;
