//! Progress Publisher Implementation
//!
//! ProgressSink 的 broadcast 实现：按会话分通道推送，
//! 另有一条全局通道供不关心具体会话的订阅方（如前端总览）使用。

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::application::ports::{ProgressEvent, ProgressSink};

/// 进度事件发布器
pub struct ProgressPublisher {
    /// session_id -> broadcast sender (会话级事件)
    session_channels: DashMap<String, broadcast::Sender<ProgressEvent>>,
    /// 全局通道：所有会话的事件都会镜像到这里
    global_channel: broadcast::Sender<ProgressEvent>,
}

impl ProgressPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(256);
        Self {
            session_channels: DashMap::new(),
            global_channel: global_tx,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全局事件
    pub fn subscribe_global(&self) -> broadcast::Receiver<ProgressEvent> {
        self.global_channel.subscribe()
    }

    /// 注册会话的事件通道
    pub fn register_session(&self, session_id: &str) -> broadcast::Receiver<ProgressEvent> {
        if let Some(sender) = self.session_channels.get(session_id) {
            return sender.subscribe();
        }

        let (tx, rx) = broadcast::channel(256);
        self.session_channels.insert(session_id.to_string(), tx);
        rx
    }

    /// 取消注册会话
    pub fn unregister_session(&self, session_id: &str) {
        self.session_channels.remove(session_id);
    }

    /// 获取会话的事件接收器
    pub fn subscribe(&self, session_id: &str) -> Option<broadcast::Receiver<ProgressEvent>> {
        self.session_channels
            .get(session_id)
            .map(|sender| sender.subscribe())
    }
}

impl Default for ProgressPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ProgressPublisher {
    fn publish(&self, event: ProgressEvent) {
        if let Some(sender) = self.session_channels.get(event.session_id()) {
            let _ = sender.send(event.clone());
        }
        if let Err(e) = self.global_channel.send(event) {
            tracing::trace!(error = %e, "No global progress receivers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::PipelineState;

    fn state_event(session_id: &str, state: PipelineState) -> ProgressEvent {
        ProgressEvent::StateChanged {
            session_id: session_id.to_string(),
            state,
        }
    }

    #[tokio::test]
    async fn test_session_channel_receives_own_events_only() {
        let publisher = ProgressPublisher::new();
        let mut rx_a = publisher.register_session("a");
        let mut rx_b = publisher.register_session("b");

        publisher.publish(state_event("a", PipelineState::GeneratingOutline));

        let event = rx_a.try_recv().unwrap();
        assert_eq!(event.session_id(), "a");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_global_channel_mirrors_all_sessions() {
        let publisher = ProgressPublisher::new();
        let mut global = publisher.subscribe_global();

        publisher.publish(state_event("a", PipelineState::GeneratingOutline));
        publisher.publish(state_event("b", PipelineState::OutlineReady));

        assert_eq!(global.try_recv().unwrap().session_id(), "a");
        assert_eq!(global.try_recv().unwrap().session_id(), "b");
    }

    #[tokio::test]
    async fn test_unregistered_session_drops_channel() {
        let publisher = ProgressPublisher::new();
        let _rx = publisher.register_session("a");
        publisher.unregister_session("a");
        assert!(publisher.subscribe("a").is_none());
    }
}
