//! Outbound events emitted by workers towards the state container / UI.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::pagination::ListResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Failure,
}

/// 提示消息，交由外部渲染
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Success, message: message.into() }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { kind: NotificationKind::Failure, message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiEvent {
    SetLoading(bool),
    SetModalVisible(bool),
    ListLoaded(ListResult),
    Notify(Notification),
}

/// 事件出口。实现必须是同步且不阻塞的：取消路径在 `Drop` 中调用它
pub trait EventSink: Send + Sync {
    fn emit(&self, event: UiEvent);
}

/// 将事件转发到 tokio 无界通道，接收端关闭后静默丢弃
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<UiEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: UiEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!(event = ?e.0, "event receiver dropped; discarding");
        }
    }
}
