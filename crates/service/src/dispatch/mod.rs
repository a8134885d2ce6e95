//! 异步调度中心：UI 意图 -> 后端调用 -> 提示 / 回调 / loading

pub mod events;
pub mod handler;
pub mod intent;
pub mod orchestrator;

pub use events::{ChannelSink, EventSink, Notification, NotificationKind, UiEvent};
pub use handler::{Handler, Operation, Outcome, ServiceCall, SuccessEffect};
pub use intent::{Category, Intent, IntentMessage, OnComplete};
pub use orchestrator::{OrchestrationState, Orchestrator, OrchestratorOptions};
