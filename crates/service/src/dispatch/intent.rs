//! Intent model: the action category, its JSON payload and the optional
//! success continuation supplied by the caller.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 六种操作类型，对应 UI 发出的 action type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Create,
    Delete,
    BatchDelete,
    Update,
    UpdateApiStatus,
    QueryList,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::QueryList,
        Category::Create,
        Category::Update,
        Category::UpdateApiStatus,
        Category::Delete,
        Category::BatchDelete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Create => "CREATE",
            Category::Delete => "DELETE",
            Category::BatchDelete => "BATCH_DELETE",
            Category::Update => "UPDATE",
            Category::UpdateApiStatus => "UPDATE_API_STATUS",
            Category::QueryList => "QUERY_LIST",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action type: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// 成功回调：仅在成功路径上以无参形式调用一次
pub type OnComplete = Box<dyn FnOnce() + Send + 'static>;

/// 一次性的操作意图，由 UI 创建、被调度器消费一次
pub struct Intent {
    pub category: Category,
    pub payload: Value,
    pub on_complete: Option<OnComplete>,
}

impl Intent {
    pub fn new(category: Category, payload: Value) -> Self {
        Self { category, payload, on_complete: None }
    }

    pub fn on_complete(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    pub fn category(&self) -> Category { self.category }
}

impl fmt::Debug for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intent")
            .field("category", &self.category)
            .field("payload", &self.payload)
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// 线上传输形式：`{"type": "QUERY_LIST", "payload": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentMessage {
    #[serde(rename = "type")]
    pub category: Category,
    #[serde(default = "empty_payload")]
    pub payload: Value,
}

fn empty_payload() -> Value { Value::Object(Default::default()) }

impl From<IntentMessage> for Intent {
    fn from(msg: IntentMessage) -> Self { Intent::new(msg.category, msg.payload) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_action_type_strings() {
        assert_eq!("BATCH_DELETE".parse::<Category>(), Ok(Category::BatchDelete));
        assert_eq!("UPDATE_API_STATUS".parse::<Category>(), Ok(Category::UpdateApiStatus));
        assert!("REFRESH".parse::<Category>().is_err());
        for c in Category::ALL {
            assert_eq!(c.to_string().parse::<Category>(), Ok(c));
        }
    }

    #[test]
    fn message_without_payload_gets_empty_object() {
        let msg: IntentMessage = serde_json::from_str(r#"{"type":"QUERY_LIST"}"#).expect("decode");
        assert_eq!(msg.category, Category::QueryList);
        assert_eq!(msg.payload, json!({}));

        let intent: Intent = msg.into();
        assert!(intent.on_complete.is_none());
    }

    #[test]
    fn message_type_matches_display_form() {
        let msg: IntentMessage =
            serde_json::from_value(json!({"type": "DELETE", "payload": {"id": 5}})).expect("decode");
        assert_eq!(msg.category.to_string(), "DELETE");
        assert_eq!(msg.payload["id"], 5);
    }
}
