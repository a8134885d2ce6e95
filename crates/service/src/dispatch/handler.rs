//! Worker templates: one parameterised handler per category instead of six
//! copies of the same loading / call / notify / callback sequence.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::api::ApiService;
use crate::dispatch::events::UiEvent;
use crate::dispatch::intent::Category;
use crate::errors::ServiceError;
use crate::pagination::{ListDefaults, ListResponse, ListResult};

/// 后端调用的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Done,
    List(ListResponse),
}

/// 绑定到某个类别的后端操作
#[async_trait]
pub trait Operation: Send + Sync {
    async fn invoke(&self, payload: &Value) -> Result<Outcome, ServiceError>;
}

/// 将类别映射到 [`ApiService`] 的对应方法
pub struct ServiceCall {
    service: Arc<dyn ApiService>,
    category: Category,
}

impl ServiceCall {
    pub fn new(service: Arc<dyn ApiService>, category: Category) -> Self { Self { service, category } }
}

#[async_trait]
impl Operation for ServiceCall {
    async fn invoke(&self, payload: &Value) -> Result<Outcome, ServiceError> {
        let service = &self.service;
        match self.category {
            Category::Create => service.create(payload).await.map(|_| Outcome::Done),
            Category::Delete => service.remove(payload).await.map(|_| Outcome::Done),
            Category::BatchDelete => service.batch_remove(payload).await.map(|_| Outcome::Done),
            Category::Update => service.update(payload).await.map(|_| Outcome::Done),
            Category::UpdateApiStatus => service.update_status(payload).await.map(|_| Outcome::Done),
            Category::QueryList => service.query_list(payload).await.map(Outcome::List),
        }
    }
}

/// 成功后、提示之前发出的类别专属副作用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuccessEffect {
    None,
    /// 关闭编辑弹窗
    DismissModal,
    /// 发布列表与分页
    PublishList,
}

impl SuccessEffect {
    /// Builds the events up front so a mismatch fails before anything is emitted.
    pub(crate) fn events(
        self,
        payload: &Value,
        outcome: Outcome,
        defaults: ListDefaults,
    ) -> Result<Vec<UiEvent>, ServiceError> {
        match (self, outcome) {
            (SuccessEffect::None, _) => Ok(Vec::new()),
            (SuccessEffect::DismissModal, _) => Ok(vec![UiEvent::SetModalVisible(false)]),
            (SuccessEffect::PublishList, Outcome::List(resp)) => {
                Ok(vec![UiEvent::ListLoaded(ListResult::from_response(payload, resp, defaults))])
            }
            (SuccessEffect::PublishList, Outcome::Done) => {
                Err(ServiceError::backend("unexpected response: list payload missing"))
            }
        }
    }
}

/// 单个类别的 worker 模板
pub struct Handler {
    pub(crate) operation: Arc<dyn Operation>,
    pub(crate) effect: SuccessEffect,
    pub(crate) success_message: Option<Cow<'static, str>>,
    pub(crate) failure_label: Cow<'static, str>,
    pub(crate) prefix_failure_notice: bool,
}

/// (category, effect, success message, failure label)
const BUILTIN: [(Category, SuccessEffect, Option<&str>, &str); 6] = [
    (Category::Create, SuccessEffect::DismissModal, Some("新增成功"), "新增失败"),
    (Category::Delete, SuccessEffect::None, Some("删除成功"), "删除失败"),
    (Category::BatchDelete, SuccessEffect::None, Some("删除成功"), "批量删除失败"),
    (Category::Update, SuccessEffect::DismissModal, Some("修改成功"), "修改失败"),
    (Category::UpdateApiStatus, SuccessEffect::None, Some("操作成功"), "操作失败"),
    (Category::QueryList, SuccessEffect::PublishList, None, "查询列表失败"),
];

impl Handler {
    pub fn new(operation: Arc<dyn Operation>) -> Self {
        Self {
            operation,
            effect: SuccessEffect::None,
            success_message: None,
            failure_label: Cow::Borrowed("操作失败"),
            prefix_failure_notice: false,
        }
    }

    /// 内置模板：按类别绑定后端方法、提示文案与副作用
    pub fn builtin(category: Category, service: Arc<dyn ApiService>) -> Self {
        let (_, effect, message, label) = BUILTIN
            .into_iter()
            .find(|(c, ..)| *c == category)
            .unwrap_or((category, SuccessEffect::None, None, "操作失败"));
        let handler = Handler::new(Arc::new(ServiceCall::new(service, category)))
            .effect(effect)
            .failure_label(label)
            .prefix_failure_notice(category == Category::QueryList);
        match message {
            Some(msg) => handler.success_message(msg),
            None => handler,
        }
    }

    pub fn effect(mut self, effect: SuccessEffect) -> Self {
        self.effect = effect;
        self
    }

    pub fn success_message(mut self, msg: impl Into<Cow<'static, str>>) -> Self {
        self.success_message = Some(msg.into());
        self
    }

    pub fn failure_label(mut self, label: impl Into<Cow<'static, str>>) -> Self {
        self.failure_label = label.into();
        self
    }

    pub fn prefix_failure_notice(mut self, prefix: bool) -> Self {
        self.prefix_failure_notice = prefix;
        self
    }

    /// 失败提示文案：默认为原始错误，列表查询带前缀
    pub fn failure_notice(&self, err: &ServiceError) -> String {
        if self.prefix_failure_notice {
            format!("{}：{}", self.failure_label, err.cause())
        } else {
            err.cause().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Noop;

    #[async_trait]
    impl Operation for Noop {
        async fn invoke(&self, _payload: &Value) -> Result<Outcome, ServiceError> { Ok(Outcome::Done) }
    }

    #[test]
    fn builtin_table_covers_every_category() {
        for c in Category::ALL {
            assert!(BUILTIN.iter().any(|(b, ..)| *b == c), "{c} missing");
        }
    }

    #[test]
    fn failure_notice_prefix_only_when_requested() {
        let err = ServiceError::backend("timeout");
        let plain = Handler::new(Arc::new(Noop)).failure_label("删除失败");
        assert_eq!(plain.failure_notice(&err), "timeout");
        let prefixed = plain.failure_label("查询列表失败").prefix_failure_notice(true);
        assert_eq!(prefixed.failure_notice(&err), "查询列表失败：timeout");
    }

    #[test]
    fn publish_list_requires_list_outcome() {
        let err = SuccessEffect::PublishList
            .events(&json!({}), Outcome::Done, ListDefaults::default())
            .unwrap_err();
        assert!(err.cause().contains("list payload missing"));
        let events = SuccessEffect::DismissModal
            .events(&json!({}), Outcome::Done, ListDefaults::default())
            .expect("events");
        assert_eq!(events, vec![UiEvent::SetModalVisible(false)]);
    }
}
