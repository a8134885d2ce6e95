#![cfg(test)]
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::api::ApiService;
use crate::dispatch::{Category, EventSink, UiEvent};
use crate::errors::ServiceError;
use crate::pagination::{ListData, ListResponse};

/// Everything observed by a test, in order: sink events and callback invocations.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Event(UiEvent),
    Completed(&'static str),
}

#[derive(Default)]
pub struct Recorder {
    steps: Mutex<Vec<Step>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn steps(&self) -> Vec<Step> { self.steps.lock().unwrap().clone() }

    /// 返回可作为 `on_complete` 的回调，调用时记录 `label`
    pub fn callback(self: &Arc<Self>, label: &'static str) -> impl FnOnce() + Send + 'static {
        let this = Arc::clone(self);
        move || this.steps.lock().unwrap().push(Step::Completed(label))
    }

    pub fn count(&self, step: &Step) -> usize { self.steps().iter().filter(|s| *s == step).count() }
}

impl EventSink for Recorder {
    fn emit(&self, event: UiEvent) {
        self.steps.lock().unwrap().push(Step::Event(event));
    }
}

#[derive(Debug, Clone)]
pub enum Reply {
    Ok,
    Fail(&'static str),
    List(Vec<Value>, u64),
}

/// Scripted backend. Unscripted categories succeed; held calls wait for their gate.
#[derive(Default)]
pub struct StubApi {
    replies: Mutex<HashMap<Category, Reply>>,
    gates: Mutex<HashMap<Category, VecDeque<oneshot::Receiver<()>>>>,
    calls: Mutex<Vec<(Category, Value)>>,
}

impl StubApi {
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    pub fn reply(&self, category: Category, reply: Reply) {
        self.replies.lock().unwrap().insert(category, reply);
    }

    /// The next call of `category` blocks until the returned sender fires or is dropped.
    pub fn hold(&self, category: Category) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().entry(category).or_default().push_back(rx);
        tx
    }

    pub fn calls(&self) -> Vec<(Category, Value)> { self.calls.lock().unwrap().clone() }

    async fn call(&self, category: Category, payload: &Value) -> Result<Reply, ServiceError> {
        self.calls.lock().unwrap().push((category, payload.clone()));
        let gate = self.gates.lock().unwrap().get_mut(&category).and_then(|q| q.pop_front());
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let reply = self.replies.lock().unwrap().get(&category).cloned().unwrap_or(Reply::Ok);
        match reply {
            Reply::Fail(msg) => Err(ServiceError::backend(msg)),
            other => Ok(other),
        }
    }

    async fn unit(&self, category: Category, payload: &Value) -> Result<(), ServiceError> {
        self.call(category, payload).await.map(|_| ())
    }
}

#[async_trait]
impl ApiService for StubApi {
    async fn create(&self, payload: &Value) -> Result<(), ServiceError> {
        self.unit(Category::Create, payload).await
    }

    async fn remove(&self, payload: &Value) -> Result<(), ServiceError> {
        self.unit(Category::Delete, payload).await
    }

    async fn batch_remove(&self, payload: &Value) -> Result<(), ServiceError> {
        self.unit(Category::BatchDelete, payload).await
    }

    async fn update(&self, payload: &Value) -> Result<(), ServiceError> {
        self.unit(Category::Update, payload).await
    }

    async fn update_status(&self, payload: &Value) -> Result<(), ServiceError> {
        self.unit(Category::UpdateApiStatus, payload).await
    }

    async fn query_list(&self, payload: &Value) -> Result<ListResponse, ServiceError> {
        match self.call(Category::QueryList, payload).await? {
            Reply::List(list, total) => Ok(ListResponse { data: ListData { list, total } }),
            _ => Ok(ListResponse { data: ListData { list: Vec::new(), total: 0 } }),
        }
    }
}

/// Yields until `api` has seen `n` calls.
pub async fn until_calls(api: &StubApi, n: usize) {
    while api.calls().len() < n {
        tokio::task::yield_now().await;
    }
}
