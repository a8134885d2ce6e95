use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::api::ApiService;
use crate::dispatch::Category;
use crate::errors::ServiceError;
use crate::pagination::ListResponse;

/// 各操作对应的后端路径（均为 POST + JSON 载荷）
pub fn route(category: Category) -> &'static str {
    match category {
        Category::Create => "/api/create",
        Category::Delete => "/api/delete",
        Category::BatchDelete => "/api/batchDelete",
        Category::Update => "/api/update",
        Category::UpdateApiStatus => "/api/updateStatus",
        Category::QueryList => "/api/queryList",
    }
}

/// reqwest-backed implementation of [`ApiService`].
///
/// Only a connect timeout is configured; requests wait until the backend answers.
#[derive(Clone)]
pub struct HttpApiService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApiService {
    pub fn new(base_url: impl Into<String>, connect_timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(ServiceError::backend)?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str { &self.base_url }

    #[instrument(skip(self, payload))]
    async fn post(&self, category: Category, payload: &Value) -> Result<reqwest::Response, ServiceError> {
        let url = format!("{}{}", self.base_url, route(category));
        let resp = self.client.post(&url).json(payload).send().await.map_err(ServiceError::backend)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ServiceError::BackendCallFailed(format!("{status}: {body}")));
        }
        debug!(%url, %status, "backend call ok");
        Ok(resp)
    }

    async fn send(&self, category: Category, payload: &Value) -> Result<(), ServiceError> {
        self.post(category, payload).await.map(|_| ())
    }
}

#[async_trait]
impl ApiService for HttpApiService {
    async fn create(&self, payload: &Value) -> Result<(), ServiceError> {
        self.send(Category::Create, payload).await
    }

    async fn remove(&self, payload: &Value) -> Result<(), ServiceError> {
        self.send(Category::Delete, payload).await
    }

    async fn batch_remove(&self, payload: &Value) -> Result<(), ServiceError> {
        self.send(Category::BatchDelete, payload).await
    }

    async fn update(&self, payload: &Value) -> Result<(), ServiceError> {
        self.send(Category::Update, payload).await
    }

    async fn update_status(&self, payload: &Value) -> Result<(), ServiceError> {
        self.send(Category::UpdateApiStatus, payload).await
    }

    async fn query_list(&self, payload: &Value) -> Result<ListResponse, ServiceError> {
        let resp = self.post(Category::QueryList, payload).await?;
        resp.json::<ListResponse>().await.map_err(ServiceError::backend)
    }
}
