//! Backend data service contract consumed by the workers.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ServiceError;
use crate::pagination::ListResponse;

/// 后端 API 管理服务：每种操作一个方法
#[async_trait]
pub trait ApiService: Send + Sync {
    async fn create(&self, payload: &Value) -> Result<(), ServiceError>;
    async fn remove(&self, payload: &Value) -> Result<(), ServiceError>;
    async fn batch_remove(&self, payload: &Value) -> Result<(), ServiceError>;
    async fn update(&self, payload: &Value) -> Result<(), ServiceError>;
    async fn update_status(&self, payload: &Value) -> Result<(), ServiceError>;
    async fn query_list(&self, payload: &Value) -> Result<ListResponse, ServiceError>;
}

pub use http::HttpApiService;
