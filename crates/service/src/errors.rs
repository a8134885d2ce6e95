use thiserror::Error;

use crate::dispatch::Category;

/// 后端调用失败：本层不区分网络、校验或服务端错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("backend call failed: {0}")]
    BackendCallFailed(String),
}

impl ServiceError {
    pub fn backend(cause: impl ToString) -> Self { Self::BackendCallFailed(cause.to_string()) }

    /// 原始错误描述，用于失败提示
    pub fn cause(&self) -> &str {
        match self {
            Self::BackendCallFailed(cause) => cause,
        }
    }
}

/// 调度器使用错误：在进入 worker 之前返回给调用方
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no handler registered for {0}")]
    Unregistered(Category),
    #[error("dispatch requires a running tokio runtime")]
    NoRuntime,
}
