//! Service layer for the API management console.
//! - `dispatch`: latest-wins orchestration of CRUD intents against the backend.
//! - `api`: backend service contract and its HTTP implementation.
//! - Clear error types shared by both.

pub mod api;
pub mod dispatch;
pub mod errors;
pub mod observability;
pub mod pagination;
#[cfg(test)]
pub mod test_support;
