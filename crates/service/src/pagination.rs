//! Pagination utilities for the query-list worker
//!
//! Echoes the request's `page` / `pageSize` back alongside the backend total.
//!
//! Page numbers are positive integers. A value that is present but not one
//! (`0`, `"0"`, negatives, fractions, non-numeric strings, `null`) is treated
//! as absent and replaced by the configured default, so a published
//! pagination never carries a page the list view cannot request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 分页缺省值：请求未携带时使用
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListDefaults {
    /// 1-based page index
    pub page: u64,
    pub page_size: u64,
}

impl Default for ListDefaults {
    fn default() -> Self { Self { page: 1, page_size: 10 } }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

impl Pagination {
    /// 从请求载荷回显分页参数；`total` 原样取自后端
    pub fn echo(payload: &Value, defaults: ListDefaults, total: u64) -> Self {
        Self {
            page: positive_number(payload.get("page")).unwrap_or(defaults.page),
            page_size: positive_number(payload.get("pageSize")).unwrap_or(defaults.page_size),
            total,
        }
    }
}

/// 数字或数字字符串；0、负数、非数字视为缺省
fn positive_number(value: Option<&Value>) -> Option<u64> {
    let n = match value? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64().filter(|f| f.fract() == 0.0 && *f > 0.0).map(|f| f as u64)
        })?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    (n > 0).then_some(n)
}

/// 后端 queryList 响应：`{ data: { list, total } }`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
    pub data: ListData,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ListData {
    pub list: Vec<Value>,
    #[serde(default)]
    pub total: u64,
}

/// 发布给状态容器的列表结果
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListResult {
    pub items: Vec<Value>,
    pub pagination: Pagination,
}

impl ListResult {
    pub fn from_response(payload: &Value, response: ListResponse, defaults: ListDefaults) -> Self {
        let pagination = Pagination::echo(payload, defaults, response.data.total);
        Self { items: response.data.list, pagination }
    }
}
