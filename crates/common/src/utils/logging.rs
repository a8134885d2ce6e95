use std::io;
use tracing_subscriber::{fmt, EnvFilter};

/// 默认过滤规则：业务层 `service` 输出 debug，其余 info
pub const DEFAULT_FILTER: &str = "info,service=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize tracing subscriber with compact, human readable output.
/// - Respects `RUST_LOG` if set, otherwise falls back to [`DEFAULT_FILTER`]
/// - Writes to stderr; stdout is reserved for console event output
pub fn init_logging_default() {
    let _ = fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .compact()
        .with_writer(io::stderr)
        .try_init();
}

/// Initialize tracing subscriber with JSON structured output.
pub fn init_logging_json() {
    let _ = fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .json()
        .with_writer(io::stderr)
        .try_init();
}

/// 根据配置选择日志格式；重复调用是安全的（`try_init` 忽略二次初始化）
pub fn init_logging(json: bool) {
    if json {
        init_logging_json();
    } else {
        init_logging_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_logging(false);
        init_logging(true);
        tracing::info!(event = "logger_test", "still usable after double init");
    }
}
