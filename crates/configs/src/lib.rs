use anyhow::Result;
use serde::Deserialize;
use anyhow::anyhow;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 后端数据服务地址
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { base_url: String::new(), connect_timeout_secs: default_connect_timeout() }
    }
}

/// 调度器参数：意图队列容量与列表分页默认值
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_queue_capacity")]
    pub intent_queue_capacity: usize,
    #[serde(default = "default_page")]
    pub default_page: u64,
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            intent_queue_capacity: default_queue_capacity(),
            default_page: default_page(),
            default_page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub json: bool,
}

fn default_connect_timeout() -> u64 { 5 }
fn default_queue_capacity() -> usize { 64 }
fn default_page() -> u64 { 1 }
fn default_page_size() -> u64 { 10 }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    load_from_str(&content)
}

pub fn load_from_str(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        // 归一化 backend（支持从环境变量填充 URL）
        self.backend.normalize_from_env();
        self.backend.validate()?;
        self.orchestrator.validate()?;
        Ok(())
    }
}

impl BackendConfig {
    pub fn normalize_from_env(&mut self) {
        // 若 TOML 中未提供 URL，则尝试从环境变量填充
        if self.base_url.trim().is_empty() {
            if let Ok(url) = std::env::var("BACKEND_BASE_URL") {
                self.base_url = url;
            }
        }
        self.base_url = self.base_url.trim().trim_end_matches('/').to_string();
    }

    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(anyhow!("backend.base_url 为空；请在 config.toml 或环境变量 BACKEND_BASE_URL 中提供"));
        }
        let lower = self.base_url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("backend.base_url 必须以 http:// 或 https:// 开头"));
        }
        if self.connect_timeout_secs == 0 {
            return Err(anyhow!("backend.connect_timeout_secs 必须为正整数秒"));
        }
        Ok(())
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.intent_queue_capacity == 0 {
            return Err(anyhow!("orchestrator.intent_queue_capacity 必须 >= 1"));
        }
        if self.default_page == 0 || self.default_page_size == 0 {
            return Err(anyhow!("orchestrator 分页默认值必须 >= 1"));
        }
        Ok(())
    }
}
