use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use service::api::HttpApiService;
use service::dispatch::{ChannelSink, Intent, IntentMessage, Orchestrator, OrchestratorOptions};
use service::pagination::ListDefaults;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

fn load_config() -> anyhow::Result<configs::AppConfig> {
    // 优先 config.toml；文件不存在时退回默认值 + 环境变量
    match configs::load_default() {
        Ok(mut cfg) => {
            cfg.normalize_and_validate()?;
            Ok(cfg)
        }
        Err(e) => {
            let mut cfg = configs::AppConfig::default();
            cfg.normalize_and_validate()
                .map_err(|v| anyhow::anyhow!("{v} (config file unavailable: {e})"))?;
            Ok(cfg)
        }
    }
}

fn main() -> std::process::ExitCode {
    // 提前加载 .env，使得 RUST_LOG / BACKEND_BASE_URL 等环境变量生效
    dotenv().ok();
    let cfg = load_config();
    let json_logs = cfg.as_ref().map(|c| c.logging.json).unwrap_or(false);
    common::utils::logging::init_logging(json_logs);
    info!(service = "console", event = "logger_init", "tracing subscriber initialized");

    let cfg = match cfg {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service = "console", event = "config_invalid", error = %e, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };

    let session_id = Uuid::new_v4();
    let pid = std::process::id();

    // Panic 钩子：捕获异常并输出错误日志，便于排查问题
    std::panic::set_hook(Box::new(move |info| {
        error!(service = "console", event = "panic", %session_id, pid, message = %info, "unhandled panic occurred");
    }));

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "console", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "console",
        event = "start",
        %session_id,
        pid,
        version = env!("CARGO_PKG_VERSION"),
        backend = %cfg.backend.base_url,
        "intent console starting"
    );

    let result = rt.block_on(run(cfg));
    // stdin 读取占用阻塞线程，不等待其返回
    rt.shutdown_background();

    match result {
        Ok(()) => {
            info!(service = "console", event = "stop", %session_id, "console stopped normally");
            std::process::ExitCode::SUCCESS
        }
        Err(e) => {
            error!(service = "console", event = "run_failed", error = %e, "console exited with error");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn run(cfg: configs::AppConfig) -> anyhow::Result<()> {
    let api = HttpApiService::new(
        cfg.backend.base_url.clone(),
        Duration::from_secs(cfg.backend.connect_timeout_secs),
    )?;
    let (sink, mut events) = ChannelSink::new();
    let options = OrchestratorOptions {
        list_defaults: ListDefaults {
            page: cfg.orchestrator.default_page,
            page_size: cfg.orchestrator.default_page_size,
        },
    };
    let orchestrator = Orchestrator::with_options(Arc::new(sink), options);
    orchestrator.register_builtin(Arc::new(api));
    let (intents, watcher) = orchestrator.spawn_watcher(cfg.orchestrator.intent_queue_capacity)?;

    // 事件输出：每个 UiEvent 一行 JSON
    let printer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => {
                    if stdout.write_all(format!("{line}\n").as_bytes()).await.is_err() {
                        break;
                    }
                    let _ = stdout.flush().await;
                }
                Err(e) => warn!(error = %e, "event encode failed"),
            }
        }
    });

    let reader = async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<IntentMessage>(line) {
                Ok(msg) => {
                    if intents.send(Intent::from(msg)).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, input = %line, "invalid intent message"),
            }
        }
        // 关闭意图流，watcher 随之退出
        drop(intents);
        anyhow::Ok(())
    };

    tokio::select! {
        res = reader => {
            res?;
            // 输入结束：等待在途 worker 完成
            let _ = watcher.await;
            orchestrator.wait_idle().await;
        }
        _ = tokio::signal::ctrl_c() => {
            info!(service = "console", event = "shutdown_signal", "received Ctrl+C, cancelling workers");
            watcher.abort();
            // watcher 退出后不会再有新槽位，shutdown 才能覆盖全部 worker
            let _ = watcher.await;
            orchestrator.shutdown().await;
        }
    }

    debug!(metrics = %service::observability::encode_metrics(), "final worker metrics");
    drop(orchestrator);
    let _ = printer.await;
    Ok(())
}
