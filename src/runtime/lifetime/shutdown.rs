use std::time::Duration;

use tokio::signal;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 10;

pub async fn listen_for_shutdown(tasks: Vec<JoinHandle<()>>) {
    // 等待 Ctrl+C 信号
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, stopping background tasks...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    let shutdown_result = timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        stop_background_tasks(tasks),
    )
    .await;

    match shutdown_result {
        Ok(count) => {
            info!("Stopped {} background tasks", count);
        }
        Err(_) => {
            error!(
                "Shutdown tasks timed out after {} seconds! Forcing exit.",
                SHUTDOWN_TIMEOUT_SECS
            );
            std::process::exit(1);
        }
    }
}

/// 终止 reload / purge 任务并等待其退出
async fn stop_background_tasks(tasks: Vec<JoinHandle<()>>) -> usize {
    let count = tasks.len();
    for task in tasks {
        task.abort();
        // 被 abort 的任务返回 cancelled，属于正常情况
        if let Err(e) = task.await
            && !e.is_cancelled()
        {
            warn!("Background task ended abnormally: {}", e);
        }
    }
    count
}
