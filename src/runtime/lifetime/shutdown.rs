use tokio::signal;
use tracing::warn;

/// 等待停机信号后返回，由调用方停掉 HTTP 服务
///
/// 同时监听 Ctrl+C 与 SIGTERM，容器里收到 SIGTERM 也能让
/// 进行中的批改请求走完再退出。
pub async fn listen_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to listen for SIGTERM");
        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");

    warn!("Shutdown signal received, initiating graceful shutdown...");
}
