//! Metrics 记录器
//!
//! 持有 Prometheus handle，并定期采集连接池状态

use std::time::Duration;

use metrics::gauge;
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Prometheus 记录器
#[derive(Clone, Default)]
pub struct MetricsRecorder {
    handle: Option<PrometheusHandle>,
}

impl MetricsRecorder {
    /// 安装全局 recorder；`enabled` 为 false 或安装失败时 /metrics 返回空
    pub fn install(enabled: bool) -> Self {
        if !enabled {
            return Self::disabled();
        }
        match tellspike_telemetry::init_metrics() {
            Ok(handle) => Self {
                handle: Some(handle),
            },
            Err(e) => {
                warn!(error = %e, "Failed to install Prometheus recorder");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self { handle: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }

    /// 以 Prometheus 文本格式导出
    pub fn render(&self) -> String {
        self.handle
            .as_ref()
            .map(PrometheusHandle::render)
            .unwrap_or_default()
    }
}

/// 设置连接池大小
pub fn set_pool_size(pool_name: &str, size: u32) {
    let labels = [("pool", pool_name.to_string())];
    gauge!("connection_pool_size", &labels).set(size as f64);
}

/// 设置空闲连接数
pub fn set_idle_connections(pool_name: &str, idle: usize) {
    let labels = [("pool", pool_name.to_string())];
    gauge!("connection_pool_idle", &labels).set(idle as f64);
}

/// 启动连接池采集任务，token 取消后退出
pub fn spawn_pool_metrics(
    pool: PgPool,
    interval: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Pool metrics collector stopped");
                    break;
                }
                _ = ticker.tick() => {
                    set_pool_size("postgres", pool.size());
                    set_idle_connections("postgres", pool.num_idle());
                }
            }
        }
    })
}
