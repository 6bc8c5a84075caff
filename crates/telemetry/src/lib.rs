//! telemetry - 可观测性库

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// 检测运行相关的指标名
pub mod names {
    pub const PAIRS_EVALUATED: &str = "spike_pairs_evaluated_total";
    pub const PAIRS_SKIPPED: &str = "spike_pairs_skipped_total";
    pub const ALERTS_SENT: &str = "spike_alerts_sent_total";
    pub const DISPATCH_FAILURES: &str = "spike_alert_dispatch_failures_total";
    pub const PAIR_ERRORS: &str = "spike_pair_errors_total";
    pub const RUN_DURATION: &str = "spike_run_duration_seconds";
}

/// 初始化 tracing（开发环境，可读格式）
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// 初始化 JSON 格式的 tracing（生产环境）
pub fn init_tracing_json(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .init();
}

/// 安装 Prometheus recorder，并注册检测指标的说明
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    metrics::describe_counter!(
        names::PAIRS_EVALUATED,
        "Number of (network, metric) pairs evaluated"
    );
    metrics::describe_counter!(
        names::PAIRS_SKIPPED,
        "Number of pairs skipped, labelled by reason"
    );
    metrics::describe_counter!(names::ALERTS_SENT, "Number of spike alerts delivered");
    metrics::describe_counter!(
        names::DISPATCH_FAILURES,
        "Number of spike alerts the notification sink rejected"
    );
    metrics::describe_counter!(
        names::PAIR_ERRORS,
        "Number of pairs that failed on invalid values or store errors"
    );
    metrics::describe_histogram!(
        names::RUN_DURATION,
        metrics::Unit::Seconds,
        "Wall time of one detector run"
    );
}
