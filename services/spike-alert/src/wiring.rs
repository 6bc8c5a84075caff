//! 组件装配

use std::sync::Arc;
use std::time::Duration;

use tellspike_config::AppConfig;
use tellspike_ports::NotificationSink;
use tokio_util::sync::CancellationToken;

use crate::application::{
    AlertDispatcher, AlertMessageFormatter, DeduplicationGuard, DetectorSettings, ServiceHandler,
    SpikeDetector,
};
use crate::domain::{AlertRecordRepository, MetricName, NetworkId, SampleSource, ThresholdPolicy};
use crate::error::SpikeError;

/// 配置中的 (network, metric) 组合
pub fn configured_pairs(config: &AppConfig) -> Result<Vec<(NetworkId, MetricName)>, SpikeError> {
    config
        .detector
        .pairs()
        .into_iter()
        .map(|(network, metric)| Ok((NetworkId::new(network)?, MetricName::new(metric)?)))
        .collect()
}

/// 由配置与注入的存储、样本来源、通知渠道构建处理器
pub fn build_handler(
    config: &AppConfig,
    repo: Arc<dyn AlertRecordRepository>,
    source: Arc<dyn SampleSource>,
    sink: Arc<dyn NotificationSink>,
    cancel: CancellationToken,
) -> Result<ServiceHandler, SpikeError> {
    let policy = ThresholdPolicy::from_config(&config.spike)?;
    let pairs = configured_pairs(config)?;
    let formatter = Arc::new(
        AlertMessageFormatter::new(&config.dashboard.base_url)
            .map_err(|e| SpikeError::invalid_config(e.to_string()))?,
    );

    let guard = DeduplicationGuard::new(
        repo.clone(),
        Duration::from_secs(config.detector.reservation_lease_secs),
    );
    let dispatcher = AlertDispatcher::new(sink.clone(), repo.clone(), guard.clone(), formatter.clone());
    let settings = DetectorSettings {
        concurrency: config.detector.concurrency,
        run_timeout: (config.detector.run_timeout_secs > 0)
            .then(|| Duration::from_secs(config.detector.run_timeout_secs)),
    };
    let detector = Arc::new(SpikeDetector::new(source, policy, guard, dispatcher, settings));

    Ok(ServiceHandler::new(detector, repo, sink, formatter, pairs, cancel))
}
