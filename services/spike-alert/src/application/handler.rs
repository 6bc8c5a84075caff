//! Business logic handler

use std::sync::Arc;

use rust_decimal::Decimal;
use tellspike_common::PagedResult;
use tellspike_errors::{AppError, AppResult};
use tellspike_ports::{NotificationSink, SentMessage};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::commands::RunDetectorCommand;
use super::detector::{RunSummary, SpikeDetector};
use super::formatter::AlertMessageFormatter;
use super::queries::ListAlertsQuery;
use crate::domain::{AlertRecord, AlertRecordRepository, MetricName, NetworkId};

pub struct ServiceHandler {
    detector: Arc<SpikeDetector>,
    repo: Arc<dyn AlertRecordRepository>,
    sink: Arc<dyn NotificationSink>,
    formatter: Arc<AlertMessageFormatter>,
    pairs: Vec<(NetworkId, MetricName)>,
    cancel: CancellationToken,
}

impl ServiceHandler {
    pub fn new(
        detector: Arc<SpikeDetector>,
        repo: Arc<dyn AlertRecordRepository>,
        sink: Arc<dyn NotificationSink>,
        formatter: Arc<AlertMessageFormatter>,
        pairs: Vec<(NetworkId, MetricName)>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            detector,
            repo,
            sink,
            formatter,
            pairs,
            cancel,
        }
    }

    pub fn pairs(&self) -> &[(NetworkId, MetricName)] {
        &self.pairs
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// 查询告警历史
    pub async fn list_alerts(&self, query: ListAlertsQuery) -> AppResult<PagedResult<AlertRecord>> {
        if !query.filter.range.is_valid() {
            return Err(AppError::validation("`from` must not be after `to`"));
        }
        self.repo.list(&query.filter, query.pagination).await
    }

    /// 运行一次检测
    pub async fn run_detector(&self, cmd: RunDetectorCommand) -> RunSummary {
        match cmd.period {
            Some(period) => {
                self.detector
                    .run_for_period(&self.pairs, period, &self.cancel)
                    .await
            }
            None => self.detector.run(&self.pairs, &self.cancel).await,
        }
    }

    /// 发送连通性测试消息
    pub async fn send_test_message(&self) -> AppResult<SentMessage> {
        if !self.sink.is_configured() {
            return Err(AppError::config(format!(
                "{} notification sink is not configured",
                self.sink.name()
            )));
        }

        let text = self.formatter.format_test_message(&self.triggers())?;
        let sent = self.sink.send(&text).await?;
        info!(message_id = %sent.message_id, "Test message sent");
        Ok(sent)
    }

    /// 每个监控网络及其阈值，保持配置顺序
    fn triggers(&self) -> Vec<(NetworkId, Decimal)> {
        let policy = self.detector.policy();
        let mut triggers: Vec<(NetworkId, Decimal)> = Vec::new();
        for (network, metric_name) in &self.pairs {
            if triggers.iter().any(|(seen, _)| seen == network) {
                continue;
            }
            triggers.push((network.clone(), policy.threshold_for(network, metric_name)));
        }
        triggers
    }
}
