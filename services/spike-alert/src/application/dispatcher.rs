//! 告警发送

use std::sync::Arc;

use tellspike_ports::NotificationSink;
use tracing::{error, info, warn};

use super::dedup_guard::DeduplicationGuard;
use super::formatter::AlertMessageFormatter;
use crate::domain::{AlertRecord, AlertRecordRepository, InsertOutcome, MetricChange};
use crate::error::SpikeError;

const SINK_NOT_CONFIGURED: &str = "notification sink not configured";

/// 格式化、发送并记录一条告警
pub struct AlertDispatcher {
    sink: Arc<dyn NotificationSink>,
    repo: Arc<dyn AlertRecordRepository>,
    guard: DeduplicationGuard,
    formatter: Arc<AlertMessageFormatter>,
}

impl AlertDispatcher {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        repo: Arc<dyn AlertRecordRepository>,
        guard: DeduplicationGuard,
        formatter: Arc<AlertMessageFormatter>,
    ) -> Self {
        Self {
            sink,
            repo,
            guard,
            formatter,
        }
    }

    /// 返回 sent 或 skipped 记录
    ///
    /// 发送成功后不释放预留，sent 记录和未到期的预留共同阻止重复发送。
    ///
    /// - 预留失败（已发送/他人发送中）：`DuplicateAlert`
    /// - 存储不可用：`StoreFailure`，不发送
    /// - 通知失败：写入 failed 记录并释放预留，返回 `DispatchFailure`
    pub async fn dispatch(&self, change: &MetricChange) -> Result<AlertRecord, SpikeError> {
        let key = change.dedupe_key();

        if !self.sink.is_configured() {
            let record = AlertRecord::skipped(change, SINK_NOT_CONFIGURED);
            self.insert(&record).await?;
            warn!(key = %key, sink = self.sink.name(), "Alert not sent, sink not configured");
            return Ok(record);
        }

        let text = self
            .formatter
            .format_alert(change)
            .map_err(|e| SpikeError::Internal(e.to_string()))?;

        if !self.guard.reserve(&key).await? {
            info!(key = %key, "Alert reserved or sent by another run");
            return Err(SpikeError::DuplicateAlert(key.to_string()));
        }

        match self.sink.send(&text).await {
            Ok(sent) => {
                let record = AlertRecord::sent(change, sent.message_id);
                match self.insert(&record).await {
                    Ok(InsertOutcome::Inserted) => {
                        // 预留保留到租约到期：释放后另一个运行可能在 sent 记录可见前重新预留
                        info!(
                            key = %key,
                            alert_id = %record.id(),
                            message_id = record.dispatch_reference().unwrap_or_default(),
                            "Spike alert sent"
                        );
                        Ok(record)
                    }
                    Ok(InsertOutcome::Duplicate) => {
                        self.guard.release(&key).await;
                        error!(key = %key, "Alert delivered but a sent record already exists");
                        Err(SpikeError::DuplicateAlert(key.to_string()))
                    }
                    Err(e) => {
                        // 保留预留，租约内不会重复发送
                        error!(key = %key, error = %e, "Alert delivered but not recorded");
                        Err(e)
                    }
                }
            }
            Err(e) => {
                let reason = e.to_string();
                let record = AlertRecord::failed(change, &reason);
                if let Err(store_err) = self.insert(&record).await {
                    warn!(key = %key, error = %store_err, "Failed to record dispatch failure");
                }
                self.guard.release(&key).await;
                warn!(key = %key, reason = %reason, "Spike alert dispatch failed");
                Err(SpikeError::DispatchFailure(reason))
            }
        }
    }

    async fn insert(&self, record: &AlertRecord) -> Result<InsertOutcome, SpikeError> {
        self.repo.insert(record).await.map_err(|e| {
            SpikeError::store_failure(format!(
                "insert {} record for {}: {}",
                record.dispatch_status(),
                record.dedupe_key(),
                e
            ))
        })
    }
}
