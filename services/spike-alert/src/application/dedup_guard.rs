//! 告警去重

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::domain::{AlertRecordRepository, DedupeKey};
use crate::error::SpikeError;

/// 基于告警记录仓储的去重守卫
///
/// 查询只是快速路径；真正的互斥依赖存储层的预留行和 sent 唯一约束。
#[derive(Clone)]
pub struct DeduplicationGuard {
    repo: Arc<dyn AlertRecordRepository>,
    lease: Duration,
}

impl DeduplicationGuard {
    pub fn new(repo: Arc<dyn AlertRecordRepository>, lease: Duration) -> Self {
        Self { repo, lease }
    }

    pub async fn already_alerted(&self, key: &DedupeKey) -> Result<bool, SpikeError> {
        self.repo
            .has_sent(key)
            .await
            .map_err(|e| SpikeError::store_failure(format!("dedupe lookup for {}: {}", key, e)))
    }

    /// 预留发送权；false 表示已发送或另一个运行正在发送
    pub async fn reserve(&self, key: &DedupeKey) -> Result<bool, SpikeError> {
        self.repo
            .try_reserve(key, self.lease)
            .await
            .map_err(|e| SpikeError::store_failure(format!("reserve {}: {}", key, e)))
    }

    /// 释放失败只记日志，预留会在租约到期后失效
    pub async fn release(&self, key: &DedupeKey) {
        if let Err(e) = self.repo.release(key).await {
            warn!(key = %key, error = %e, "Failed to release dispatch reservation");
        }
    }
}
