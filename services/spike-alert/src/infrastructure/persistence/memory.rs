//! 内存实现
//!
//! 所有判断在同一把锁内完成，语义与 PostgreSQL 的唯一约束和预留表一致。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tellspike_common::{PagedResult, Pagination};
use tellspike_errors::{AppError, AppResult};
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    AlertFilter, AlertRecord, AlertRecordRepository, DedupeKey, DispatchStatus, InsertOutcome,
    MetricName, MetricSample, NetworkId, SampleSource,
};

#[derive(Default)]
struct AlertState {
    records: Vec<AlertRecord>,
    reservations: HashMap<DedupeKey, DateTime<Utc>>,
}

impl AlertState {
    fn has_sent(&self, key: &DedupeKey) -> bool {
        self.records
            .iter()
            .any(|r| r.dispatch_status() == DispatchStatus::Sent && &r.dedupe_key() == key)
    }
}

/// 内存告警存储
#[derive(Default)]
pub struct InMemoryAlertStore {
    state: Mutex<AlertState>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全部记录，按写入顺序
    pub async fn records(&self) -> Vec<AlertRecord> {
        self.state.lock().await.records.clone()
    }

    pub async fn reservation_count(&self) -> usize {
        self.state.lock().await.reservations.len()
    }
}

#[async_trait]
impl AlertRecordRepository for InMemoryAlertStore {
    async fn has_sent(&self, key: &DedupeKey) -> AppResult<bool> {
        Ok(self.state.lock().await.has_sent(key))
    }

    async fn try_reserve(&self, key: &DedupeKey, lease: Duration) -> AppResult<bool> {
        let lease = chrono::Duration::from_std(lease)
            .map_err(|e| AppError::internal(format!("Invalid reservation lease: {}", e)))?;
        let now = Utc::now();

        let mut state = self.state.lock().await;
        if state.has_sent(key) {
            return Ok(false);
        }
        if state
            .reservations
            .get(key)
            .is_some_and(|expires_at| *expires_at >= now)
        {
            return Ok(false);
        }
        state.reservations.insert(key.clone(), now + lease);
        Ok(true)
    }

    async fn release(&self, key: &DedupeKey) -> AppResult<()> {
        self.state.lock().await.reservations.remove(key);
        Ok(())
    }

    async fn insert(&self, record: &AlertRecord) -> AppResult<InsertOutcome> {
        let mut state = self.state.lock().await;
        if record.dispatch_status() == DispatchStatus::Sent && state.has_sent(&record.dedupe_key()) {
            return Ok(InsertOutcome::Duplicate);
        }
        state.records.push(record.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn list(
        &self,
        filter: &AlertFilter,
        pagination: Pagination,
    ) -> AppResult<PagedResult<AlertRecord>> {
        let state = self.state.lock().await;
        let mut matched: Vec<&AlertRecord> =
            state.records.iter().filter(|r| filter.matches(r)).collect();
        matched.sort_by(|a, b| {
            b.period()
                .cmp(&a.period())
                .then(b.created_at().cmp(&a.created_at()))
        });

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(usize::try_from(pagination.offset()).unwrap_or(usize::MAX))
            .take(pagination.limit() as usize)
            .cloned()
            .collect();
        Ok(PagedResult::new(items, total, &pagination))
    }
}

/// 内存样本来源
#[derive(Default)]
pub struct InMemorySampleSource {
    samples: RwLock<HashMap<(NetworkId, MetricName, NaiveDate), MetricSample>>,
}

impl InMemorySampleSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入或覆盖一个样本
    pub async fn insert(&self, sample: MetricSample) {
        let key = (
            sample.network.clone(),
            sample.metric_name.clone(),
            sample.period,
        );
        self.samples.write().await.insert(key, sample);
    }
}

#[async_trait]
impl SampleSource for InMemorySampleSource {
    async fn get_sample(
        &self,
        network: &NetworkId,
        metric_name: &MetricName,
        period: NaiveDate,
    ) -> AppResult<Option<MetricSample>> {
        let key = (network.clone(), metric_name.clone(), period);
        Ok(self.samples.read().await.get(&key).cloned())
    }
}
