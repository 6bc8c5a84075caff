//! 告警发送：存储故障与通知渠道交互

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{DASHBOARD_URL, day, metric, network};
use mockall::mock;
use rust_decimal_macros::dec;
use spike_alert::application::{AlertDispatcher, AlertMessageFormatter, DeduplicationGuard};
use spike_alert::domain::{
    AlertFilter, AlertRecord, AlertRecordRepository, ChangeComputer, DedupeKey, DispatchStatus,
    InsertOutcome, MetricChange, MetricSample,
};
use spike_alert::error::SpikeError;
use spike_alert::infrastructure::persistence::InMemoryAlertStore;
use tellspike_common::{PagedResult, Pagination};
use tellspike_errors::{AppError, AppResult};
use tellspike_ports::{NotificationSink, SentMessage};

mock! {
    pub Sink {}

    #[async_trait]
    impl NotificationSink for Sink {
        async fn send(&self, text: &str) -> AppResult<SentMessage>;
        fn is_configured(&self) -> bool;
        fn name(&self) -> &str;
    }
}

/// 预留与写入都失败的存储
struct UnavailableStore;

#[async_trait]
impl AlertRecordRepository for UnavailableStore {
    async fn has_sent(&self, _key: &DedupeKey) -> AppResult<bool> {
        Ok(false)
    }

    async fn try_reserve(&self, _key: &DedupeKey, _lease: Duration) -> AppResult<bool> {
        Err(AppError::database("connection pool timed out"))
    }

    async fn release(&self, _key: &DedupeKey) -> AppResult<()> {
        Ok(())
    }

    async fn insert(&self, _record: &AlertRecord) -> AppResult<InsertOutcome> {
        Err(AppError::database("connection pool timed out"))
    }

    async fn list(
        &self,
        _filter: &AlertFilter,
        _pagination: Pagination,
    ) -> AppResult<PagedResult<AlertRecord>> {
        Err(AppError::database("connection pool timed out"))
    }
}

fn spike() -> MetricChange {
    let prev = MetricSample::new(network("kelkoo"), metric("revenue"), day(1), dec!(1000));
    let cur = MetricSample::new(network("kelkoo"), metric("revenue"), day(2), dec!(1500));
    ChangeComputer::compute(&prev, &cur, Utc::now()).unwrap()
}

fn dispatcher(sink: MockSink, repo: Arc<dyn AlertRecordRepository>) -> AlertDispatcher {
    let guard = DeduplicationGuard::new(repo.clone(), Duration::from_secs(600));
    let formatter = Arc::new(AlertMessageFormatter::new(DASHBOARD_URL).unwrap());
    AlertDispatcher::new(Arc::new(sink), repo, guard, formatter)
}

#[tokio::test]
async fn test_store_failure_aborts_before_sending() {
    let mut sink = MockSink::new();
    sink.expect_is_configured().return_const(true);
    sink.expect_send().never();

    let err = dispatcher(sink, Arc::new(UnavailableStore))
        .dispatch(&spike())
        .await
        .unwrap_err();

    assert!(matches!(err, SpikeError::StoreFailure(_)));
}

#[tokio::test]
async fn test_sent_alert_contains_formatted_message() {
    let mut sink = MockSink::new();
    sink.expect_is_configured().return_const(true);
    sink.expect_send()
        .times(1)
        .withf(|text| {
            text.starts_with("*SPIKE ALERT* [SPIKE UP]")
                && text.contains("*Metric:* Revenue")
                && text.contains("*Previous:* 1,000.00")
                && text.contains("*Current:* 1,500.00")
                && text.contains("https://dash.example.com/dashboard/alerts")
        })
        .returning(|_| Ok(SentMessage::new("777")));

    let store = Arc::new(InMemoryAlertStore::new());
    let record = dispatcher(sink, store.clone()).dispatch(&spike()).await.unwrap();

    assert_eq!(record.dispatch_status(), DispatchStatus::Sent);
    assert_eq!(record.dispatch_reference(), Some("777"));
    assert_eq!(store.records().await, vec![record]);
    assert_eq!(store.reservation_count().await, 1);
}

#[tokio::test]
async fn test_reserved_key_is_not_sent_twice() {
    let mut sink = MockSink::new();
    sink.expect_is_configured().return_const(true);
    sink.expect_send().never();

    let store = Arc::new(InMemoryAlertStore::new());
    let change = spike();
    assert!(
        store
            .try_reserve(&change.dedupe_key(), Duration::from_secs(600))
            .await
            .unwrap()
    );

    let err = dispatcher(sink, store.clone()).dispatch(&change).await.unwrap_err();
    assert!(matches!(err, SpikeError::DuplicateAlert(_)));
    assert!(store.records().await.is_empty());
}

#[tokio::test]
async fn test_rejected_send_writes_failed_record() {
    let mut sink = MockSink::new();
    sink.expect_is_configured().return_const(true);
    sink.expect_send()
        .times(1)
        .returning(|_| Err(AppError::external_service("Telegram API error 400: chat not found")));

    let store = Arc::new(InMemoryAlertStore::new());
    let err = dispatcher(sink, store.clone()).dispatch(&spike()).await.unwrap_err();

    assert!(matches!(err, SpikeError::DispatchFailure(ref reason) if reason.contains("chat not found")));
    let records = store.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].dispatch_status(), DispatchStatus::Failed);
    assert!(records[0].failure_reason().unwrap().contains("chat not found"));
    assert_eq!(store.reservation_count().await, 0);
}

#[tokio::test]
async fn test_unconfigured_sink_is_never_called() {
    let mut sink = MockSink::new();
    sink.expect_is_configured().return_const(false);
    sink.expect_name().return_const("mock".to_string());
    sink.expect_send().never();

    let store = Arc::new(InMemoryAlertStore::new());
    let record = dispatcher(sink, store.clone()).dispatch(&spike()).await.unwrap();

    assert_eq!(record.dispatch_status(), DispatchStatus::Skipped);
    assert!(!store.has_sent(&record.dedupe_key()).await.unwrap());
}

/// 预留正常，sent 记录写入失败的存储
struct LosesSentRecords {
    inner: InMemoryAlertStore,
}

#[async_trait]
impl AlertRecordRepository for LosesSentRecords {
    async fn has_sent(&self, key: &DedupeKey) -> AppResult<bool> {
        self.inner.has_sent(key).await
    }

    async fn try_reserve(&self, key: &DedupeKey, lease: Duration) -> AppResult<bool> {
        self.inner.try_reserve(key, lease).await
    }

    async fn release(&self, key: &DedupeKey) -> AppResult<()> {
        self.inner.release(key).await
    }

    async fn insert(&self, record: &AlertRecord) -> AppResult<InsertOutcome> {
        if record.dispatch_status() == DispatchStatus::Sent {
            return Err(AppError::database("connection reset by peer"));
        }
        self.inner.insert(record).await
    }

    async fn list(
        &self,
        filter: &AlertFilter,
        pagination: Pagination,
    ) -> AppResult<PagedResult<AlertRecord>> {
        self.inner.list(filter, pagination).await
    }
}

#[tokio::test]
async fn test_unrecorded_send_keeps_reservation_and_blocks_resend() {
    let mut sink = MockSink::new();
    sink.expect_is_configured().return_const(true);
    sink.expect_send()
        .times(1)
        .returning(|_| Ok(SentMessage::new("901")));

    let store = Arc::new(LosesSentRecords {
        inner: InMemoryAlertStore::new(),
    });
    let dispatcher = dispatcher(sink, store.clone());
    let change = spike();

    let err = dispatcher.dispatch(&change).await.unwrap_err();
    assert!(matches!(err, SpikeError::StoreFailure(_)));
    assert_eq!(store.inner.reservation_count().await, 1);

    let err = dispatcher.dispatch(&change).await.unwrap_err();
    assert!(matches!(err, SpikeError::DuplicateAlert(_)));
    assert!(store.inner.records().await.is_empty());
}

#[tokio::test]
async fn test_sent_key_stays_blocked_after_success() {
    let mut sink = MockSink::new();
    sink.expect_is_configured().return_const(true);
    sink.expect_send()
        .times(1)
        .returning(|_| Ok(SentMessage::new("902")));

    let store = Arc::new(InMemoryAlertStore::new());
    let dispatcher = dispatcher(sink, store.clone());
    let change = spike();

    dispatcher.dispatch(&change).await.unwrap();
    let err = dispatcher.dispatch(&change).await.unwrap_err();
    assert!(matches!(err, SpikeError::DuplicateAlert(_)));

    // 即使预留已过期，sent 记录也阻止重新预留
    assert!(!store.try_reserve(&change.dedupe_key(), Duration::ZERO).await.unwrap());
    assert_eq!(store.records().await.len(), 1);
}
