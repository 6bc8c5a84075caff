//! 集成测试共用的夹具

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use spike_alert::application::{
    AlertDispatcher, AlertMessageFormatter, DeduplicationGuard, DetectorSettings, ServiceHandler,
    SpikeDetector,
};
use spike_alert::domain::{
    AlertRecordRepository, MetricName, MetricSample, NetworkId, SampleSource, ThresholdPolicy,
};
use spike_alert::infrastructure::persistence::{InMemoryAlertStore, InMemorySampleSource};
use tellspike_errors::{AppError, AppResult};
use tellspike_ports::{NotificationSink, SentMessage};
use tokio_util::sync::CancellationToken;

pub const DASHBOARD_URL: &str = "https://dash.example.com";

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

pub fn network(name: &str) -> NetworkId {
    NetworkId::new(name).unwrap()
}

pub fn metric(name: &str) -> MetricName {
    MetricName::new(name).unwrap()
}

pub fn pair(n: &str, m: &str) -> (NetworkId, MetricName) {
    (network(n), metric(m))
}

/// 按脚本返回结果的通知渠道，记录所有收到的文本
pub struct ScriptedSink {
    configured: bool,
    failures_left: AtomicUsize,
    delay: Option<Duration>,
    sent: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl ScriptedSink {
    pub fn new() -> Self {
        Self {
            configured: true,
            failures_left: AtomicUsize::new(0),
            delay: None,
            sent: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    /// 前 n 次发送返回错误
    pub fn failing(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for ScriptedSink {
    async fn send(&self, text: &str) -> AppResult<SentMessage> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(AppError::external_service("Telegram API error 502: Bad Gateway"));
        }
        self.sent.lock().unwrap().push(text.to_string());
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(SentMessage::new(id.to_string()))
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// 内存存储 + 内存样本 + 脚本通知渠道
pub struct Fixture {
    pub store: Arc<InMemoryAlertStore>,
    pub source: Arc<InMemorySampleSource>,
    pub sink: Arc<ScriptedSink>,
}

impl Fixture {
    pub fn new(sink: ScriptedSink) -> Self {
        Self {
            store: Arc::new(InMemoryAlertStore::new()),
            source: Arc::new(InMemorySampleSource::new()),
            sink: Arc::new(sink),
        }
    }

    pub async fn seed(&self, n: &str, m: &str, period: NaiveDate, value: Decimal) {
        self.source
            .insert(MetricSample::new(network(n), metric(m), period, value))
            .await;
    }

    pub async fn seed_pair(&self, n: &str, m: &str, previous: Decimal, current: Decimal) {
        self.seed(n, m, day(1), previous).await;
        self.seed(n, m, day(2), current).await;
    }

    pub fn detector(&self, threshold: Decimal) -> SpikeDetector {
        build_detector(
            self.store.clone(),
            self.source.clone(),
            self.sink.clone(),
            threshold,
            DetectorSettings::default(),
        )
    }

    pub fn handler(&self, threshold: Decimal, pairs: Vec<(NetworkId, MetricName)>) -> ServiceHandler {
        self.handler_with_token(threshold, pairs, CancellationToken::new())
    }

    pub fn handler_with_token(
        &self,
        threshold: Decimal,
        pairs: Vec<(NetworkId, MetricName)>,
        cancel: CancellationToken,
    ) -> ServiceHandler {
        let repo: Arc<dyn AlertRecordRepository> = self.store.clone();
        ServiceHandler::new(
            Arc::new(self.detector(threshold)),
            repo,
            self.sink.clone(),
            Arc::new(AlertMessageFormatter::new(DASHBOARD_URL).unwrap()),
            pairs,
            cancel,
        )
    }
}

pub fn build_detector(
    repo: Arc<dyn AlertRecordRepository>,
    source: Arc<dyn SampleSource>,
    sink: Arc<dyn NotificationSink>,
    threshold: Decimal,
    settings: DetectorSettings,
) -> SpikeDetector {
    let policy = ThresholdPolicy::new(threshold, Vec::<(NetworkId, Decimal)>::new()).unwrap();
    let formatter = Arc::new(AlertMessageFormatter::new(DASHBOARD_URL).unwrap());
    let guard = DeduplicationGuard::new(repo.clone(), Duration::from_secs(600));
    let dispatcher = AlertDispatcher::new(sink, repo, guard.clone(), formatter);
    SpikeDetector::new(source, policy, guard, dispatcher, settings)
}
