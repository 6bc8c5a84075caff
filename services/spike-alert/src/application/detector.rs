//! 突增检测编排
//!
//! 每个 (network, metric) 依次经过：取样 → 计算 → 阈值 → 去重 → 发送。
//! 不同组合之间并发执行，单个组合内部严格顺序。

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, NaiveDate, Utc};
use futures::{StreamExt, stream};
use metrics::{counter, histogram};
use rust_decimal::Decimal;
use serde::Serialize;
use tellspike_telemetry::names;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::dedup_guard::DeduplicationGuard;
use super::dispatcher::AlertDispatcher;
use crate::domain::{
    AlertId, ChangeComputer, DispatchStatus, MetricChange, MetricName, MetricSample, NetworkId,
    SampleSource, ThresholdPolicy,
};
use crate::error::SpikeError;

/// 单个组合的处理结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairStatus {
    Alerted {
        alert_id: AlertId,
        message_id: Option<String>,
    },
    /// 越线但通知渠道未配置，写入 skipped 记录
    NotConfigured { alert_id: AlertId },
    Flat,
    BelowThreshold { threshold: Decimal },
    Duplicate,
    InsufficientData { missing: NaiveDate },
    CurrencyMismatch { previous: String, current: String },
    DispatchFailed { reason: String },
    Error { kind: String, message: String },
    /// 运行被取消或超时，未开始评估
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct PairOutcome {
    pub network: NetworkId,
    pub metric_name: MetricName,
    pub period: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<MetricChange>,
    #[serde(flatten)]
    pub status: PairStatus,
}

impl PairOutcome {
    fn new(network: NetworkId, metric_name: MetricName, period: NaiveDate, status: PairStatus) -> Self {
        Self {
            network,
            metric_name,
            period,
            change: None,
            status,
        }
    }

    fn with_change(mut self, change: MetricChange) -> Self {
        self.change = Some(change);
        self
    }
}

/// 一次运行的汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub period: Option<NaiveDate>,
    pub started_at: Option<DateTime<Utc>>,
    pub evaluated: usize,
    pub alerted: usize,
    pub skipped_flat: usize,
    pub skipped_below_threshold: usize,
    pub skipped_duplicate: usize,
    pub skipped_insufficient_data: usize,
    pub skipped_currency_mismatch: usize,
    pub skipped_not_configured: usize,
    pub dispatch_failures: usize,
    pub errors: usize,
    pub cancelled: usize,
    pub outcomes: Vec<PairOutcome>,
}

impl RunSummary {
    pub fn from_outcomes(period: NaiveDate, started_at: DateTime<Utc>, outcomes: Vec<PairOutcome>) -> Self {
        let mut summary = Self {
            period: Some(period),
            started_at: Some(started_at),
            ..Default::default()
        };
        for outcome in &outcomes {
            match outcome.status {
                PairStatus::Cancelled => {
                    summary.cancelled += 1;
                    continue;
                }
                PairStatus::Alerted { .. } => summary.alerted += 1,
                PairStatus::NotConfigured { .. } => summary.skipped_not_configured += 1,
                PairStatus::Flat => summary.skipped_flat += 1,
                PairStatus::BelowThreshold { .. } => summary.skipped_below_threshold += 1,
                PairStatus::Duplicate => summary.skipped_duplicate += 1,
                PairStatus::InsufficientData { .. } => summary.skipped_insufficient_data += 1,
                PairStatus::CurrencyMismatch { .. } => summary.skipped_currency_mismatch += 1,
                PairStatus::DispatchFailed { .. } => summary.dispatch_failures += 1,
                PairStatus::Error { .. } => summary.errors += 1,
            }
            summary.evaluated += 1;
        }
        summary.outcomes = outcomes;
        summary
    }

    pub fn outcome(&self, network: &str, metric_name: &str) -> Option<&PairOutcome> {
        self.outcomes
            .iter()
            .find(|o| o.network.as_str() == network && o.metric_name.as_str() == metric_name)
    }
}

/// 检测器运行参数
#[derive(Debug, Clone)]
pub struct DetectorSettings {
    /// 同时评估的组合数上限
    pub concurrency: usize,
    /// 超时后不再开始新的组合
    pub run_timeout: Option<Duration>,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            run_timeout: None,
        }
    }
}

/// 突增检测器
pub struct SpikeDetector {
    source: Arc<dyn SampleSource>,
    policy: ThresholdPolicy,
    guard: DeduplicationGuard,
    dispatcher: AlertDispatcher,
    settings: DetectorSettings,
}

impl SpikeDetector {
    pub fn new(
        source: Arc<dyn SampleSource>,
        policy: ThresholdPolicy,
        guard: DeduplicationGuard,
        dispatcher: AlertDispatcher,
        settings: DetectorSettings,
    ) -> Self {
        Self {
            source,
            policy,
            guard,
            dispatcher,
            settings,
        }
    }

    pub fn policy(&self) -> &ThresholdPolicy {
        &self.policy
    }

    /// 以当天（UTC）为本期运行
    pub async fn run(&self, pairs: &[(NetworkId, MetricName)], cancel: &CancellationToken) -> RunSummary {
        self.run_for_period(pairs, Utc::now().date_naive(), cancel).await
    }

    /// 以指定日期为本期、前一天为上期运行
    pub async fn run_for_period(
        &self,
        pairs: &[(NetworkId, MetricName)],
        period: NaiveDate,
        cancel: &CancellationToken,
    ) -> RunSummary {
        let started_at = Utc::now();
        let timer = Instant::now();
        let token = cancel.child_token();

        let deadline = self.settings.run_timeout.map(|timeout| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                if !token.is_cancelled() {
                    warn!(timeout_secs = timeout.as_secs(), "Detector run timed out");
                    token.cancel();
                }
            })
        });

        info!(%period, pairs = pairs.len(), "Detector run started");

        let mut indexed: Vec<(usize, PairOutcome)> = stream::iter(pairs.iter().cloned().enumerate())
            .map(|(index, (network, metric_name))| {
                let token = token.clone();
                async move {
                    // 取消只在组合之间生效，已开始的组合会完整执行
                    let outcome = if token.is_cancelled() {
                        record_outcome_metrics(&PairStatus::Cancelled);
                        PairOutcome::new(network, metric_name, period, PairStatus::Cancelled)
                    } else {
                        self.evaluate_pair(network, metric_name, period).await
                    };
                    (index, outcome)
                }
            })
            .buffer_unordered(self.settings.concurrency.max(1))
            .collect()
            .await;

        if let Some(handle) = deadline {
            handle.abort();
        }

        indexed.sort_by_key(|(index, _)| *index);
        let outcomes = indexed.into_iter().map(|(_, outcome)| outcome).collect();
        let summary = RunSummary::from_outcomes(period, started_at, outcomes);

        histogram!(names::RUN_DURATION).record(timer.elapsed().as_secs_f64());
        info!(
            %period,
            evaluated = summary.evaluated,
            alerted = summary.alerted,
            duplicates = summary.skipped_duplicate,
            dispatch_failures = summary.dispatch_failures,
            errors = summary.errors,
            cancelled = summary.cancelled,
            "Detector run finished"
        );
        summary
    }

    async fn evaluate_pair(&self, network: NetworkId, metric_name: MetricName, period: NaiveDate) -> PairOutcome {
        counter!(names::PAIRS_EVALUATED).increment(1);
        let outcome = self.evaluate(&network, &metric_name, period).await;
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    network = %network,
                    metric = %metric_name,
                    %period,
                    kind = e.kind(),
                    error = %e,
                    "Pair evaluation failed"
                );
                PairOutcome::new(
                    network,
                    metric_name,
                    period,
                    PairStatus::Error {
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    },
                )
            }
        };
        record_outcome_metrics(&outcome.status);
        outcome
    }

    async fn evaluate(
        &self,
        network: &NetworkId,
        metric_name: &MetricName,
        period: NaiveDate,
    ) -> Result<PairOutcome, SpikeError> {
        let outcome = |status| PairOutcome::new(network.clone(), metric_name.clone(), period, status);

        let previous_period = period
            .pred_opt()
            .ok_or_else(|| SpikeError::invalid_value(format!("no period before {}", period)))?;

        let Some(current) = self.fetch(network, metric_name, period).await? else {
            debug!(network = %network, metric = %metric_name, %period, "No current sample");
            return Ok(outcome(PairStatus::InsufficientData { missing: period }));
        };
        let Some(previous) = self.fetch(network, metric_name, previous_period).await? else {
            debug!(network = %network, metric = %metric_name, period = %previous_period, "No previous sample");
            return Ok(outcome(PairStatus::InsufficientData {
                missing: previous_period,
            }));
        };

        if !current.is_comparable_with(&previous) {
            warn!(
                network = %network,
                metric = %metric_name,
                %period,
                previous_currency = previous.currency.as_deref().unwrap_or_default(),
                current_currency = current.currency.as_deref().unwrap_or_default(),
                "Currency changed between periods, skipping"
            );
            return Ok(outcome(PairStatus::CurrencyMismatch {
                previous: previous.currency.unwrap_or_default(),
                current: current.currency.unwrap_or_default(),
            }));
        }

        let change = ChangeComputer::compute(&previous, &current, Utc::now()).map_err(|e| {
            warn!(
                network = %network,
                metric = %metric_name,
                %period,
                previous = %previous.value,
                current = %current.value,
                error = %e,
                "Invalid metric values"
            );
            e
        })?;

        if change.is_flat() {
            debug!(network = %network, metric = %metric_name, %period, "No change");
            return Ok(outcome(PairStatus::Flat).with_change(change));
        }

        let threshold = self.policy.threshold_for(network, metric_name);
        if !self.policy.crosses(&change, threshold) {
            debug!(
                network = %network,
                metric = %metric_name,
                %period,
                change = ?change.change_percent().value(),
                %threshold,
                "Below threshold"
            );
            return Ok(outcome(PairStatus::BelowThreshold { threshold }).with_change(change));
        }

        info!(
            network = %network,
            metric = %metric_name,
            %period,
            previous = %change.previous_value(),
            current = %change.current_value(),
            change = ?change.change_percent().value(),
            direction = %change.direction(),
            %threshold,
            "Spike detected"
        );

        let key = change.dedupe_key();
        if self.guard.already_alerted(&key).await? {
            info!(key = %key, "Spike already alerted for this period");
            return Ok(outcome(PairStatus::Duplicate).with_change(change));
        }

        let status = match self.dispatcher.dispatch(&change).await {
            Ok(record) if record.dispatch_status() == DispatchStatus::Skipped => {
                PairStatus::NotConfigured {
                    alert_id: record.id(),
                }
            }
            Ok(record) => PairStatus::Alerted {
                alert_id: record.id(),
                message_id: record.dispatch_reference().map(str::to_string),
            },
            Err(SpikeError::DuplicateAlert(_)) => PairStatus::Duplicate,
            Err(SpikeError::DispatchFailure(reason)) => PairStatus::DispatchFailed { reason },
            Err(e) => return Err(e),
        };
        Ok(outcome(status).with_change(change))
    }

    async fn fetch(
        &self,
        network: &NetworkId,
        metric_name: &MetricName,
        period: NaiveDate,
    ) -> Result<Option<MetricSample>, SpikeError> {
        self.source
            .get_sample(network, metric_name, period)
            .await
            .map_err(|e| SpikeError::SourceFailure(format!("{} {} on {}: {}", network, metric_name, period, e)))
    }
}

fn record_outcome_metrics(status: &PairStatus) {
    let skipped = |reason: &'static str| {
        counter!(names::PAIRS_SKIPPED, "reason" => reason).increment(1);
    };
    match status {
        PairStatus::Alerted { .. } => counter!(names::ALERTS_SENT).increment(1),
        PairStatus::NotConfigured { .. } => skipped("not_configured"),
        PairStatus::Flat => skipped("flat"),
        PairStatus::BelowThreshold { .. } => skipped("below_threshold"),
        PairStatus::Duplicate => skipped("duplicate"),
        PairStatus::InsufficientData { .. } => skipped("insufficient_data"),
        PairStatus::CurrencyMismatch { .. } => skipped("currency_mismatch"),
        PairStatus::DispatchFailed { .. } => counter!(names::DISPATCH_FAILURES).increment(1),
        PairStatus::Error { kind, .. } => {
            counter!(names::PAIR_ERRORS, "kind" => kind.clone()).increment(1)
        }
        PairStatus::Cancelled => skipped("cancelled"),
    }
}
