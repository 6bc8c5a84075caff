//! 告警记录
//!
//! 每次发送尝试写入一条，创建后不再修改

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tellspike_common::DateRange;

use super::metric_change::{ChangePercent, MetricChange};
use crate::domain::enums::{Direction, DispatchStatus};
use crate::domain::value_objects::{AlertId, DedupeKey, MetricName, NetworkId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub(crate) id: AlertId,
    pub(crate) network: NetworkId,
    pub(crate) metric_name: MetricName,
    pub(crate) previous_value: Decimal,
    pub(crate) current_value: Decimal,
    pub(crate) change_percent: ChangePercent,
    pub(crate) direction: Direction,
    pub(crate) period: NaiveDate,
    pub(crate) dispatch_status: DispatchStatus,
    pub(crate) dispatch_reference: Option<String>,
    pub(crate) failure_reason: Option<String>,
    pub(crate) detected_at: DateTime<Utc>,
    pub(crate) created_at: DateTime<Utc>,
}

impl AlertRecord {
    fn from_change(change: &MetricChange, status: DispatchStatus) -> Self {
        Self {
            id: AlertId::new(),
            network: change.network().clone(),
            metric_name: change.metric_name().clone(),
            previous_value: change.previous_value(),
            current_value: change.current_value(),
            change_percent: change.change_percent(),
            direction: change.direction(),
            period: change.period(),
            dispatch_status: status,
            dispatch_reference: None,
            failure_reason: None,
            detected_at: change.detected_at(),
            created_at: Utc::now(),
        }
    }

    /// 已送达，`message_id` 为通知渠道返回的消息 ID
    pub fn sent(change: &MetricChange, message_id: impl Into<String>) -> Self {
        let mut record = Self::from_change(change, DispatchStatus::Sent);
        record.dispatch_reference = Some(message_id.into());
        record
    }

    pub fn failed(change: &MetricChange, reason: impl Into<String>) -> Self {
        let mut record = Self::from_change(change, DispatchStatus::Failed);
        record.failure_reason = Some(reason.into());
        record
    }

    pub fn skipped(change: &MetricChange, reason: impl Into<String>) -> Self {
        let mut record = Self::from_change(change, DispatchStatus::Skipped);
        record.failure_reason = Some(reason.into());
        record
    }

    pub fn id(&self) -> AlertId {
        self.id
    }

    pub fn network(&self) -> &NetworkId {
        &self.network
    }

    pub fn metric_name(&self) -> &MetricName {
        &self.metric_name
    }

    pub fn previous_value(&self) -> Decimal {
        self.previous_value
    }

    pub fn current_value(&self) -> Decimal {
        self.current_value
    }

    pub fn change_percent(&self) -> ChangePercent {
        self.change_percent
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn period(&self) -> NaiveDate {
        self.period
    }

    pub fn dispatch_status(&self) -> DispatchStatus {
        self.dispatch_status
    }

    pub fn dispatch_reference(&self) -> Option<&str> {
        self.dispatch_reference.as_deref()
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn dedupe_key(&self) -> DedupeKey {
        DedupeKey::new(
            self.network.clone(),
            self.metric_name.clone(),
            self.direction,
            self.period,
        )
    }
}

/// 历史查询过滤条件，日期范围作用于 period
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub network: Option<NetworkId>,
    pub range: DateRange,
}

impl AlertFilter {
    pub fn matches(&self, record: &AlertRecord) -> bool {
        self.network
            .as_ref()
            .is_none_or(|network| network == &record.network)
            && self.range.contains(record.period)
    }
}
