//! 告警去重键

use chrono::NaiveDate;
use derive_more::Display;
use serde::Serialize;

use super::{MetricName, NetworkId};
use crate::domain::enums::Direction;

/// (network, metric_name, direction, period)
///
/// 不含变化幅度：同一方向、同一周期内更大的第二次突增不会再次告警。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Display)]
#[display("{network}/{metric_name}/{direction}/{period}")]
pub struct DedupeKey {
    pub network: NetworkId,
    pub metric_name: MetricName,
    pub direction: Direction,
    pub period: NaiveDate,
}

impl DedupeKey {
    pub fn new(
        network: NetworkId,
        metric_name: MetricName,
        direction: Direction,
        period: NaiveDate,
    ) -> Self {
        Self {
            network,
            metric_name,
            direction,
            period,
        }
    }
}
