//! 指标变化

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::domain::enums::Direction;
use crate::domain::value_objects::{DedupeKey, MetricName, NetworkId};

/// 变化百分比
///
/// 上期为 0、本期为正时没有有限的百分比，记为 `Unbounded`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePercent {
    Bounded(Decimal),
    Unbounded,
}

impl ChangePercent {
    pub fn is_unbounded(&self) -> bool {
        matches!(self, ChangePercent::Unbounded)
    }

    /// 有符号百分比，Unbounded 时为 None
    pub fn value(&self) -> Option<Decimal> {
        match self {
            ChangePercent::Bounded(value) => Some(*value),
            ChangePercent::Unbounded => None,
        }
    }

    /// 绝对值，Unbounded 时为 None
    pub fn magnitude(&self) -> Option<Decimal> {
        self.value().map(|v| v.abs())
    }
}

impl Serialize for ChangePercent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ChangePercent::Bounded(value) => Serialize::serialize(value, serializer),
            ChangePercent::Unbounded => serializer.serialize_str("unbounded"),
        }
    }
}

/// 两期之间的变化，只由 [`ChangeComputer`](crate::domain::ChangeComputer) 构造，构造后不可变
///
/// `direction` 取自原始值的比较，`change_percent` 是一位小数的舍入结果：
/// 极小的变化可能是 up/down 且百分比为 0.0，这类变化不会越过任何正阈值。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricChange {
    network: NetworkId,
    metric_name: MetricName,
    previous_value: Decimal,
    current_value: Decimal,
    change_percent: ChangePercent,
    direction: Direction,
    period: NaiveDate,
    detected_at: DateTime<Utc>,
}

impl MetricChange {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        network: NetworkId,
        metric_name: MetricName,
        previous_value: Decimal,
        current_value: Decimal,
        change_percent: ChangePercent,
        direction: Direction,
        period: NaiveDate,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            network,
            metric_name,
            previous_value,
            current_value,
            change_percent,
            direction,
            period,
            detected_at,
        }
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

    /// 本期日期
    pub fn period(&self) -> NaiveDate {
        self.period
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }

    pub fn is_flat(&self) -> bool {
        self.direction == Direction::Flat
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

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_change_percent_serializes_as_decimal_or_marker() {
        assert_eq!(
            serde_json::to_value(ChangePercent::Bounded(dec!(25.0))).unwrap(),
            json!("25.0")
        );
        assert_eq!(
            serde_json::to_value(ChangePercent::Unbounded).unwrap(),
            json!("unbounded")
        );
    }
}
