//! 指标样本

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{MetricName, NetworkId};

/// 某网络某指标在某日的取值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub network: NetworkId,
    pub metric_name: MetricName,
    pub period: NaiveDate,
    pub value: Decimal,
    /// 货币指标的币种（如 `EUR`），计数类指标为 None
    pub currency: Option<String>,
}

impl MetricSample {
    pub fn new(network: NetworkId, metric_name: MetricName, period: NaiveDate, value: Decimal) -> Self {
        Self {
            network,
            metric_name,
            period,
            value,
            currency: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into().to_uppercase());
        self
    }

    /// 两个样本能否直接比较：未标注币种的一侧不参与判断
    pub fn is_comparable_with(&self, other: &MetricSample) -> bool {
        match (&self.currency, &other.currency) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}
