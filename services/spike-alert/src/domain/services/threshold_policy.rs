//! 阈值策略

use std::collections::HashMap;

use rust_decimal::Decimal;
use tellspike_config::SpikeConfig;

use crate::domain::entities::{ChangePercent, MetricChange};
use crate::domain::value_objects::{MetricName, NetworkId};
use crate::error::SpikeError;

/// 按网络覆盖、否则取全局默认的突增阈值（百分比）
#[derive(Debug, Clone)]
pub struct ThresholdPolicy {
    default_percent: Decimal,
    overrides: HashMap<NetworkId, Decimal>,
}

impl ThresholdPolicy {
    pub fn new(
        default_percent: Decimal,
        overrides: impl IntoIterator<Item = (NetworkId, Decimal)>,
    ) -> Result<Self, SpikeError> {
        if default_percent <= Decimal::ZERO {
            return Err(SpikeError::invalid_config(format!(
                "threshold must be positive, got {}",
                default_percent
            )));
        }

        let mut map = HashMap::new();
        for (network, percent) in overrides {
            if percent <= Decimal::ZERO {
                return Err(SpikeError::invalid_config(format!(
                    "threshold override for {} must be positive, got {}",
                    network, percent
                )));
            }
            map.insert(network, percent);
        }

        Ok(Self {
            default_percent,
            overrides: map,
        })
    }

    pub fn from_config(config: &SpikeConfig) -> Result<Self, SpikeError> {
        let overrides = config
            .network_overrides
            .iter()
            .map(|(network, percent)| Ok((NetworkId::new(network)?, *percent)))
            .collect::<Result<Vec<_>, SpikeError>>()?;
        Self::new(config.threshold_percent, overrides)
    }

    pub fn default_percent(&self) -> Decimal {
        self.default_percent
    }

    /// 目前只按网络覆盖，指标名保留在签名里以便按指标细分
    pub fn threshold_for(&self, network: &NetworkId, _metric_name: &MetricName) -> Decimal {
        self.overrides
            .get(network)
            .copied()
            .unwrap_or(self.default_percent)
    }

    /// 包含边界：|change| ≥ threshold 即越线；Unbounded 总是越线，flat 永不越线
    pub fn crosses(&self, change: &MetricChange, threshold: Decimal) -> bool {
        if change.is_flat() {
            return false;
        }
        match change.change_percent() {
            ChangePercent::Unbounded => true,
            ChangePercent::Bounded(percent) => percent.abs() >= threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChangeComputer;
    use crate::domain::entities::MetricSample;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn change(previous: Decimal, current: Decimal) -> MetricChange {
        let network = NetworkId::new("kelkoo").unwrap();
        let metric = MetricName::new("leads").unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let prev = MetricSample::new(network.clone(), metric.clone(), day.pred_opt().unwrap(), previous);
        let cur = MetricSample::new(network, metric, day, current);
        ChangeComputer::compute(&prev, &cur, Utc::now()).unwrap()
    }

    fn policy() -> ThresholdPolicy {
        ThresholdPolicy::new(dec!(20), [(NetworkId::new("admedia").unwrap(), dec!(35))]).unwrap()
    }

    #[test]
    fn test_override_then_default() {
        let policy = policy();
        let leads = MetricName::new("leads").unwrap();
        assert_eq!(
            policy.threshold_for(&NetworkId::new("admedia").unwrap(), &leads),
            dec!(35)
        );
        assert_eq!(
            policy.threshold_for(&NetworkId::new("kelkoo").unwrap(), &leads),
            dec!(20)
        );
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let policy = policy();
        assert!(policy.crosses(&change(dec!(100), dec!(120)), dec!(20)));
        assert!(policy.crosses(&change(dec!(100), dec!(80)), dec!(20)));
        assert!(!policy.crosses(&change(dec!(100), dec!(119.9)), dec!(20)));
    }

    #[test]
    fn test_flat_and_unbounded() {
        let policy = policy();
        assert!(!policy.crosses(&change(dec!(0), dec!(0)), dec!(0.1)));
        assert!(policy.crosses(&change(dec!(0), dec!(5)), dec!(1000)));
    }

    #[test]
    fn test_below_threshold() {
        assert!(!policy().crosses(&change(dec!(100), dec!(110)), dec!(20)));
    }

    #[test]
    fn test_change_rounded_to_zero_never_crosses() {
        let tiny = change(dec!(100000), dec!(100001));
        assert!(!tiny.is_flat());
        assert!(!policy().crosses(&tiny, dec!(0.01)));
    }

    #[test]
    fn test_rejects_non_positive_thresholds() {
        assert!(matches!(
            ThresholdPolicy::new(dec!(0), []),
            Err(SpikeError::InvalidConfig(_))
        ));
        assert!(matches!(
            ThresholdPolicy::new(dec!(20), [(NetworkId::new("kelkoo").unwrap(), dec!(-1))]),
            Err(SpikeError::InvalidConfig(_))
        ));
    }
}
