//! 变化计算
//!
//! 纯函数：相同输入永远得到相同输出，不访问任何外部状态。

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::entities::{ChangePercent, MetricChange, MetricSample};
use crate::domain::enums::Direction;
use crate::error::SpikeError;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

pub struct ChangeComputer;

impl ChangeComputer {
    /// 计算百分比与方向
    ///
    /// - 两者都为 0：flat，0
    /// - 上期为 0、本期为正：up，Unbounded
    /// - 其余：(current − previous) / previous × 100，保留一位小数，四舍五入远离零
    pub fn delta(previous: Decimal, current: Decimal) -> Result<(ChangePercent, Direction), SpikeError> {
        if previous.is_sign_negative() && !previous.is_zero() {
            return Err(SpikeError::invalid_value(format!(
                "previous value must not be negative: {}",
                previous
            )));
        }
        if current.is_sign_negative() && !current.is_zero() {
            return Err(SpikeError::invalid_value(format!(
                "current value must not be negative: {}",
                current
            )));
        }

        let direction = match current.cmp(&previous) {
            std::cmp::Ordering::Greater => Direction::Up,
            std::cmp::Ordering::Less => Direction::Down,
            std::cmp::Ordering::Equal => Direction::Flat,
        };

        if previous.is_zero() {
            return Ok(match direction {
                Direction::Flat => (ChangePercent::Bounded(Decimal::ZERO), Direction::Flat),
                _ => (ChangePercent::Unbounded, Direction::Up),
            });
        }

        let percent = (current - previous)
            .checked_mul(HUNDRED)
            .and_then(|scaled| scaled.checked_div(previous))
            .ok_or_else(|| {
                SpikeError::invalid_value(format!(
                    "change from {} to {} overflows",
                    previous, current
                ))
            })?
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);

        Ok((ChangePercent::Bounded(percent), direction))
    }

    /// 由上期和本期样本构造变化，period 取本期日期
    pub fn compute(
        previous: &MetricSample,
        current: &MetricSample,
        detected_at: DateTime<Utc>,
    ) -> Result<MetricChange, SpikeError> {
        let (change_percent, direction) = Self::delta(previous.value, current.value)?;
        Ok(MetricChange::new(
            current.network.clone(),
            current.metric_name.clone(),
            previous.value,
            current.value,
            change_percent,
            direction,
            current.period,
            detected_at,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_increase_rounds_to_one_decimal() {
        let (percent, direction) = ChangeComputer::delta(dec!(100), dec!(125)).unwrap();
        assert_eq!(percent, ChangePercent::Bounded(dec!(25.0)));
        assert_eq!(direction, Direction::Up);

        let (percent, _) = ChangeComputer::delta(dec!(3), dec!(4)).unwrap();
        assert_eq!(percent, ChangePercent::Bounded(dec!(33.3)));
    }

    #[test]
    fn test_decrease_is_negative() {
        let (percent, direction) = ChangeComputer::delta(dec!(200), dec!(150)).unwrap();
        assert_eq!(percent, ChangePercent::Bounded(dec!(-25.0)));
        assert_eq!(direction, Direction::Down);
    }

    #[test]
    fn test_midpoint_rounds_away_from_zero() {
        // 0.25% / -0.25%
        let (up, _) = ChangeComputer::delta(dec!(400), dec!(401)).unwrap();
        assert_eq!(up, ChangePercent::Bounded(dec!(0.3)));
        let (down, _) = ChangeComputer::delta(dec!(400), dec!(399)).unwrap();
        assert_eq!(down, ChangePercent::Bounded(dec!(-0.3)));
    }

    #[test]
    fn test_tiny_change_keeps_direction_with_zero_percent() {
        let (percent, direction) = ChangeComputer::delta(dec!(100000), dec!(100001)).unwrap();
        assert_eq!(percent, ChangePercent::Bounded(dec!(0.0)));
        assert_eq!(direction, Direction::Up);
    }

    #[test]
    fn test_both_zero_is_flat() {
        let (percent, direction) = ChangeComputer::delta(dec!(0), dec!(0)).unwrap();
        assert_eq!(percent, ChangePercent::Bounded(Decimal::ZERO));
        assert_eq!(direction, Direction::Flat);
    }

    #[test]
    fn test_from_zero_is_unbounded() {
        let (percent, direction) = ChangeComputer::delta(dec!(0), dec!(5)).unwrap();
        assert!(percent.is_unbounded());
        assert_eq!(direction, Direction::Up);
    }

    #[test]
    fn test_equal_values_are_flat() {
        let (percent, direction) = ChangeComputer::delta(dec!(42.50), dec!(42.5)).unwrap();
        assert_eq!(percent, ChangePercent::Bounded(Decimal::ZERO));
        assert_eq!(direction, Direction::Flat);
    }

    #[test]
    fn test_negative_input_rejected() {
        assert!(matches!(
            ChangeComputer::delta(dec!(-1), dec!(5)),
            Err(SpikeError::InvalidValue(_))
        ));
        assert!(matches!(
            ChangeComputer::delta(dec!(1), dec!(-5)),
            Err(SpikeError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_to_zero_is_full_decrease() {
        let (percent, direction) = ChangeComputer::delta(dec!(80), dec!(0)).unwrap();
        assert_eq!(percent, ChangePercent::Bounded(dec!(-100.0)));
        assert_eq!(direction, Direction::Down);
    }
}
