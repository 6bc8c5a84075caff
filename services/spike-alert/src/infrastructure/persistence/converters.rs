//! 数据库行到领域对象的转换

use rust_decimal::Decimal;
use tellspike_errors::{AppError, AppResult};

use super::rows::{AlertRecordRow, PartnerMetricRow};
use crate::domain::{
    AlertId, AlertRecord, ChangePercent, Direction, DispatchStatus, MetricName, MetricSample,
    NetworkId,
};

/// 将 AlertRecordRow 转换为 AlertRecord
pub fn alert_record_from_row(row: AlertRecordRow) -> AppResult<AlertRecord> {
    let corrupt = |what: &str| {
        AppError::database(format!("alert record {} has invalid {}", row.id, what))
    };

    let change_percent = match (row.unbounded, row.change_percent) {
        (true, _) => ChangePercent::Unbounded,
        (false, Some(percent)) => ChangePercent::Bounded(percent),
        (false, None) => return Err(corrupt("change_percent")),
    };
    let direction: Direction = row.direction.parse().map_err(|_| corrupt("direction"))?;
    let dispatch_status: DispatchStatus = row
        .dispatch_status
        .parse()
        .map_err(|_| corrupt("dispatch_status"))?;
    let network = NetworkId::new(&row.network).map_err(|_| corrupt("network"))?;
    let metric_name = MetricName::new(&row.metric_name).map_err(|_| corrupt("metric_name"))?;

    Ok(AlertRecord {
        id: AlertId::from_uuid(row.id),
        network,
        metric_name,
        previous_value: row.previous_value,
        current_value: row.current_value,
        change_percent,
        direction,
        period: row.period,
        dispatch_status,
        dispatch_reference: row.dispatch_reference,
        failure_reason: row.failure_reason,
        detected_at: row.detected_at,
        created_at: row.created_at,
    })
}

/// 取出行中指定指标；列为 NULL 时视为无样本
pub fn sample_from_row(row: PartnerMetricRow, metric_name: &MetricName) -> AppResult<Option<MetricSample>> {
    let network = NetworkId::new(&row.network)
        .map_err(|e| AppError::database(format!("invalid network in partner metrics: {}", e)))?;

    let (value, currency) = match metric_name.as_str() {
        MetricName::LEADS => (Some(Decimal::from(row.leads)), None),
        MetricName::REVENUE => (Some(row.revenue), Some(row.currency)),
        MetricName::CLICKS => (row.clicks.map(Decimal::from), None),
        MetricName::IMPRESSIONS => (row.impressions.map(Decimal::from), None),
        other => return Err(AppError::validation(format!("unknown metric: {}", other))),
    };

    Ok(value.map(|value| {
        let sample = MetricSample::new(network, metric_name.clone(), row.date, value);
        match currency {
            Some(code) => sample.with_currency(code),
            None => sample,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn partner_row() -> PartnerMetricRow {
        PartnerMetricRow {
            network: "kelkoo".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            leads: 120,
            revenue: dec!(845.20),
            currency: "eur".to_string(),
            clicks: None,
            impressions: Some(5400),
        }
    }

    #[test]
    fn test_revenue_carries_currency() {
        let revenue = MetricName::new("revenue").unwrap();
        let sample = sample_from_row(partner_row(), &revenue).unwrap().unwrap();
        assert_eq!(sample.value, dec!(845.20));
        assert_eq!(sample.currency.as_deref(), Some("EUR"));

        let leads = MetricName::new("leads").unwrap();
        let sample = sample_from_row(partner_row(), &leads).unwrap().unwrap();
        assert_eq!(sample.value, dec!(120));
        assert!(sample.currency.is_none());
    }

    #[test]
    fn test_null_column_is_missing_sample() {
        let clicks = MetricName::new("clicks").unwrap();
        assert!(sample_from_row(partner_row(), &clicks).unwrap().is_none());
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let bounce = MetricName::new("bounce_rate").unwrap();
        assert!(matches!(
            sample_from_row(partner_row(), &bounce),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_alert_row_round_trip_fields() {
        let row = AlertRecordRow {
            id: Uuid::now_v7(),
            network: "admedia".to_string(),
            metric_name: "leads".to_string(),
            previous_value: dec!(0),
            current_value: dec!(5),
            change_percent: None,
            unbounded: true,
            direction: "up".to_string(),
            period: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            dispatch_status: "sent".to_string(),
            dispatch_reference: Some("77".to_string()),
            failure_reason: None,
            detected_at: Utc::now(),
            created_at: Utc::now(),
        };
        let record = alert_record_from_row(row).unwrap();
        assert!(record.change_percent().is_unbounded());
        assert_eq!(record.dispatch_status(), DispatchStatus::Sent);
        assert_eq!(record.dispatch_reference(), Some("77"));
    }

    #[test]
    fn test_corrupt_row_rejected() {
        let row = AlertRecordRow {
            id: Uuid::now_v7(),
            network: "admedia".to_string(),
            metric_name: "leads".to_string(),
            previous_value: dec!(10),
            current_value: dec!(5),
            change_percent: None,
            unbounded: false,
            direction: "down".to_string(),
            period: NaiveDate::from_ymd_opt(2025, 3, 2).unwrap(),
            dispatch_status: "sent".to_string(),
            dispatch_reference: None,
            failure_reason: None,
            detected_at: Utc::now(),
            created_at: Utc::now(),
        };
        assert!(matches!(alert_record_from_row(row), Err(AppError::Database(_))));
    }
}
