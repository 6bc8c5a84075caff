//! 数据库行映射结构

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// 告警记录数据库行
#[derive(Debug, FromRow)]
pub struct AlertRecordRow {
    pub id: Uuid,
    pub network: String,
    pub metric_name: String,
    pub previous_value: Decimal,
    pub current_value: Decimal,
    pub change_percent: Option<Decimal>,
    pub unbounded: bool,
    pub direction: String,
    pub period: NaiveDate,
    pub dispatch_status: String,
    pub dispatch_reference: Option<String>,
    pub failure_reason: Option<String>,
    pub detected_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// 联盟网络日度指标行
#[derive(Debug, FromRow)]
pub struct PartnerMetricRow {
    pub network: String,
    pub date: NaiveDate,
    pub leads: i32,
    pub revenue: Decimal,
    pub currency: String,
    pub clicks: Option<i32>,
    pub impressions: Option<i32>,
}
