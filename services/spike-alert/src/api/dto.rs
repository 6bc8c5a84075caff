//! 请求与响应结构

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tellspike_common::{DateRange, PagedResult, Pagination};
use tellspike_errors::{AppError, AppResult};

use crate::application::queries::ListAlertsQuery;
use crate::domain::{AlertFilter, AlertRecord, NetworkId};

/// `GET /api/alerts` 查询参数
#[derive(Debug, Default, Deserialize)]
pub struct ListAlertsParams {
    pub network: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ListAlertsParams {
    pub fn into_query(self) -> AppResult<ListAlertsQuery> {
        let network = self
            .network
            .filter(|n| !n.trim().is_empty())
            .map(|n| NetworkId::new(&n).map_err(|e| AppError::validation(e.to_string())))
            .transpose()?;
        let defaults = Pagination::default();

        Ok(ListAlertsQuery {
            filter: AlertFilter {
                network,
                range: DateRange::new(self.from, self.to),
            },
            pagination: Pagination::new(
                self.page.unwrap_or(defaults.page),
                self.page_size.unwrap_or(defaults.page_size),
            ),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct AlertResponse {
    pub id: String,
    pub network: String,
    pub metric_name: String,
    pub previous_value: Decimal,
    pub current_value: Decimal,
    /// Unbounded 时为 null
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

impl From<AlertRecord> for AlertResponse {
    fn from(record: AlertRecord) -> Self {
        Self {
            id: record.id().to_string(),
            network: record.network().to_string(),
            metric_name: record.metric_name().to_string(),
            previous_value: record.previous_value(),
            current_value: record.current_value(),
            change_percent: record.change_percent().value(),
            unbounded: record.change_percent().is_unbounded(),
            direction: record.direction().to_string(),
            period: record.period(),
            dispatch_status: record.dispatch_status().to_string(),
            dispatch_reference: record.dispatch_reference().map(str::to_string),
            failure_reason: record.failure_reason().map(str::to_string),
            detected_at: record.detected_at(),
            created_at: record.created_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListAlertsResponse {
    pub items: Vec<AlertResponse>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl From<PagedResult<AlertRecord>> for ListAlertsResponse {
    fn from(result: PagedResult<AlertRecord>) -> Self {
        let total_pages = result.total_pages();
        let result = result.map(AlertResponse::from);
        Self {
            items: result.items,
            total: result.total,
            page: result.page,
            page_size: result.page_size,
            total_pages,
        }
    }
}

/// `POST /api/detector/run` 请求体，可省略
#[derive(Debug, Default, Deserialize)]
pub struct RunDetectorRequest {
    pub period: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct TestMessageResponse {
    pub success: bool,
    pub message_id: String,
}
