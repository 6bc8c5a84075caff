//! 指标样本来源

use async_trait::async_trait;
use chrono::NaiveDate;
use tellspike_errors::AppResult;

use crate::domain::entities::MetricSample;
use crate::domain::value_objects::{MetricName, NetworkId};

/// 按 (network, metric, date) 提供日度样本
#[async_trait]
pub trait SampleSource: Send + Sync {
    /// 当日无数据返回 None
    async fn get_sample(
        &self,
        network: &NetworkId,
        metric_name: &MetricName,
        period: NaiveDate,
    ) -> AppResult<Option<MetricSample>>;
}
