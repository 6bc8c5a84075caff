//! 领域实体

mod alert_record;
mod metric_change;
mod metric_sample;

pub use alert_record::{AlertFilter, AlertRecord};
pub use metric_change::{ChangePercent, MetricChange};
pub use metric_sample::MetricSample;
