//! 指标名称

use derive_more::Display;
use serde::{Deserialize, Serialize};

use super::network_id::capitalize;
use crate::error::SpikeError;

/// 指标名称（`leads`、`revenue` 等），统一为小写
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(try_from = "String", into = "String")]
#[display("{_0}")]
pub struct MetricName(String);

impl MetricName {
    pub const LEADS: &'static str = "leads";
    pub const REVENUE: &'static str = "revenue";
    pub const CLICKS: &'static str = "clicks";
    pub const IMPRESSIONS: &'static str = "impressions";

    pub fn new(value: impl AsRef<str>) -> Result<Self, SpikeError> {
        let normalized = value.as_ref().trim().to_lowercase();
        if normalized.is_empty() {
            return Err(SpikeError::invalid_config("metric name must not be empty"));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn display_name(&self) -> String {
        capitalize(&self.0)
    }
}

impl TryFrom<String> for MetricName {
    type Error = SpikeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MetricName> for String {
    fn from(name: MetricName) -> Self {
        name.0
    }
}
