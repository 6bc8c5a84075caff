//! 告警发送状态

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchStatus {
    /// 已送达，占用去重键
    Sent,
    /// 通知渠道失败，不占用去重键
    Failed,
    /// 通知渠道未配置，未发送
    Skipped,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::Sent => "sent",
            DispatchStatus::Failed => "failed",
            DispatchStatus::Skipped => "skipped",
        }
    }

    /// 是否占用去重键
    pub fn consumes_key(&self) -> bool {
        matches!(self, DispatchStatus::Sent)
    }
}

impl fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DispatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sent" => Ok(DispatchStatus::Sent),
            "failed" => Ok(DispatchStatus::Failed),
            "skipped" => Ok(DispatchStatus::Skipped),
            other => Err(format!("unknown dispatch status: {}", other)),
        }
    }
}
