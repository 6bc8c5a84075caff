//! Detector commands

use chrono::NaiveDate;

/// 手动触发一次检测
#[derive(Debug, Clone, Default)]
pub struct RunDetectorCommand {
    /// 本期日期，缺省为当天（UTC）
    pub period: Option<NaiveDate>,
}
