//! 检测流程错误分类

use tellspike_errors::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpikeError {
    /// 指标值非法（负数、溢出），该指标本轮失败，其余继续
    #[error("Invalid metric value: {0}")]
    InvalidValue(String),

    /// 阈值等配置非法，启动即失败
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// 当期或上期样本缺失
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// 样本来源不可用，该指标本轮跳过
    #[error("Sample source failure: {0}")]
    SourceFailure(String),

    /// 同一去重键已发送过告警
    #[error("Alert already sent for {0}")]
    DuplicateAlert(String),

    /// 通知渠道拒绝或不可达，已记录 failed，下一轮重试
    #[error("Alert dispatch failed: {0}")]
    DispatchFailure(String),

    /// 告警存储不可用
    #[error("Alert store failure: {0}")]
    StoreFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SpikeError {
    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn store_failure(msg: impl Into<String>) -> Self {
        Self::StoreFailure(msg.into())
    }

    /// 写入指标标签与运行摘要的短名
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidValue(_) => "invalid_value",
            Self::InvalidConfig(_) => "invalid_config",
            Self::InsufficientData(_) => "insufficient_data",
            Self::SourceFailure(_) => "source_failure",
            Self::DuplicateAlert(_) => "duplicate",
            Self::DispatchFailure(_) => "dispatch_failure",
            Self::StoreFailure(_) => "store_failure",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<SpikeError> for AppError {
    fn from(error: SpikeError) -> Self {
        match error {
            SpikeError::InvalidValue(msg) => AppError::Validation(msg),
            SpikeError::InvalidConfig(msg) => AppError::Config(msg),
            SpikeError::InsufficientData(msg) => AppError::NotFound(msg),
            SpikeError::SourceFailure(msg) => AppError::Unavailable(msg),
            SpikeError::DuplicateAlert(msg) => AppError::Conflict(msg),
            SpikeError::DispatchFailure(msg) => AppError::ExternalService(msg),
            SpikeError::StoreFailure(msg) => AppError::Database(msg),
            SpikeError::Internal(msg) => AppError::Internal(msg),
        }
    }
}
