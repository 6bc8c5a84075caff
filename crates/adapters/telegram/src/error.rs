//! reqwest 错误到 AppError 的转换

use tellspike_errors::AppError;

/// 传输层错误统一视为外部服务错误，保留超时/连接失败的区分用于日志
pub fn map_transport_error(err: reqwest::Error, context: &str) -> AppError {
    let kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_decode() {
        "decode"
    } else {
        "request"
    };
    AppError::external_service(format!("{} ({}): {}", context, kind, err))
}
