//! HTTP 接口
//!
//! - `GET  /api/alerts`：告警历史（只读，分页）
//! - `POST /api/alerts/test`：发送连通性测试消息
//! - `POST /api/detector/run`：立即运行一次检测

mod dto;
mod error;
mod routes;

pub use dto::*;
pub use error::ApiError;
pub use routes::router;
