//! 通知通道 trait 定义

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tellspike_errors::AppResult;

/// 通知发送成功后的回执
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentMessage {
    /// 通道侧的消息 ID
    pub message_id: String,
}

impl SentMessage {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
        }
    }
}

/// 单一通知通道（聊天机器人等）
///
/// 实现方负责一次投递，不做重试：超时后无法判断对端是否已收到，
/// 重试可能造成重复告警。
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// 发送格式化后的文本
    async fn send(&self, text: &str) -> AppResult<SentMessage>;

    /// 凭证是否齐全；未配置时调用方不应调用 `send`
    fn is_configured(&self) -> bool {
        true
    }

    /// 通道名称，用于日志
    fn name(&self) -> &str;
}
