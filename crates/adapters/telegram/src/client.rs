//! Telegram Bot API 客户端

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tellspike_config::TelegramConfig;
use tellspike_errors::{AppError, AppResult};
use tellspike_ports::{NotificationSink, SentMessage};
use tracing::{debug, error, info, warn};

use crate::error::map_transport_error;

/// 告警模板按 Markdown 书写
const PARSE_MODE: &str = "Markdown";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Bot API 统一响应包
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageResult {
    pub message_id: i64,
}

/// Telegram 通知客户端
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: Option<Secret<String>>,
    chat_id: Option<String>,
}

impl TelegramClient {
    /// 从配置创建客户端；凭证缺失时仍可创建，但 `is_configured()` 为 false
    pub fn from_config(config: &TelegramConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        let client = Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        };

        if client.is_configured() {
            info!("Telegram client initialized");
        } else {
            warn!("Telegram not configured - set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID");
        }
        Ok(client)
    }

    fn endpoint(&self, method: &str) -> Option<String> {
        self.bot_token
            .as_ref()
            .map(|token| format!("{}/bot{}/{}", self.api_base, token.expose_secret(), method))
    }

    async fn send_message(&self, chat_id: &str, url: &str, text: &str) -> AppResult<SentMessage> {
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: PARSE_MODE,
            disable_web_page_preview: true,
        };

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport_error(e, "Failed to reach Telegram API"))?;

        let status = response.status();
        let body: ApiResponse<MessageResult> = response.json().await.map_err(|e| {
            AppError::external_service(format!(
                "Unreadable Telegram response (HTTP {}): {}",
                status, e
            ))
        })?;

        interpret_response(body)
    }
}

/// 将 Bot API 响应转换为回执或错误
pub(crate) fn interpret_response(body: ApiResponse<MessageResult>) -> AppResult<SentMessage> {
    match body {
        ApiResponse {
            ok: true,
            result: Some(result),
            ..
        } => Ok(SentMessage::new(result.message_id.to_string())),
        ApiResponse {
            description,
            error_code,
            ..
        } => {
            let description = description.unwrap_or_else(|| "Unknown error".to_string());
            Err(AppError::external_service(match error_code {
                Some(code) => format!("Telegram API error {}: {}", code, description),
                None => format!("Telegram API error: {}", description),
            }))
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramClient {
    async fn send(&self, text: &str) -> AppResult<SentMessage> {
        let (Some(chat_id), Some(url)) = (self.chat_id.as_deref(), self.endpoint("sendMessage"))
        else {
            return Err(AppError::config(
                "Telegram service not configured. Set TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID",
            ));
        };

        debug!(chars = text.chars().count(), "Sending Telegram message");
        match self.send_message(chat_id, &url, text).await {
            Ok(sent) => {
                info!(message_id = %sent.message_id, "Telegram message sent");
                Ok(sent)
            }
            Err(e) => {
                error!(error = %e, "Failed to send Telegram message");
                Err(e)
            }
        }
    }

    fn is_configured(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }

    fn name(&self) -> &str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, extract::Path, routing::post};
    use serde_json::{Value, json};

    fn config(api_base: &str, token: Option<&str>, chat_id: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(|t| Secret::new(t.to_string())),
            chat_id: chat_id.map(str::to_string),
            api_base: api_base.to_string(),
            timeout_secs: 5,
        }
    }

    async fn spawn_fake_api() -> String {
        let app = Router::new().route(
            "/{bot}/sendMessage",
            post(|Path(bot): Path<String>, Json(body): Json<Value>| async move {
                if bot != "bot123:good" {
                    return Json(json!({
                        "ok": false,
                        "error_code": 401,
                        "description": "Unauthorized"
                    }));
                }
                assert_eq!(body["parse_mode"], "Markdown");
                assert_eq!(body["disable_web_page_preview"], true);
                Json(json!({
                    "ok": true,
                    "result": { "message_id": 4242, "chat": { "id": body["chat_id"] } }
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_is_configured_requires_token_and_chat() {
        let client = TelegramClient::from_config(&config("https://api.telegram.org", Some("t"), None)).unwrap();
        assert!(!client.is_configured());
        let client =
            TelegramClient::from_config(&config("https://api.telegram.org/", Some("t"), Some("1"))).unwrap();
        assert!(client.is_configured());
        assert_eq!(
            client.endpoint("sendMessage").as_deref(),
            Some("https://api.telegram.org/bott/sendMessage")
        );
    }

    #[test]
    fn test_interpret_error_response() {
        let body: ApiResponse<MessageResult> = serde_json::from_value(json!({
            "ok": false,
            "error_code": 400,
            "description": "Bad Request: chat not found"
        }))
        .unwrap();
        let err = interpret_response(body).unwrap_err();
        assert!(matches!(err, AppError::ExternalService(ref msg) if msg.contains("chat not found")));
    }

    #[tokio::test]
    async fn test_send_unconfigured_fails_without_network() {
        let client = TelegramClient::from_config(&config("http://127.0.0.1:9", None, None)).unwrap();
        let err = client.send("hello").await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_send_against_fake_api() {
        let base = spawn_fake_api().await;

        let client = TelegramClient::from_config(&config(&base, Some("123:good"), Some("-100"))).unwrap();
        let sent = client.send("*SPIKE ALERT*").await.unwrap();
        assert_eq!(sent.message_id, "4242");

        let client = TelegramClient::from_config(&config(&base, Some("123:bad"), Some("-100"))).unwrap();
        let err = client.send("*SPIKE ALERT*").await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(ref msg) if msg.contains("Unauthorized")));
    }
}
