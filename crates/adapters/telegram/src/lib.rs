//! tellspike-adapter-telegram - Telegram Bot 通知适配器
//!
//! 通过 Bot API `sendMessage` 将告警推送到指定 chat。

mod client;
mod error;

pub use client::TelegramClient;
pub use error::map_transport_error;
