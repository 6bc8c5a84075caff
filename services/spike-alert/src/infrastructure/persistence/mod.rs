//! 持久化实现
//!
//! PostgreSQL 为生产实现；内存实现用于未配置数据库的本地调试和测试

mod converters;
mod memory;
mod migrations;
mod postgres;
mod rows;

pub use memory::{InMemoryAlertStore, InMemorySampleSource};
pub use migrations::migrations;
pub use postgres::{PostgresAlertRecordRepository, PostgresSampleSource};
