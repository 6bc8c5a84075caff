//! 基础设施资源管理
//!
//! 数据库连接池与通知客户端由 bootstrap 统一创建，服务只负责组装

use std::sync::Arc;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use tellspike_adapter_postgres::{PostgresConfig, create_pool};
use tellspike_adapter_telegram::TelegramClient;
use tellspike_common::{RetryConfig, is_transient_error, with_conditional_retry};
use tellspike_config::AppConfig;
use tellspike_errors::AppResult;
use tracing::{info, warn};

/// 基础设施资源容器
#[derive(Clone)]
pub struct Infrastructure {
    config: AppConfig,
    /// 未配置 database 时为 None，服务退回内存存储
    postgres_pool: Option<PgPool>,
    telegram: Arc<TelegramClient>,
}

impl Infrastructure {
    /// 从配置创建基础设施资源（数据库连接带重试）
    pub async fn from_config(config: AppConfig) -> AppResult<Self> {
        let postgres_pool = match &config.database {
            Some(db) => {
                let pg_config = PostgresConfig::new(db.url.expose_secret())
                    .with_max_connections(db.max_connections)
                    .with_acquire_timeout(Duration::from_secs(10));
                let pool = with_conditional_retry(
                    &RetryConfig::default(),
                    "PostgreSQL connection",
                    || {
                        let cfg = pg_config.clone();
                        async move { create_pool(&cfg).await }
                    },
                    |e| is_transient_error(&e.to_string()),
                )
                .await?;
                info!(
                    max_connections = db.max_connections,
                    "PostgreSQL connection pool created"
                );
                Some(pool)
            }
            None => {
                warn!("Database not configured, alert history is kept in memory only");
                None
            }
        };

        let telegram = Arc::new(TelegramClient::from_config(&config.telegram)?);

        Ok(Self {
            config,
            postgres_pool,
            telegram,
        })
    }

    /// 仅用于测试：不连接数据库
    pub fn in_memory(config: AppConfig) -> AppResult<Self> {
        let telegram = Arc::new(TelegramClient::from_config(&config.telegram)?);
        Ok(Self {
            config,
            postgres_pool: None,
            telegram,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn postgres_pool(&self) -> Option<&PgPool> {
        self.postgres_pool.as_ref()
    }

    pub fn telegram(&self) -> Arc<TelegramClient> {
        self.telegram.clone()
    }
}
