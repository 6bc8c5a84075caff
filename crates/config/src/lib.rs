//! tellspike-config - 配置加载库
//!
//! 加载顺序（后者覆盖前者）：
//! 1. `{config_dir}/default.toml`
//! 2. `{config_dir}/{APP_ENV}.toml`
//! 3. `TELLSPIKE_` 前缀环境变量，`__` 表示层级（如 `TELLSPIKE_DETECTOR__CONCURRENCY`）
//! 4. 兼容旧部署的扁平环境变量（`SPIKE_THRESHOLD_PERCENT`、`TELEGRAM_BOT_TOKEN` 等）

use std::collections::HashMap;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
    value::Uncased,
};
use rust_decimal::Decimal;
use secrecy::Secret;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 旧部署使用的扁平环境变量 -> 配置路径
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("SPIKE_THRESHOLD_PERCENT", "spike.threshold_percent"),
    ("TELEGRAM_BOT_TOKEN", "telegram.bot_token"),
    ("TELEGRAM_CHAT_ID", "telegram.chat_id"),
    ("FRONTEND_URL", "dashboard.base_url"),
    ("DATABASE_URL", "database.url"),
];

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// 启动时是否执行内置迁移
    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    match std::env::var("APP_ENV").as_deref() {
        Ok("production") => 20,
        _ => 5,
    }
}

fn default_true() -> bool {
    true
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// 遥测配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// 是否暴露 /metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            metrics_enabled: true,
        }
    }
}

/// 突增阈值配置
#[derive(Debug, Clone, Deserialize)]
pub struct SpikeConfig {
    /// 全局阈值（百分比）
    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: Decimal,
    /// 按网络覆盖的阈值，键为网络标识（小写）
    #[serde(default)]
    pub network_overrides: HashMap<String, Decimal>,
}

fn default_threshold_percent() -> Decimal {
    Decimal::from(20)
}

impl Default for SpikeConfig {
    fn default() -> Self {
        Self {
            threshold_percent: default_threshold_percent(),
            network_overrides: HashMap::new(),
        }
    }
}

/// 检测器运行配置
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_networks")]
    pub networks: Vec<String>,
    #[serde(default = "default_metrics")]
    pub metrics: Vec<String>,
    /// 两次运行间隔，0 表示只运行一次
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// 并发评估的 (network, metric) 数量上限
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// 单次运行超时，超时后不再开始新的评估
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
    /// 发送预留的租约时长，进程崩溃遗留的预留在到期后可被重新获取；
    /// 周期运行时必须长于 interval_secs
    #[serde(default = "default_reservation_lease_secs")]
    pub reservation_lease_secs: u64,
}

fn default_networks() -> Vec<String> {
    vec![
        "kelkoo".to_string(),
        "admedia".to_string(),
        "maxbounty".to_string(),
    ]
}

fn default_metrics() -> Vec<String> {
    vec!["leads".to_string(), "revenue".to_string()]
}

fn default_interval_secs() -> u64 {
    3600
}

fn default_concurrency() -> usize {
    4
}

fn default_run_timeout_secs() -> u64 {
    300
}

fn default_reservation_lease_secs() -> u64 {
    2 * default_interval_secs()
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            networks: default_networks(),
            metrics: default_metrics(),
            interval_secs: default_interval_secs(),
            concurrency: default_concurrency(),
            run_timeout_secs: default_run_timeout_secs(),
            reservation_lease_secs: default_reservation_lease_secs(),
        }
    }
}

impl DetectorConfig {
    /// 网络与指标的笛卡尔积
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.networks
            .iter()
            .flat_map(|network| {
                self.metrics
                    .iter()
                    .map(move |metric| (network.clone(), metric.clone()))
            })
            .collect()
    }
}

/// Telegram Bot 配置
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: Option<Secret<String>>,
    /// 群组 chat id 是负数，环境变量会被解析为整数
    #[serde(default, deserialize_with = "string_or_integer")]
    pub chat_id: Option<String>,
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn string_or_integer<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Integer(i64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Integer(n) => n.to_string(),
    }))
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: default_telegram_api_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// 看板配置
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_dashboard_url")]
    pub base_url: String,
}

fn default_dashboard_url() -> String {
    "https://googleadsdashboard-beta.vercel.app".to_string()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: default_dashboard_url(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_env")]
    pub app_env: String,
    /// 未配置时使用内存存储（仅适合本地调试）
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub spike: SpikeConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

fn default_app_name() -> String {
    "tellspike".to_string()
}

fn default_app_env() -> String {
    "development".to_string()
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    pub fn load(config_dir: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| default_app_env());

        let figment = Figment::new()
            .merge(Toml::file(format!("{}/default.toml", config_dir)))
            .merge(Toml::file(format!("{}/{}.toml", config_dir, env)))
            .merge(Env::prefixed("TELLSPIKE_").split("__"))
            .merge(legacy_env())
            .merge(("app_env", env));

        Self::from_figment(figment)
    }

    /// 从任意 figment 提取并校验
    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// 启动期校验，任何一项失败都应终止进程
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spike.threshold_percent <= Decimal::ZERO {
            return Err(ConfigError::Invalid(format!(
                "spike.threshold_percent must be positive, got {}",
                self.spike.threshold_percent
            )));
        }
        if let Some((network, value)) = self
            .spike
            .network_overrides
            .iter()
            .find(|(_, value)| **value <= Decimal::ZERO)
        {
            return Err(ConfigError::Invalid(format!(
                "spike.network_overrides.{} must be positive, got {}",
                network, value
            )));
        }
        if self.detector.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "detector.concurrency must be at least 1".to_string(),
            ));
        }
        if self.detector.interval_secs > 0
            && self.detector.reservation_lease_secs <= self.detector.interval_secs
        {
            return Err(ConfigError::Invalid(format!(
                "detector.reservation_lease_secs ({}) must exceed detector.interval_secs ({})",
                self.detector.reservation_lease_secs, self.detector.interval_secs
            )));
        }
        if self.detector.networks.is_empty() || self.detector.metrics.is_empty() {
            return Err(ConfigError::Invalid(
                "detector.networks and detector.metrics must not be empty".to_string(),
            ));
        }
        if let Err(e) = url::Url::parse(&self.dashboard.base_url) {
            return Err(ConfigError::Invalid(format!(
                "dashboard.base_url is not a valid URL: {}",
                e
            )));
        }
        Ok(())
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.app_env == "production"
    }

    /// 是否为开发环境
    pub fn is_development(&self) -> bool {
        self.app_env == "development"
    }
}

fn legacy_env() -> Env {
    let keys: Vec<&str> = LEGACY_ENV_KEYS.iter().map(|(env, _)| *env).collect();
    Env::raw().only(&keys).map(|key| {
        LEGACY_ENV_KEYS
            .iter()
            .find(|(env, _)| key.as_str().eq_ignore_ascii_case(env))
            .map(|(_, path)| Uncased::from(*path))
            .unwrap_or_else(|| Uncased::from(key.as_str()))
    })
}
