//! 服务启动器
//!
//! 提供统一的 HTTP 服务启动模式

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tellspike_config::AppConfig;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::health::{HealthChecker, health_routes};
use crate::infrastructure::Infrastructure;
use crate::metrics::{MetricsRecorder, spawn_pool_metrics};
use crate::runtime::{init_runtime, shutdown_signal};
use crate::shutdown::ShutdownController;

/// 关闭时等待后台任务（进行中的告警发送等）的上限
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(60);

/// 交给服务构建闭包的上下文
#[derive(Clone)]
pub struct ServiceContext {
    pub infra: Infrastructure,
    pub shutdown: ShutdownController,
}

/// 运行 HTTP 服务
///
/// 1. 加载 `.env` 与配置
/// 2. 初始化日志和 metrics
/// 3. 创建基础设施（数据库带重试）
/// 4. 调用闭包构建业务路由（可在其中启动后台任务）
/// 5. 合并 /health、/ready、/metrics 后启动服务器，收到信号后优雅关闭
/// 6. 等待通过 `ctx.shutdown` 登记的后台任务结束
///
/// ```ignore
/// tellspike_bootstrap::run("config", |ctx| async move {
///     let state = AppState::build(&ctx).await?;
///     Ok(api::router(state))
/// })
/// .await
/// ```
pub async fn run<F, Fut, E>(config_dir: &str, service_builder: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(ServiceContext) -> Fut,
    Fut: Future<Output = Result<Router, E>>,
    E: std::error::Error + 'static,
{
    dotenvy::dotenv().ok();

    let config = AppConfig::load(config_dir)?;
    init_runtime(&config);
    info!("Starting {} service", config.app_name);

    let metrics = MetricsRecorder::install(config.telemetry.metrics_enabled);
    let infra = Infrastructure::from_config(config.clone()).await?;
    let shutdown = ShutdownController::new();

    if let (Some(pool), true) = (infra.postgres_pool(), metrics.is_enabled()) {
        spawn_pool_metrics(pool.clone(), Duration::from_secs(15), shutdown.child_token());
    }

    let checker = Arc::new(HealthChecker::new(infra.clone()));
    let service_router = service_builder(ServiceContext {
        infra,
        shutdown: shutdown.clone(),
    })
    .await?;

    let app = service_router
        .merge(health_routes(checker, metrics))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server starting");

    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = shutdown_signal() => {},
                _ = signal.wait() => {},
            }
            signal.shutdown();
        })
        .await?;

    shutdown.shutdown();
    shutdown.drain(SHUTDOWN_DRAIN_TIMEOUT).await;
    info!("{} service stopped", config.app_name);
    Ok(())
}
