//! 路由与处理函数

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use tracing::info;

use super::dto::{
    ListAlertsParams, ListAlertsResponse, RunDetectorRequest, TestMessageResponse,
};
use super::error::ApiError;
use crate::application::commands::RunDetectorCommand;
use crate::application::{RunSummary, ServiceHandler};

pub fn router(handler: Arc<ServiceHandler>) -> Router {
    Router::new()
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/test", post(send_test_message))
        .route("/api/detector/run", post(run_detector))
        .with_state(handler)
}

/// 告警历史
async fn list_alerts(
    State(handler): State<Arc<ServiceHandler>>,
    Query(params): Query<ListAlertsParams>,
) -> Result<Json<ListAlertsResponse>, ApiError> {
    let query = params.into_query()?;
    let result = handler.list_alerts(query).await?;
    Ok(Json(result.into()))
}

/// 连通性测试
async fn send_test_message(
    State(handler): State<Arc<ServiceHandler>>,
) -> Result<Json<TestMessageResponse>, ApiError> {
    info!("Test message requested");
    let sent = handler.send_test_message().await?;
    Ok(Json(TestMessageResponse {
        success: true,
        message_id: sent.message_id,
    }))
}

/// 手动运行检测
async fn run_detector(
    State(handler): State<Arc<ServiceHandler>>,
    body: Option<Json<RunDetectorRequest>>,
) -> Json<RunSummary> {
    let period = body.and_then(|Json(request)| request.period);
    info!(period = ?period, "Manual detector run requested");
    Json(handler.run_detector(RunDetectorCommand { period }).await)
}
