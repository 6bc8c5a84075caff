//! HTTP 接口测试

mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use common::{Fixture, ScriptedSink, pair};
use rust_decimal_macros::dec;
use serde_json::{Value, json};
use spike_alert::api::router;
use tower::ServiceExt;

async fn seeded_app(sink: ScriptedSink) -> (Fixture, Router) {
    let fx = Fixture::new(sink);
    fx.seed_pair("kelkoo", "leads", dec!(100), dec!(150)).await;
    fx.seed_pair("admedia", "leads", dec!(100), dec!(40)).await;
    fx.seed_pair("maxbounty", "leads", dec!(100), dec!(105)).await;

    let handler = fx.handler(
        dec!(20),
        vec![
            pair("kelkoo", "leads"),
            pair("admedia", "leads"),
            pair("maxbounty", "leads"),
        ],
    );
    let app = router(Arc::new(handler));
    (fx, app)
}

async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn run_request(period: &str) -> Request<Body> {
    Request::post("/api/detector/run")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "period": period }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_run_detector_returns_summary() {
    let (fx, app) = seeded_app(ScriptedSink::new()).await;

    let response = app.oneshot(run_request("2025-03-02")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["period"], "2025-03-02");
    assert_eq!(body["evaluated"], 3);
    assert_eq!(body["alerted"], 2);
    assert_eq!(body["skipped_below_threshold"], 1);
    assert_eq!(body["outcomes"][0]["network"], "kelkoo");
    assert_eq!(body["outcomes"][0]["status"], "alerted");
    assert_eq!(body["outcomes"][2]["status"], "below_threshold");
    assert_eq!(fx.sink.sent().len(), 2);
}

#[tokio::test]
async fn test_list_alerts_filters_by_network() {
    let (_fx, app) = seeded_app(ScriptedSink::new()).await;
    app.clone().oneshot(run_request("2025-03-02")).await.unwrap();

    let response = app
        .clone()
        .oneshot(Request::get("/api/alerts").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["page"], 1);

    let response = app
        .oneshot(
            Request::get("/api/alerts?network=Admedia&from=2025-03-01&to=2025-03-02")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = read_json(response).await;
    assert_eq!(body["total"], 1);
    let item = &body["items"][0];
    assert_eq!(item["network"], "admedia");
    assert_eq!(item["direction"], "down");
    assert_eq!(item["dispatch_status"], "sent");
    assert_eq!(item["unbounded"], false);
}

#[tokio::test]
async fn test_list_alerts_paginates() {
    let (_fx, app) = seeded_app(ScriptedSink::new()).await;
    app.clone().oneshot(run_request("2025-03-02")).await.unwrap();

    let response = app
        .oneshot(
            Request::get("/api/alerts?page=2&page_size=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = read_json(response).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["total_pages"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_alerts_far_past_last_page_is_empty() {
    let (_fx, app) = seeded_app(ScriptedSink::new()).await;
    app.clone().oneshot(run_request("2025-03-02")).await.unwrap();

    let response = app
        .oneshot(
            Request::get("/api/alerts?page=4294967295&page_size=200")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["total"], 2);
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_alerts_rejects_inverted_range() {
    let (_fx, app) = seeded_app(ScriptedSink::new()).await;

    let response = app
        .oneshot(
            Request::get("/api/alerts?from=2025-03-05&to=2025-03-01")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );
}

#[tokio::test]
async fn test_send_test_message() {
    let (fx, app) = seeded_app(ScriptedSink::new()).await;

    let response = app
        .oneshot(Request::post("/api/alerts/test").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message_id"], "1");

    let sent = fx.sink.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("Kelkoo metrics change >20%"));
    assert!(sent[0].contains("MaxBounty metrics change >20%"));
}

#[tokio::test]
async fn test_send_test_message_unconfigured() {
    let (fx, app) = seeded_app(ScriptedSink::unconfigured()).await;

    let response = app
        .oneshot(Request::post("/api/alerts/test").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(fx.sink.sent().is_empty());
}

#[tokio::test]
async fn test_run_without_body_uses_today() {
    let (_fx, app) = seeded_app(ScriptedSink::new()).await;

    let response = app
        .oneshot(Request::post("/api/detector/run").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["period"], chrono::Utc::now().date_naive().to_string());
    // 种子数据在 2025-03，今天没有样本
    assert_eq!(body["alerted"], 0);
}
