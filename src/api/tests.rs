use super::*;
use crate::backend::scripted::ScriptedBackend;
use crate::backend::VideoCaptureBackend;
use crate::camera::{CameraDescriptor, Resolution};
use crate::config::StreamConfig;
use crate::prediction::MonitorState;
use crate::records::{ErrorRecord, PredictionRecord};
use crate::streaming::StreamProcessManager;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_state(models: &[&str], cameras: u32) -> ApiState {
    let monitor = MonitorState::new(models.iter().map(|m| m.to_string()).collect(), 100, 50);
    monitor.replace_cameras(
        (0..cameras)
            .map(|id| CameraDescriptor {
                id,
                device: format!("/dev/video{}", id),
                port: 8081 + id as u16,
                resolution: Resolution::new(1920, 1080),
                fps: 30,
            })
            .collect(),
    );

    let backend: Arc<dyn VideoCaptureBackend> = Arc::new(ScriptedBackend::default());
    let streams = StreamProcessManager::new(
        backend,
        StreamConfig {
            ip: "127.0.0.1".to_string(),
            public_host: "camwatch.local".to_string(),
            channel_capacity: 8,
        },
    );

    ApiState {
        monitor: Arc::new(monitor),
        streams: Arc::new(streams),
        public_host: "camwatch.local".to_string(),
    }
}

async fn get_json(state: ApiState, uri: &str) -> (StatusCode, Value) {
    let response = create_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health() {
    let (status, body) = get_json(create_test_state(&[], 0), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_cameras_lists_stream_urls() {
    let (status, body) = get_json(create_test_state(&["a"], 2), "/api/cameras").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body[1],
        json!({
            "id": 1,
            "device": "/dev/video1",
            "streamPort": 8082,
            "streamUrl": "http://camwatch.local:8082/stream",
            "resolution": "1920x1080",
            "streamState": "stopped",
        })
    );
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_status_with_zero_cameras() {
    let (_, body) = get_json(create_test_state(&[], 0), "/api/status").await;

    assert_eq!(body["cameras"], 0);
    assert_eq!(body["models"], json!([]));
    assert_eq!(body["currentModel"], Value::Null);
    assert_eq!(body["totalPredictions"], 0);
    assert!(body["uptime"].is_u64());
}

#[tokio::test]
async fn test_status_reports_roster_and_history() {
    let state = create_test_state(&["resnet50", "mobilenet_v3"], 3);
    state.monitor.roster().advance();
    state
        .monitor
        .record_prediction(PredictionRecord::new(0, "resnet50", json!({"label": "cat"})));

    let (_, body) = get_json(state, "/api/status").await;

    assert_eq!(body["cameras"], 3);
    assert_eq!(body["models"], json!(["resnet50", "mobilenet_v3"]));
    assert_eq!(body["currentModel"], "mobilenet_v3");
    assert_eq!(body["totalPredictions"], 1);
}

#[tokio::test]
async fn test_predictions_newest_first() {
    let state = create_test_state(&["a"], 2);
    state
        .monitor
        .record_prediction(PredictionRecord::new(0, "a", json!({"n": 1})));
    state
        .monitor
        .record_prediction(PredictionRecord::new(1, "a", json!({"n": 2})));

    let (_, body) = get_json(state, "/api/predictions").await;

    assert_eq!(body[0]["cameraId"], 1);
    assert_eq!(body[0]["result"]["n"], 2);
    assert_eq!(body[1]["cameraId"], 0);
    assert!(body[0]["timestamp"].is_string());
}

#[tokio::test]
async fn test_errors_listed() {
    let state = create_test_state(&["a"], 1);
    state
        .monitor
        .record_error(ErrorRecord::new(0, "capture timed out"));

    let (_, body) = get_json(state, "/api/errors").await;

    assert_eq!(body[0]["cameraId"], 0);
    assert_eq!(body[0]["error"], "capture timed out");
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let response = create_router(create_test_state(&[], 0))
        .oneshot(
            Request::builder()
                .uri("/api/status")
                .header("origin", "http://dashboard.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.headers()["access-control-allow-origin"], "*");
}

#[tokio::test]
async fn test_server_serves_until_cancelled() {
    let server = ApiServer::bind("127.0.0.1", 0).await.unwrap();
    let addr = server.local_addr();
    let token = tokio_util::sync::CancellationToken::new();
    let handle = tokio::spawn(server.serve(create_test_state(&[], 0), token.clone()));

    let body: Value = reqwest::get(format!("http://{}/health", addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");

    token.cancel();
    handle.await.unwrap();
}
