use super::*;
use crate::error::InferenceError;
use axum::extract::Multipart;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::time::Duration;

/// Echoes the multipart fields it received
async fn echo_handler(mut multipart: Multipart) -> Json<Value> {
    let mut model = None;
    let mut threshold = None;
    let mut image_size = 0usize;
    let mut image_type = None;

    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name().unwrap_or_default().to_string().as_str() {
            "image" => {
                image_type = field.content_type().map(|t| t.to_string());
                image_size = field.bytes().await.unwrap().len();
            }
            "model" => model = Some(field.text().await.unwrap()),
            "threshold" => threshold = Some(field.text().await.unwrap()),
            _ => {}
        }
    }

    Json(json!({
        "model": model,
        "threshold": threshold,
        "imageSize": image_size,
        "imageType": image_type,
        "predictions": [{"label": "person", "confidence": 0.93}],
    }))
}

async fn spawn_prediction_api() -> String {
    let app = Router::new()
        .route("/predict", post(echo_handler))
        .route(
            "/broken",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
        )
        .route("/text", post(|| async { "not json" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}", addr)
}

fn create_client(endpoint: String, threshold: Option<f64>) -> RemoteInferenceClient {
    RemoteInferenceClient::new(endpoint, threshold, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_predict_uploads_fields_and_returns_body() {
    let base = spawn_prediction_api().await;
    let client = create_client(format!("{}/predict", base), Some(0.5));

    let result = client.predict(vec![0xFF, 0xD8, 0xFF, 0xD9], "resnet50").await.unwrap();

    assert_eq!(result["model"], "resnet50");
    assert_eq!(result["threshold"], "0.5");
    assert_eq!(result["imageSize"], 4);
    assert_eq!(result["imageType"], "image/jpeg");
    assert_eq!(result["predictions"][0]["label"], "person");
}

#[tokio::test]
async fn test_predict_omits_threshold_when_unset() {
    let base = spawn_prediction_api().await;
    let client = create_client(format!("{}/predict", base), None);

    let result = client.predict(vec![1, 2, 3], "mobilenet_v3").await.unwrap();

    assert_eq!(result["threshold"], Value::Null);
}

#[tokio::test]
async fn test_predict_error_status() {
    let base = spawn_prediction_api().await;
    let client = create_client(format!("{}/broken", base), None);

    match client.predict(vec![1], "resnet50").await {
        Err(InferenceError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "model crashed");
        }
        other => panic!("Expected status error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_predict_malformed_body() {
    let base = spawn_prediction_api().await;
    let client = create_client(format!("{}/text", base), None);

    assert!(matches!(
        client.predict(vec![1], "resnet50").await,
        Err(InferenceError::MalformedBody { .. })
    ));
}

#[tokio::test]
async fn test_predict_transport_error() {
    // Reserve a port, then free it so nothing is listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = create_client(format!("http://{}/predict", addr), None);

    assert!(matches!(
        client.predict(vec![1], "resnet50").await,
        Err(InferenceError::Request { .. })
    ));
}
