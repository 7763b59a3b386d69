use super::server::ApiState;
use crate::records::{ErrorRecord, PredictionRecord};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

/// One camera as listed by `/api/cameras`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraView {
    pub id: u32,
    pub device: String,
    pub stream_port: u16,
    pub stream_url: String,
    pub resolution: String,
    pub stream_state: String,
}

/// Body of `/api/status`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub cameras: usize,
    pub models: Vec<String>,
    pub current_model: Option<String>,
    pub total_predictions: usize,
    /// Whole seconds since startup
    pub uptime: u64,
}

pub async fn list_cameras(State(state): State<ApiState>) -> Json<Vec<CameraView>> {
    let cameras = state.monitor.cameras();
    let streams = state.streams.states();

    let views = cameras
        .iter()
        .map(|camera| CameraView {
            id: camera.id,
            device: camera.device.clone(),
            stream_port: camera.port,
            stream_url: format!("http://{}:{}/stream", state.public_host, camera.port),
            resolution: camera.resolution.to_string(),
            stream_state: streams
                .get(&camera.id)
                .map(|s| s.label())
                .unwrap_or("stopped")
                .to_string(),
        })
        .collect();

    Json(views)
}

pub async fn list_predictions(State(state): State<ApiState>) -> Json<Vec<PredictionRecord>> {
    Json(state.monitor.predictions().snapshot())
}

pub async fn list_errors(State(state): State<ApiState>) -> Json<Vec<ErrorRecord>> {
    Json(state.monitor.errors().snapshot())
}

pub async fn status(State(state): State<ApiState>) -> Json<StatusView> {
    let roster = state.monitor.roster();

    Json(StatusView {
        cameras: state.monitor.cameras().len(),
        models: roster.models().to_vec(),
        current_model: roster.current().map(str::to_string),
        total_predictions: state.monitor.predictions().len(),
        uptime: state.monitor.uptime().as_secs(),
    })
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
