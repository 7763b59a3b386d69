use super::Predictor;
use crate::error::InferenceError;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::debug;

const ERROR_BODY_CHARS: usize = 300;

/// Client for the external prediction API. Failures are reported, never retried.
#[derive(Clone)]
pub struct RemoteInferenceClient {
    client: reqwest::Client,
    endpoint: String,
    threshold: Option<f64>,
}

impl RemoteInferenceClient {
    pub fn new(
        endpoint: impl Into<String>,
        threshold: Option<f64>,
        request_timeout: Duration,
    ) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| InferenceError::Request {
                details: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            threshold,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn build_form(&self, image: Vec<u8>, model: &str) -> Result<Form, InferenceError> {
        let image_part = Part::bytes(image)
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| InferenceError::Request {
                details: format!("Invalid image part: {}", e),
            })?;

        let mut form = Form::new()
            .part("image", image_part)
            .text("model", model.to_string());

        if let Some(threshold) = self.threshold {
            form = form.text("threshold", threshold.to_string());
        }

        Ok(form)
    }

    /// Upload one image for classification with `model`
    pub async fn predict(
        &self,
        image: Vec<u8>,
        model: &str,
    ) -> Result<serde_json::Value, InferenceError> {
        let size = image.len();
        let form = self.build_form(image, model)?;

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| InferenceError::Request {
                details: e.to_string(),
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| InferenceError::Request {
            details: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&body);
            return Err(InferenceError::Status {
                status: status.as_u16(),
                body: text.chars().take(ERROR_BODY_CHARS).collect(),
            });
        }

        let result: serde_json::Value =
            serde_json::from_slice(&body).map_err(|e| InferenceError::MalformedBody {
                details: e.to_string(),
            })?;

        debug!(model = %model, image_bytes = size, "Prediction succeeded");
        Ok(result)
    }
}

#[async_trait]
impl Predictor for RemoteInferenceClient {
    async fn predict(
        &self,
        image: Vec<u8>,
        model: &str,
    ) -> Result<serde_json::Value, InferenceError> {
        RemoteInferenceClient::predict(self, image, model).await
    }
}
