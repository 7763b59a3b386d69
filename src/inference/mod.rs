mod client;
#[cfg(test)]
mod tests;

pub use client::RemoteInferenceClient;

use crate::error::InferenceError;
use async_trait::async_trait;

/// Remote classifier taking one encoded image and a model id
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Classify the image with the given model, returning the opaque result
    async fn predict(&self, image: Vec<u8>, model: &str)
        -> Result<serde_json::Value, InferenceError>;
}
