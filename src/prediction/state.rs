use super::roster::ModelRoster;
use crate::camera::CameraDescriptor;
use crate::config::CamwatchConfig;
use crate::records::{ErrorRecord, PredictionRecord};
use crate::ring_buffer::RingBuffer;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared monitor state read by the snapshot API and written by the
/// prediction cycle.
///
/// The camera list is replaced as a whole so readers always see either the
/// old or the new list, never a mix.
pub struct MonitorState {
    cameras: RwLock<Arc<Vec<CameraDescriptor>>>,
    roster: ModelRoster,
    predictions: RingBuffer<PredictionRecord>,
    errors: RingBuffer<ErrorRecord>,
    started_at: Instant,
}

impl MonitorState {
    pub fn new(models: Vec<String>, prediction_capacity: usize, error_capacity: usize) -> Self {
        Self {
            cameras: RwLock::new(Arc::new(Vec::new())),
            roster: ModelRoster::new(models),
            predictions: RingBuffer::new(prediction_capacity),
            errors: RingBuffer::new(error_capacity),
            started_at: Instant::now(),
        }
    }

    pub fn from_config(config: &CamwatchConfig) -> Self {
        Self::new(
            config.inference.models.clone(),
            config.history.prediction_capacity,
            config.history.error_capacity,
        )
    }

    /// Current camera list
    pub fn cameras(&self) -> Arc<Vec<CameraDescriptor>> {
        Arc::clone(&self.cameras.read())
    }

    pub fn replace_cameras(&self, cameras: Vec<CameraDescriptor>) {
        *self.cameras.write() = Arc::new(cameras);
    }

    pub fn roster(&self) -> &ModelRoster {
        &self.roster
    }

    pub fn predictions(&self) -> &RingBuffer<PredictionRecord> {
        &self.predictions
    }

    pub fn errors(&self) -> &RingBuffer<ErrorRecord> {
        &self.errors
    }

    pub fn record_prediction(&self, record: PredictionRecord) {
        self.predictions.push(record);
    }

    pub fn record_error(&self, record: ErrorRecord) {
        self.errors.push(record);
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
