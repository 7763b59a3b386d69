use super::state::MonitorState;
use crate::capture::FrameSource;
use crate::inference::Predictor;
use crate::records::{ErrorRecord, PredictionRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of one timer firing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A previous tick was still outstanding
    Skipped,
    /// No cameras or no models; nothing was attempted
    Idle,
    Completed {
        model: String,
        succeeded: usize,
        failed: usize,
        elapsed: Duration,
    },
}

/// Clears the in-flight flag however the tick ends
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodic capture-and-classify cycle across all cameras
pub struct PredictionOrchestrator {
    frames: Arc<dyn FrameSource>,
    predictor: Arc<dyn Predictor>,
    state: Arc<MonitorState>,
    in_flight: AtomicBool,
}

impl PredictionOrchestrator {
    pub fn new(
        frames: Arc<dyn FrameSource>,
        predictor: Arc<dyn Predictor>,
        state: Arc<MonitorState>,
    ) -> Self {
        Self {
            frames,
            predictor,
            state,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> &Arc<MonitorState> {
        &self.state
    }

    /// Run one tick unless another is still outstanding.
    ///
    /// Every camera is captured and classified concurrently with the current
    /// model; each result lands in the history as it completes. The roster
    /// advances once after all cameras have settled.
    pub async fn try_tick(&self) -> TickOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return TickOutcome::Skipped;
        }
        let _in_flight = InFlight(&self.in_flight);

        let cameras = self.state.cameras();
        let Some(model) = self.state.roster().current().map(str::to_string) else {
            return TickOutcome::Idle;
        };
        if cameras.is_empty() {
            return TickOutcome::Idle;
        }

        let started = Instant::now();
        debug!(model = %model, cameras = cameras.len(), "Starting prediction tick");

        let mut attempts = JoinSet::new();
        let mut task_cameras = HashMap::new();
        for camera in cameras.iter().cloned() {
            let frames = Arc::clone(&self.frames);
            let predictor = Arc::clone(&self.predictor);
            let state = Arc::clone(&self.state);
            let model = model.clone();

            let camera_id = camera.id;
            let task = attempts.spawn(async move {
                let outcome = match frames.capture_frame(&camera).await {
                    Ok(image) => predictor
                        .predict(image, &model)
                        .await
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };

                match outcome {
                    Ok(result) => {
                        debug!(camera_id, model = %model, "Prediction recorded");
                        state.record_prediction(PredictionRecord::new(camera_id, &model, result));
                        true
                    }
                    Err(message) => {
                        warn!(camera_id, model = %model, "Prediction attempt failed: {}", message);
                        state.record_error(ErrorRecord::new(camera_id, message));
                        false
                    }
                }
            });
            task_cameras.insert(task.id(), camera_id);
        }

        let mut succeeded = 0;
        let mut failed = 0;
        while let Some(joined) = attempts.join_next_with_id().await {
            match joined {
                Ok((_, true)) => succeeded += 1,
                Ok((_, false)) => failed += 1,
                Err(e) => {
                    failed += 1;
                    let Some(camera_id) = task_cameras.get(&e.id()).copied() else {
                        error!("Prediction task for unknown camera failed: {}", e);
                        continue;
                    };
                    error!(camera_id, model = %model, "Prediction task failed: {}", e);
                    self.state.record_error(ErrorRecord::new(
                        camera_id,
                        format!("prediction task failed: {}", e),
                    ));
                }
            }
        }

        self.state.roster().advance();
        let elapsed = started.elapsed();

        info!(
            model = %model,
            succeeded,
            failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Prediction tick completed"
        );

        TickOutcome::Completed {
            model,
            succeeded,
            failed,
            elapsed,
        }
    }

    /// Fire a tick every `period` until cancelled.
    ///
    /// Ticks run as their own tasks so a slow tick cannot stall the timer;
    /// a firing that finds a tick outstanding is dropped.
    pub async fn run(self: Arc<Self>, token: CancellationToken, period: Duration) {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = JoinSet::new();

        info!(period = ?period, "Prediction loop started");

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    let orchestrator = Arc::clone(&self);
                    ticks.spawn(async move {
                        if orchestrator.try_tick().await == TickOutcome::Skipped {
                            debug!("Previous prediction tick still running, skipping");
                        }
                    });
                }
                Some(_) = ticks.join_next(), if !ticks.is_empty() => {}
            }
        }

        // Dropping in-flight ticks kills their capture processes
        ticks.shutdown().await;
        info!("Prediction loop stopped");
    }
}
