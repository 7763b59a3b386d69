use super::types::{API, DETECTION, PREDICTIONS, STREAMS};
use super::{CamwatchApp, ComponentState};
use crate::error::{CamwatchError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

const PREDICTIONS_STOP_TIMEOUT: Duration = Duration::from_secs(10);
const API_STOP_TIMEOUT: Duration = Duration::from_secs(5);
// Each capture process gets a SIGTERM grace period before being killed
const STREAMS_STOP_TIMEOUT: Duration = Duration::from_secs(15);

impl CamwatchApp {
    /// Perform graceful shutdown of all components.
    ///
    /// Returns 0 when every component stopped cleanly and 1 otherwise.
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();

        let mut exit_code = 0;

        // Stop components in reverse start order
        if let Some(task) = self.prediction_task.take() {
            let stopped = self
                .stop_component(PREDICTIONS, PREDICTIONS_STOP_TIMEOUT, async move {
                    task.await
                        .map_err(|e| CamwatchError::system(format!("prediction task failed: {}", e)))
                })
                .await;
            if stopped.is_err() {
                exit_code = 1;
            }
        } else {
            self.set_component_state(PREDICTIONS, ComponentState::Stopped)
                .await;
        }

        if let Some(task) = self.api_task.take() {
            let stopped = self
                .stop_component(API, API_STOP_TIMEOUT, async move {
                    task.await
                        .map_err(|e| CamwatchError::system(format!("API task failed: {}", e)))
                })
                .await;
            if stopped.is_err() {
                exit_code = 1;
            }
        } else {
            self.set_component_state(API, ComponentState::Stopped).await;
        }

        let streams = std::sync::Arc::clone(&self.streams);
        let stopped = self
            .stop_component(STREAMS, STREAMS_STOP_TIMEOUT, async move {
                streams.shutdown().await;
                Ok(())
            })
            .await;
        if stopped.is_err() {
            exit_code = 1;
        }

        self.set_component_state(DETECTION, ComponentState::Stopped)
            .await;

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    /// Stop one component, bounding the wait
    async fn stop_component<F>(&self, component: &str, limit: Duration, stop: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        info!("Stopping {} component", component);
        self.set_component_state(component, ComponentState::Stopping)
            .await;

        match timeout(limit, stop).await {
            Ok(Ok(())) => {
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("Error stopping {} component: {}", component, e);
                Err(e)
            }
            Err(_) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                error!("{} component stop timeout", component);
                Err(CamwatchError::system(format!(
                    "{} component stop timeout",
                    component
                )))
            }
        }
    }
}
