use super::{CamwatchApp, ShutdownReason};
use crate::error::{CamwatchError, Result};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info};

impl CamwatchApp {
    /// Run until a shutdown signal arrives, then stop everything
    pub async fn run(&mut self) -> Result<i32> {
        info!("camwatch is running");

        let shutdown_sender = self
            .shutdown_sender
            .take()
            .ok_or_else(|| CamwatchError::system("Shutdown sender already taken"))?;

        let shutdown_receiver = self
            .shutdown_receiver
            .take()
            .ok_or_else(|| CamwatchError::system("Shutdown receiver already taken"))?;

        self.setup_signal_handlers(shutdown_sender);

        let shutdown_reason = shutdown_receiver
            .await
            .map_err(|_| CamwatchError::system("Shutdown channel closed unexpectedly"))?;

        info!("Shutdown initiated: {:?}", shutdown_reason);

        let exit_code = self.shutdown().await?;

        info!("camwatch shutdown complete");
        Ok(exit_code)
    }

    fn setup_signal_handlers(&self, shutdown_sender: oneshot::Sender<ShutdownReason>) {
        let shutdown_sender = Arc::new(Mutex::new(Some(shutdown_sender)));

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let sender = Arc::clone(&shutdown_sender);
            tokio::spawn(async move {
                let mut sigterm = match signal(SignalKind::terminate()) {
                    Ok(sigterm) => sigterm,
                    Err(e) => {
                        error!("Failed to register SIGTERM handler: {}", e);
                        return;
                    }
                };
                if sigterm.recv().await.is_some() {
                    info!("Received SIGTERM signal");
                    if let Some(sender) = sender.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGTERM".to_string()));
                    }
                }
            });
        }

        let sender = Arc::clone(&shutdown_sender);
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received SIGINT signal (Ctrl+C)");
                    if let Some(sender) = sender.lock().await.take() {
                        let _ = sender.send(ShutdownReason::Signal("SIGINT".to_string()));
                    }
                }
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        });
    }
}
