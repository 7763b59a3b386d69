use super::server::{StreamContext, StreamServer};
use super::state::StreamState;
use super::stats::StreamStats;
use crate::backend::VideoCaptureBackend;
use crate::camera::CameraDescriptor;
use crate::config::StreamConfig;
use crate::error::StreamError;
use bytes::{Bytes, BytesMut};
use std::net::SocketAddr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const READ_CHUNK_BYTES: usize = 64 * 1024;
const TERMINATE_GRACE: Duration = Duration::from_secs(5);
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// One camera's continuous capture process, its MJPEG server and their tasks
pub struct StreamHandle {
    camera: CameraDescriptor,
    state: watch::Receiver<StreamState>,
    stats: Arc<StreamStats>,
    local_addr: Option<SocketAddr>,
    token: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

enum Outcome {
    Exited(std::io::Result<std::process::ExitStatus>),
    OutputEnded(Result<std::io::Result<()>, tokio::task::JoinError>),
    Cancelled,
}

impl StreamHandle {
    /// Bind the camera's port, spawn the capture process and start serving.
    ///
    /// Failures leave the handle in `Failed`; the listener is bound before the
    /// process is spawned so a busy port never leaves an orphan capture.
    pub(crate) async fn start(
        backend: &dyn VideoCaptureBackend,
        camera: CameraDescriptor,
        config: &StreamConfig,
        token: CancellationToken,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(StreamState::Starting);
        let state_tx = Arc::new(state_tx);
        let stats = Arc::new(StreamStats::default());
        let mut handle = Self {
            camera,
            state: state_rx,
            stats: Arc::clone(&stats),
            local_addr: None,
            token,
            tasks: Mutex::new(Vec::new()),
        };
        let camera_id = handle.camera.id;

        let server = match StreamServer::bind(&config.ip, handle.camera.port).await {
            Ok(server) => server,
            Err(e) => {
                error!(camera_id, "{}", e);
                state_tx.send_replace(StreamState::Failed(e.to_string()));
                return handle;
            }
        };
        handle.local_addr = Some(server.local_addr());

        let (frames, _) = broadcast::channel(config.channel_capacity.max(1));
        let context = StreamContext {
            camera_id,
            frames: frames.clone(),
            state: handle.state.clone(),
            stats: Arc::clone(&stats),
            shutdown: handle.token.clone(),
        };
        let mut tasks = vec![server.spawn(context)];

        let mut command = backend.continuous_capture(&handle.camera);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match command.spawn() {
            Ok(child) => {
                info!(
                    camera_id,
                    device = %handle.camera.device,
                    pid = ?child.id(),
                    "Started continuous capture"
                );
                tasks.push(tokio::spawn(supervise(
                    camera_id,
                    child,
                    state_tx,
                    frames,
                    stats,
                    handle.token.clone(),
                )));
            }
            Err(source) => {
                let e = StreamError::SpawnFailed { camera_id, source };
                error!(camera_id, "{}", e);
                state_tx.send_replace(StreamState::Failed(e.to_string()));
            }
        }

        handle.tasks = Mutex::new(tasks);
        handle
    }

    pub fn camera(&self) -> &CameraDescriptor {
        &self.camera
    }

    pub fn state(&self) -> StreamState {
        self.state.borrow().clone()
    }

    pub fn stats(&self) -> &Arc<StreamStats> {
        &self.stats
    }

    /// Address the MJPEG server is bound to, if binding succeeded
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Whether the handle still owns a running or starting capture
    pub fn is_live(&self) -> bool {
        self.state().is_serving()
    }

    /// Resolve once the stream has left `Starting`
    pub async fn wait_until_settled(&self) -> StreamState {
        let mut state = self.state.clone();
        let settled = match state.wait_for(StreamState::is_settled).await {
            Ok(settled) => settled.clone(),
            Err(_) => self.state.borrow().clone(),
        };
        settled
    }

    /// Cancel the process and server, then wait for their tasks
    pub async fn stop(&self) {
        self.token.cancel();
        let tasks: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!(camera_id = self.camera.id, "Stream task ended abnormally: {}", e);
            }
        }
    }
}

async fn supervise(
    camera_id: u32,
    mut child: Child,
    state: Arc<watch::Sender<StreamState>>,
    frames: broadcast::Sender<Bytes>,
    stats: Arc<StreamStats>,
    token: CancellationToken,
) {
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(log_stderr(camera_id, stderr));
    }

    let Some(stdout) = child.stdout.take() else {
        state.send_replace(StreamState::Failed("capture stdout unavailable".to_string()));
        return;
    };

    let mut reader = tokio::spawn(pump_output(
        camera_id,
        stdout,
        Arc::clone(&state),
        frames,
        stats,
    ));

    let outcome = tokio::select! {
        status = child.wait() => Outcome::Exited(status),
        read = &mut reader => Outcome::OutputEnded(read),
        _ = token.cancelled() => Outcome::Cancelled,
    };

    match outcome {
        Outcome::Exited(status) => {
            // Publish whatever is still buffered in the pipe before failing
            if tokio::time::timeout(OUTPUT_DRAIN_GRACE, &mut reader)
                .await
                .is_err()
            {
                debug!(camera_id, "Capture output still open after exit, dropping reader");
                reader.abort();
            }
            let reason = match status {
                Ok(status) => format!("capture process exited ({})", status),
                Err(e) => format!("failed to wait for capture process: {}", e),
            };
            warn!(camera_id, "{}", reason);
            state.send_replace(StreamState::Failed(reason));
        }
        Outcome::OutputEnded(read) => {
            let reason = match read {
                Ok(Ok(())) => "capture output closed".to_string(),
                Ok(Err(e)) => format!("failed to read capture output: {}", e),
                Err(e) => format!("capture reader task failed: {}", e),
            };
            warn!(camera_id, "{}", reason);
            state.send_replace(StreamState::Failed(reason));
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        Outcome::Cancelled => {
            reader.abort();
            terminate(camera_id, &mut child).await;
            state.send_replace(StreamState::Stopped);
            info!(camera_id, "Continuous capture stopped");
        }
    }
}

/// Forward stdout chunks verbatim to every subscribed viewer
async fn pump_output(
    camera_id: u32,
    mut stdout: ChildStdout,
    state: Arc<watch::Sender<StreamState>>,
    frames: broadcast::Sender<Bytes>,
    stats: Arc<StreamStats>,
) -> std::io::Result<()> {
    let mut buffer = BytesMut::with_capacity(READ_CHUNK_BYTES);
    let mut first = true;

    loop {
        buffer.reserve(READ_CHUNK_BYTES);
        let read = stdout.read_buf(&mut buffer).await?;
        if read == 0 {
            return Ok(());
        }

        let chunk = buffer.split().freeze();
        stats.record_chunk(chunk.len());

        if first {
            first = false;
            state.send_if_modified(|current| {
                if *current == StreamState::Starting {
                    *current = StreamState::Streaming;
                    true
                } else {
                    false
                }
            });
            info!(camera_id, "Stream producing output");
        }

        // No receivers just means nobody is watching
        let _ = frames.send(chunk);
    }
}

async fn log_stderr<R: AsyncRead + Unpin>(camera_id: u32, stderr: R) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(camera_id, "capture: {}", line);
    }
}

async fn terminate(camera_id: u32, child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id() {
            // SAFETY: plain signal delivery to a pid we spawned and still own
            let _ = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }

    match tokio::time::timeout(TERMINATE_GRACE, child.wait()).await {
        Ok(Ok(status)) => debug!(camera_id, "Capture process exited with {}", status),
        Ok(Err(e)) => warn!(camera_id, "Failed to reap capture process: {}", e),
        Err(_) => {
            warn!(camera_id, "Capture process ignored SIGTERM, killing");
            let _ = child.kill().await;
        }
    }
}
