use super::server::StreamContext;
use super::stats::StreamStats;
use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Multipart boundary separating frames
pub const BOUNDARY: &str = "frame";

/// Wrap one subprocess chunk as a multipart part
pub fn encode_part(chunk: &[u8]) -> Bytes {
    let header = format!(
        "--{}\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        BOUNDARY,
        chunk.len()
    );

    let mut part = BytesMut::with_capacity(header.len() + chunk.len() + 2);
    part.put_slice(header.as_bytes());
    part.put_slice(chunk);
    part.put_slice(b"\r\n");
    part.freeze()
}

enum Next {
    Part(Bytes),
    Skip,
    End,
}

/// Decrements the active viewer count when the response body is dropped
struct ViewerGuard(Arc<StreamStats>);

impl Drop for ViewerGuard {
    fn drop(&mut self) {
        self.0.viewer_disconnected();
    }
}

/// Handler for the per-camera MJPEG endpoint
pub async fn mjpeg_stream_handler(State(ctx): State<StreamContext>) -> Response {
    let camera_id = ctx.camera_id;

    let current = ctx.state.borrow().clone();
    if !current.is_serving() {
        debug!(camera_id, state = %current, "Rejecting viewer, stream not serving");
        return (StatusCode::SERVICE_UNAVAILABLE, "Stream unavailable").into_response();
    }

    // Subscribe before the response exists so no chunk after this point is missed
    let mut frames = ctx.frames.subscribe();
    let mut state = ctx.state.clone();
    let shutdown = ctx.shutdown.clone();
    ctx.stats.viewer_connected();
    let guard = ViewerGuard(Arc::clone(&ctx.stats));

    info!(camera_id, "New MJPEG stream client connected");

    let stream = async_stream::stream! {
        let _guard = guard;

        loop {
            // Buffered chunks go out before a state change ends the body
            let next = tokio::select! {
                biased;
                received = frames.recv() => match received {
                    Ok(chunk) => Next::Part(encode_part(&chunk)),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(camera_id, skipped, "Viewer fell behind, skipping chunks");
                        Next::Skip
                    }
                    Err(RecvError::Closed) => Next::End,
                },
                changed = state.changed() => {
                    if changed.is_err() || !state.borrow_and_update().is_serving() {
                        Next::End
                    } else {
                        Next::Skip
                    }
                }
                _ = shutdown.cancelled() => Next::End,
            };

            match next {
                Next::Part(part) => yield Ok::<Bytes, std::io::Error>(part),
                Next::Skip => continue,
                Next::End => break,
            }
        }

        debug!(camera_id, "MJPEG stream client finished");
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/x-mixed-replace; boundary={}", BOUNDARY),
        )
        .header(header::CACHE_CONTROL, "no-cache, no-store, must-revalidate")
        .header(header::PRAGMA, "no-cache")
        .body(Body::from_stream(stream))
        .unwrap_or_else(|e| {
            error!(camera_id, "Failed to build stream response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}
