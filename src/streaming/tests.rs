use super::*;
use crate::backend::scripted::ScriptedBackend;
use crate::backend::{FfmpegBackend, VideoCaptureBackend};
use crate::camera::{CameraDescriptor, Resolution};
use crate::config::StreamConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const FRAME_SCRIPT: &str = "sleep 1; i=1; while [ $i -le 40 ]; do printf \"frame-$i\"; i=$((i+1)); sleep 0.1; done; sleep 30";

fn create_test_config() -> StreamConfig {
    StreamConfig {
        ip: "127.0.0.1".to_string(),
        public_host: "127.0.0.1".to_string(),
        channel_capacity: 64,
    }
}

fn create_test_camera(id: u32, port: u16) -> CameraDescriptor {
    CameraDescriptor {
        id,
        device: format!("/dev/video{}", id),
        port,
        resolution: Resolution::new(1280, 720),
        fps: 30,
    }
}

fn create_manager(backend: &Arc<ScriptedBackend>) -> StreamProcessManager {
    let backend: Arc<dyn VideoCaptureBackend> = backend.clone();
    StreamProcessManager::new(backend, create_test_config())
}

fn expected_stream() -> String {
    (1..=40).map(|i| format!("frame-{}", i)).collect()
}

/// Multipart reader over a viewer's response body
struct Viewer {
    response: reqwest::Response,
    buffer: Vec<u8>,
}

impl Viewer {
    async fn connect(addr: SocketAddr) -> Self {
        let response = reqwest::get(format!("http://{}/stream", addr)).await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()["content-type"],
            "multipart/x-mixed-replace; boundary=frame"
        );
        Self {
            response,
            buffer: Vec::new(),
        }
    }

    /// Next complete part payload, or None once the body ends
    async fn next_part(&mut self) -> Option<Vec<u8>> {
        loop {
            if let Some(part) = take_part(&mut self.buffer) {
                return Some(part);
            }
            let chunk = tokio::time::timeout(Duration::from_secs(5), self.response.chunk())
                .await
                .expect("viewer timed out waiting for data");
            match chunk {
                Ok(Some(bytes)) => self.buffer.extend_from_slice(&bytes),
                _ => return None,
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn take_part(buffer: &mut Vec<u8>) -> Option<Vec<u8>> {
    let delimiter = b"--frame\r\n";
    if buffer.len() < delimiter.len() {
        return None;
    }
    assert!(buffer.starts_with(delimiter), "part must start with the boundary");

    let header_end = find(buffer, b"\r\n\r\n")?;
    let headers = String::from_utf8_lossy(&buffer[delimiter.len()..header_end]).to_string();
    assert!(headers.contains("Content-Type: image/jpeg"));
    let length: usize = headers
        .lines()
        .find_map(|line| line.strip_prefix("Content-Length: "))
        .expect("part carries a content length")
        .trim()
        .parse()
        .unwrap();

    let body_start = header_end + 4;
    let part_end = body_start + length + 2;
    if buffer.len() < part_end {
        return None;
    }

    let payload = buffer[body_start..body_start + length].to_vec();
    assert_eq!(&buffer[body_start + length..part_end], b"\r\n");
    buffer.drain(..part_end);
    Some(payload)
}

#[test]
fn test_encode_part_framing() {
    let part = encode_part(b"abc");

    assert_eq!(
        &part[..],
        b"--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 3\r\n\r\nabc\r\n"
    );
}

#[test]
fn test_stream_state_predicates() {
    assert!(StreamState::Starting.is_serving());
    assert!(StreamState::Streaming.is_serving());
    assert!(!StreamState::Stopped.is_serving());
    assert!(!StreamState::Failed("gone".to_string()).is_serving());

    assert!(!StreamState::Starting.is_settled());
    assert!(StreamState::Streaming.is_settled());
    assert_eq!(StreamState::Failed("gone".to_string()).to_string(), "failed: gone");
}

#[tokio::test]
async fn test_first_output_moves_to_streaming() {
    let backend = Arc::new(ScriptedBackend::with_devices(&[]).continuous("printf hello; sleep 30"));
    let manager = create_manager(&backend);

    manager.start_all(&[create_test_camera(0, 0)]).await;

    assert_eq!(manager.wait_until_settled(0).await, Some(StreamState::Streaming));
    assert_eq!(manager.stats(0).unwrap().chunks_published, 1);

    manager.shutdown().await;
    assert_eq!(manager.state(0), Some(StreamState::Stopped));
}

#[tokio::test]
async fn test_viewers_share_one_capture_process() {
    let backend = Arc::new(ScriptedBackend::with_devices(&[]).continuous(FRAME_SCRIPT));
    let manager = create_manager(&backend);
    manager.start_all(&[create_test_camera(0, 0)]).await;
    let addr = manager.local_addr(0).unwrap();

    let mut first = Viewer::connect(addr).await;
    let mut second = Viewer::connect(addr).await;
    assert_eq!(manager.stats(0).unwrap().active_viewers, 2);

    let mut first_parts: Vec<Vec<u8>> = Vec::new();
    while !first_parts.concat().windows(8).any(|w| w == b"frame-10") {
        first_parts.push(first.next_part().await.unwrap());
    }
    let mut second_parts = Vec::new();
    while second_parts.len() < first_parts.len() {
        second_parts.push(second.next_part().await.unwrap());
    }
    assert_eq!(first_parts, second_parts);
    assert!(first_parts[0].starts_with(b"frame-1"));
    assert_eq!(backend.spawn_count(), 1);

    // The remaining viewer keeps receiving after the other leaves
    drop(second);
    let mut received = String::from_utf8(first_parts.concat()).unwrap();
    while !received.contains("frame-20") {
        let part = first.next_part().await.unwrap();
        received.push_str(&String::from_utf8(part).unwrap());
    }
    assert!(expected_stream().starts_with(&received));

    let mut waited = Duration::ZERO;
    while manager.stats(0).unwrap().active_viewers != 1 && waited < Duration::from_secs(3) {
        tokio::time::sleep(Duration::from_millis(50)).await;
        waited += Duration::from_millis(50);
    }
    assert_eq!(manager.stats(0).unwrap().active_viewers, 1);
    assert_eq!(manager.stats(0).unwrap().total_viewers, 2);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_final_output_is_published_before_failing() {
    for _ in 0..5 {
        let backend = Arc::new(
            ScriptedBackend::with_devices(&[]).continuous("sleep 0.5; printf last-frame; exit 0"),
        );
        let manager = create_manager(&backend);
        manager.start_all(&[create_test_camera(0, 0)]).await;
        let mut viewer = Viewer::connect(manager.local_addr(0).unwrap()).await;

        assert_eq!(viewer.next_part().await.as_deref(), Some(&b"last-frame"[..]));
        assert_eq!(viewer.next_part().await, None);

        let state = manager.wait_until_settled(0).await.unwrap();
        assert!(matches!(state, StreamState::Failed(_)), "got {:?}", state);
        assert_eq!(manager.stats(0).unwrap().chunks_published, 1);

        manager.shutdown().await;
    }
}

#[tokio::test]
async fn test_process_exit_fails_stream_and_rejects_viewers() {
    let backend = Arc::new(ScriptedBackend::with_devices(&[]).continuous("exit 3"));
    let manager = create_manager(&backend);
    manager.start_all(&[create_test_camera(0, 0)]).await;

    let state = manager.wait_until_settled(0).await.unwrap();
    assert!(matches!(state, StreamState::Failed(_)), "got {:?}", state);

    let addr = manager.local_addr(0).unwrap();
    let response = reqwest::get(format!("http://{}/stream", addr)).await.unwrap();
    assert_eq!(response.status(), 503);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_spawn_failure_marks_stream_failed() {
    let backend: Arc<dyn VideoCaptureBackend> =
        Arc::new(FfmpegBackend::new("/nonexistent/camwatch-ffmpeg"));
    let manager = StreamProcessManager::new(backend, create_test_config());

    manager.start_all(&[create_test_camera(0, 0)]).await;

    assert!(matches!(manager.state(0), Some(StreamState::Failed(_))));
    manager.shutdown().await;
}

#[tokio::test]
async fn test_busy_port_fails_without_spawning() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let backend = Arc::new(ScriptedBackend::with_devices(&[]).continuous("sleep 30"));
    let manager = create_manager(&backend);
    manager.start_all(&[create_test_camera(0, port)]).await;

    assert!(matches!(manager.state(0), Some(StreamState::Failed(_))));
    assert_eq!(manager.local_addr(0), None);
    assert_eq!(backend.spawn_count(), 0);
}

#[tokio::test]
async fn test_failure_is_isolated_per_camera() {
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let backend = Arc::new(ScriptedBackend::with_devices(&[]).continuous("printf ok; sleep 30"));
    let manager = create_manager(&backend);
    manager
        .start_all(&[create_test_camera(0, port), create_test_camera(1, 0)])
        .await;

    assert!(matches!(manager.state(0), Some(StreamState::Failed(_))));
    assert_eq!(manager.wait_until_settled(1).await, Some(StreamState::Streaming));
    assert_eq!(manager.states().len(), 2);

    manager.shutdown().await;
}

#[tokio::test]
async fn test_start_all_skips_live_streams() {
    let backend = Arc::new(ScriptedBackend::with_devices(&[]).continuous("sleep 30"));
    let manager = create_manager(&backend);
    let cameras = [create_test_camera(0, 0)];

    manager.start_all(&cameras).await;
    manager.start_all(&cameras).await;

    assert_eq!(backend.spawn_count(), 1);
    assert_eq!(manager.state(0), Some(StreamState::Starting));

    manager.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_stops_process_and_ends_viewers() {
    let backend = Arc::new(
        ScriptedBackend::with_devices(&[]).continuous("while true; do printf x; sleep 0.1; done"),
    );
    let manager = create_manager(&backend);
    manager.start_all(&[create_test_camera(0, 0)]).await;
    let addr = manager.local_addr(0).unwrap();

    let mut viewer = Viewer::connect(addr).await;
    assert!(viewer.next_part().await.is_some());

    manager.shutdown().await;
    assert_eq!(manager.state(0), Some(StreamState::Stopped));

    // Drain whatever was already in flight; the body must then end
    let mut remaining = 0;
    while viewer.next_part().await.is_some() {
        remaining += 1;
        assert!(remaining < 100, "viewer stream did not end after shutdown");
    }
}
