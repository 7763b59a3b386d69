use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-camera streaming counters
#[derive(Debug, Default)]
pub struct StreamStats {
    chunks_published: AtomicU64,
    bytes_published: AtomicU64,
    active_viewers: AtomicU64,
    total_viewers: AtomicU64,
}

/// Point-in-time copy of [`StreamStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatsSnapshot {
    pub chunks_published: u64,
    pub bytes_published: u64,
    pub active_viewers: u64,
    pub total_viewers: u64,
}

impl StreamStats {
    pub fn record_chunk(&self, size: usize) {
        self.chunks_published.fetch_add(1, Ordering::Relaxed);
        self.bytes_published.fetch_add(size as u64, Ordering::Relaxed);
    }

    pub fn viewer_connected(&self) {
        self.active_viewers.fetch_add(1, Ordering::Relaxed);
        self.total_viewers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn viewer_disconnected(&self) {
        self.active_viewers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StreamStatsSnapshot {
        StreamStatsSnapshot {
            chunks_published: self.chunks_published.load(Ordering::Relaxed),
            bytes_published: self.bytes_published.load(Ordering::Relaxed),
            active_viewers: self.active_viewers.load(Ordering::Relaxed),
            total_viewers: self.total_viewers.load(Ordering::Relaxed),
        }
    }
}
