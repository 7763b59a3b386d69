use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

/// Fixed-capacity history that evicts its oldest entry on overflow.
///
/// Appends take a short exclusive lock so concurrent writers can never push
/// the length past `capacity`. Reads return newest-first snapshots.
pub struct RingBuffer<T> {
    entries: Mutex<VecDeque<T>>,
    capacity: usize,
    stats: RingBufferStats,
}

/// Statistics for ring buffer monitoring
#[derive(Debug, Default)]
pub struct RingBufferStats {
    /// Total entries ever pushed
    pub pushed: AtomicU64,
    /// Entries evicted to make room
    pub evicted: AtomicU64,
}

/// Snapshot of ring buffer statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingBufferStatsSnapshot {
    pub pushed: u64,
    pub evicted: u64,
}

impl RingBufferStats {
    pub fn snapshot(&self) -> RingBufferStatsSnapshot {
        RingBufferStatsSnapshot {
            pushed: self.pushed.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
        }
    }
}

impl<T: Clone> RingBuffer<T> {
    /// Create a new ring buffer holding at most `capacity` entries
    ///
    /// # Example
    /// ```
    /// use camwatch::ring_buffer::RingBuffer;
    ///
    /// let buffer = RingBuffer::new(2);
    /// buffer.push(1);
    /// buffer.push(2);
    /// buffer.push(3);
    /// assert_eq!(buffer.snapshot(), vec![3, 2]);
    /// ```
    pub fn new(capacity: usize) -> Self {
        if capacity == 0 {
            panic!("Ring buffer capacity must be greater than 0");
        }

        debug!("Created ring buffer with capacity {}", capacity);

        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            stats: RingBufferStats::default(),
        }
    }

    /// Append an entry, evicting the oldest when full
    pub fn push(&self, entry: T) {
        let mut entries = self.entries.lock();
        entries.push_front(entry);
        while entries.len() > self.capacity {
            entries.pop_back();
            self.stats.evicted.fetch_add(1, Ordering::Relaxed);
            trace!("Ring buffer full, evicted oldest entry");
        }
        self.stats.pushed.fetch_add(1, Ordering::Relaxed);
    }

    /// All entries, newest first
    pub fn snapshot(&self) -> Vec<T> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<T> {
        self.entries.lock().front().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> RingBufferStatsSnapshot {
        self.stats.snapshot()
    }
}
