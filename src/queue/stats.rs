//! Queue statistics tracking

use std::{
    fmt,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

use serde::{Deserialize, Serialize};

/// Live counters, updated without the queue lock and read without blocking.
///
/// `blocked_readers` / `blocked_writers` are monotonic event counters: they
/// count calls that had to park at least once, and are never decremented.
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Successful pushes
    pub total_pushes: AtomicU64,
    /// Successful pops
    pub total_pops: AtomicU64,
    /// Pop calls that had to wait for data
    pub blocked_readers: AtomicU64,
    /// Push calls that had to wait for space
    pub blocked_writers: AtomicU64,
    /// Mirror of the ring capacity, refreshed under the queue lock
    capacity_bytes: AtomicUsize,
    /// Mirror of the ring occupancy, refreshed under the queue lock
    used_bytes: AtomicUsize,
}

impl QueueStats {
    pub fn record_push(&self) {
        self.total_pushes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pop(&self) {
        self.total_pops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_blocked_reader(&self) {
        self.blocked_readers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_blocked_writer(&self) {
        self.blocked_writers.fetch_add(1, Ordering::Relaxed);
    }

    /// Refresh the capacity/used mirrors
    pub fn update_occupancy(&self, capacity: usize, used: usize) {
        self.capacity_bytes.store(capacity, Ordering::Relaxed);
        self.used_bytes.store(used, Ordering::Relaxed);
    }

    /// Non-blocking, eventually consistent snapshot
    pub fn snapshot(&self) -> StatsSnapshot {
        let capacity = self.capacity_bytes.load(Ordering::Relaxed) as u64;
        let used = self.used_bytes.load(Ordering::Relaxed) as u64;
        StatsSnapshot {
            capacity_bytes: capacity,
            used_bytes: used,
            free_bytes: capacity.saturating_sub(used),
            total_pushes: self.total_pushes.load(Ordering::Relaxed),
            total_pops: self.total_pops.load(Ordering::Relaxed),
            blocked_readers: self.blocked_readers.load(Ordering::Relaxed),
            blocked_writers: self.blocked_writers.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the queue statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub capacity_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub total_pushes: u64,
    pub total_pops: u64,
    pub blocked_readers: u64,
    pub blocked_writers: u64,
}

/// `/proc`-style rendering, one `key: value` per line
impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "queue_size_bytes: {}", self.capacity_bytes)?;
        writeln!(f, "used_bytes: {}", self.used_bytes)?;
        writeln!(f, "free_bytes: {}", self.free_bytes)?;
        writeln!(f, "total_pushes: {}", self.total_pushes)?;
        writeln!(f, "total_pops: {}", self.total_pops)?;
        writeln!(f, "blocked_readers: {}", self.blocked_readers)?;
        writeln!(f, "blocked_writers: {}", self.blocked_writers)
    }
}
