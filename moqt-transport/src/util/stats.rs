use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Network telemetry counters for one session.
///
/// These are best-effort atomics; hot paths bump them without locking and
/// whoever renders the stats reads a [StatsSnapshot].
#[derive(Default, Debug)]
pub struct SessionStats {
    /// Objects delivered into playout buffers.
    pub objects_received: AtomicU64,
    /// Objects dropped by playout eviction.
    pub objects_evicted: AtomicU64,
    /// Data streams that failed to decode and were abandoned.
    pub stream_errors: AtomicU64,
    /// Data streams dropped because the staging bound was hit.
    pub staged_streams_dropped: AtomicU64,
    /// Responses that arrived after their request had timed out locally.
    pub late_responses_dropped: AtomicU64,
    /// Control messages sent and received.
    pub control_sent: AtomicU64,
    pub control_received: AtomicU64,
}

impl SessionStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            objects_received: self.objects_received.load(Ordering::Relaxed),
            objects_evicted: self.objects_evicted.load(Ordering::Relaxed),
            stream_errors: self.stream_errors.load(Ordering::Relaxed),
            staged_streams_dropped: self.staged_streams_dropped.load(Ordering::Relaxed),
            late_responses_dropped: self.late_responses_dropped.load(Ordering::Relaxed),
            control_sent: self.control_sent.load(Ordering::Relaxed),
            control_received: self.control_received.load(Ordering::Relaxed),
        }
    }
}

/// Increment helper; all counters are monotonically increasing.
pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn bump_by(counter: &AtomicU64, n: u64) {
    counter.fetch_add(n, Ordering::Relaxed);
}

/// A point-in-time copy of [SessionStats].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StatsSnapshot {
    pub objects_received: u64,
    pub objects_evicted: u64,
    pub stream_errors: u64,
    pub staged_streams_dropped: u64,
    pub late_responses_dropped: u64,
    pub control_sent: u64,
    pub control_received: u64,
}
