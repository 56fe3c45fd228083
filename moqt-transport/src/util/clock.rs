use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of epoch milliseconds.
///
/// Media timing (capture timestamps, playout latency) must survive machines
/// with skewed clocks, so everything takes a clock instead of calling the
/// system time directly.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// The uncorrected system clock.
#[derive(Default, Clone, Copy, Debug)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock corrected by an externally measured offset.
///
/// Whoever synchronizes against a time server feeds the offset in through
/// [CorrectedClock::set_offset_ms]; consumers just read corrected time.
#[derive(Default, Clone, Debug)]
pub struct CorrectedClock {
    offset_ms: Arc<AtomicI64>,
}

impl CorrectedClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the correction, in milliseconds to add to the system clock.
    pub fn set_offset_ms(&self, offset_ms: i64) {
        self.offset_ms.store(offset_ms, Ordering::Relaxed);
    }

    pub fn offset_ms(&self) -> i64 {
        self.offset_ms.load(Ordering::Relaxed)
    }
}

impl Clock for CorrectedClock {
    fn now_ms(&self) -> u64 {
        let now = SystemClock.now_ms() as i64;
        now.saturating_add(self.offset_ms.load(Ordering::Relaxed))
            .max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrected_applies_offset() {
        let clock = CorrectedClock::new();
        let before = clock.now_ms();

        clock.set_offset_ms(5_000);
        let corrected = clock.now_ms();
        assert!(corrected >= before + 4_000);

        clock.set_offset_ms(-5_000);
        assert!(clock.now_ms() < corrected);
    }

    /// A clock the tests can steer by hand.
    pub struct ManualClock(pub std::sync::atomic::AtomicU64);

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    #[test]
    fn manual_clock() {
        let clock = ManualClock(5.into());
        assert_eq!(clock.now_ms(), 5);
    }
}
