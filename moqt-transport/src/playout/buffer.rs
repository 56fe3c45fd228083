use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeSet, BinaryHeap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::coding::Location;
use crate::data::MoqtObject;
use crate::util::{self, Clock, SessionStats, SystemClock};

/// Tuning for one playout buffer.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    /// Object count the buffer never exceeds.
    pub capacity: usize,

    /// Advisory staging depth for the producer; not enforced here.
    pub target_latency_ms: u64,

    /// Oldest a staged object may get before its GOP is forced out.
    pub max_latency_ms: u64,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            capacity: 256,
            target_latency_ms: 100,
            max_latency_ms: 2_000,
        }
    }
}

struct Entry {
    location: Location,
    arrived_ms: u64,
    object: MoqtObject,
}

// Ordered by location so the heap pops the oldest object first; arrival time
// breaks ties between duplicates.
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.location
            .cmp(&other.location)
            .then(self.arrived_ms.cmp(&other.arrived_ms))
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

struct PlayoutState {
    heap: BinaryHeap<Reverse<Entry>>,
}

struct Shared {
    state: Mutex<PlayoutState>,
    // Set by either half dropping; the other half drains or errors out.
    closed: AtomicBool,
    // Wakes the single pending consumer; permits make the handoff lossless.
    notify: Notify,
}

/// A pull-based reorder buffer: unordered [MoqtObject]s in, a monotone
/// [Location] sequence out.
///
/// This is a priority queue, not a strict reorder fence. A pull returns the
/// smallest location buffered at that moment; late arrivals smaller than
/// something already delivered are still delivered when reached. The network
/// guarantees eventual per-group delivery, so consumers tolerate the gaps.
pub struct Playout;

impl Playout {
    /// Create a writer/reader pair sharing one buffer, on the system clock.
    pub fn produce(options: Options) -> (PlayoutWriter, PlayoutReader) {
        Self::produce_with(options, Arc::new(SystemClock), None)
    }

    /// Like [Playout::produce], with an explicit clock and stats sink.
    pub fn produce_with(
        options: Options,
        clock: Arc<dyn Clock>,
        stats: Option<Arc<SessionStats>>,
    ) -> (PlayoutWriter, PlayoutReader) {
        let shared = Arc::new(Shared {
            state: Mutex::new(PlayoutState {
                heap: BinaryHeap::new(),
            }),
            closed: AtomicBool::new(false),
            notify: Notify::new(),
        });

        let writer = PlayoutWriter {
            shared: shared.clone(),
            options,
            clock,
            stats,
        };
        let reader = PlayoutReader { shared };

        (writer, reader)
    }
}

/// The producer half, owned by the session's data stream demultiplexer.
pub struct PlayoutWriter {
    shared: Arc<Shared>,
    options: Options,
    clock: Arc<dyn Clock>,
    stats: Option<Arc<SessionStats>>,
}

impl PlayoutWriter {
    /// Enqueue an object, taking ownership of its payload. Returns how many
    /// buffered objects eviction dropped to make room, or the object back
    /// if the reader is gone.
    ///
    /// Overflow and max-latency breaches evict whole GOPs; see [Options].
    pub async fn push(&mut self, object: MoqtObject) -> Result<usize, MoqtObject> {
        if self.shared.closed.load(AtomicOrdering::Acquire) {
            return Err(object);
        }

        let now = self.clock.now_ms();
        let mut dropped = 0;

        {
            let mut state = self.shared.state.lock().await;

            // Age out the oldest GOP before anything else gets staged.
            if let Some(oldest) = state.heap.iter().map(|e| e.0.arrived_ms).min() {
                if now.saturating_sub(oldest) > self.options.max_latency_ms {
                    dropped += Self::evict_stale(&mut state);
                }
            }

            state.heap.push(Reverse(Entry {
                location: object.location,
                arrived_ms: now,
                object,
            }));

            if state.heap.len() > self.options.capacity {
                dropped += Self::evict(&mut state, self.options.capacity);
            }
        }

        if let Some(stats) = &self.stats {
            util::bump(&stats.objects_received);
            if dropped > 0 {
                util::bump_by(&stats.objects_evicted, dropped as u64);
            }
        }

        self.shared.notify.notify_one();

        Ok(dropped)
    }

    /// Drop every object of one group; returns how many went.
    fn drop_group(state: &mut PlayoutState, group: u64) -> usize {
        let mut dropped = 0;

        let entries = std::mem::take(&mut state.heap).into_vec();
        for entry in entries {
            if entry.0.location.group == group {
                dropped += 1;
            } else {
                state.heap.push(entry);
            }
        }

        log::debug!(
            "playout evicted group {} ({} objects, {} left buffered)",
            group,
            dropped,
            state.heap.len()
        );

        dropped
    }

    /// The group about to be evicted, oldest first. `None` when only one
    /// group is buffered; wiping it would take the newest data with it.
    fn oldest_group(state: &PlayoutState) -> Option<u64> {
        let groups: BTreeSet<u64> = state.heap.iter().map(|e| e.0.location.group).collect();
        match groups.first() {
            Some(first) if groups.len() > 1 => Some(*first),
            _ => None,
        }
    }

    /// Drop the oldest 20% of objects individually; the single-group
    /// fallback when a whole GOP cannot go.
    fn drop_oldest_objects(state: &mut PlayoutState) -> usize {
        let n = state.heap.len().div_ceil(5);
        let mut dropped = 0;
        for _ in 0..n {
            if state.heap.pop().is_some() {
                dropped += 1;
            }
        }
        log::debug!("playout evicted {} oldest objects of a single group", n);
        dropped
    }

    /// Overflow eviction: how many objects were dropped.
    ///
    /// Buffered objects group by `location.group` (GOP boundaries). The
    /// oldest group goes first, up to 3 groups or until fill reaches 70% of
    /// capacity; when only one group is buffered, the oldest 20% of objects
    /// go individually instead.
    fn evict(state: &mut PlayoutState, capacity: usize) -> usize {
        let target = capacity * 7 / 10;
        let mut dropped = 0;
        let mut groups_dropped = 0;

        while state.heap.len() > target && groups_dropped < 3 {
            match Self::oldest_group(state) {
                Some(group) => {
                    dropped += Self::drop_group(state, group);
                    groups_dropped += 1;
                }
                None => break,
            }
        }

        if groups_dropped == 0 && state.heap.len() > target {
            dropped += Self::drop_oldest_objects(state);
        }

        dropped
    }

    /// Max-latency eviction: the oldest staged object exceeded its age
    /// budget, so its GOP goes regardless of fill.
    fn evict_stale(state: &mut PlayoutState) -> usize {
        match Self::oldest_group(state) {
            Some(group) => Self::drop_group(state, group),
            None => Self::drop_oldest_objects(state),
        }
    }

    /// Stop the buffer. The reader drains what is buffered, then sees the
    /// end of the stream.
    pub fn close(self) {}

    /// A handle that can close the buffer without owning the writer.
    pub fn closer(&self) -> PlayoutCloser {
        PlayoutCloser {
            shared: self.shared.clone(),
        }
    }
}

/// Closes a playout buffer from outside the producer, e.g. when the
/// subscription owning it ends. Pending pulls resolve after the drain.
#[derive(Clone)]
pub struct PlayoutCloser {
    shared: Arc<Shared>,
}

impl PlayoutCloser {
    pub fn close(&self) {
        self.shared.closed.store(true, AtomicOrdering::Release);
        self.shared.notify.notify_one();
    }
}

impl Drop for PlayoutWriter {
    fn drop(&mut self) {
        self.shared.closed.store(true, AtomicOrdering::Release);
        self.shared.notify.notify_one();
    }
}

/// The consumer half, owned by the media pipeline. Single consumer: pulls
/// take `&mut self`, so at most one can be pending.
pub struct PlayoutReader {
    shared: Arc<Shared>,
}

impl PlayoutReader {
    /// Pull the next object in location order, waiting for one to arrive.
    /// `None` once the buffer is closed and drained.
    pub async fn next_object(&mut self) -> Option<MoqtObject> {
        loop {
            let notified = self.shared.notify.notified();

            {
                let mut state = self.shared.state.lock().await;
                if let Some(entry) = state.heap.pop() {
                    return Some(entry.0.object);
                }
            }
            if self.shared.closed.load(AtomicOrdering::Acquire) {
                return None;
            }

            notified.await;
        }
    }

    /// Non-blocking probe for buffered objects.
    pub fn has_object_ready(&self) -> bool {
        self.shared
            .state
            .try_lock()
            .map(|state| !state.heap.is_empty())
            .unwrap_or(false)
    }
}

impl Drop for PlayoutReader {
    fn drop(&mut self) {
        // Without a consumer there is nothing worth buffering.
        self.shared.closed.store(true, AtomicOrdering::Release);
        if let Ok(mut state) = self.shared.state.try_lock() {
            state.heap.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coding::FullTrackName;
    use crate::data::ForwardingPreference;
    use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

    fn object(group: u64, object_id: u64) -> MoqtObject {
        MoqtObject::try_new(
            FullTrackName::from_utf8_path("conf/room1", "video"),
            Location::new(group, object_id),
            127,
            ForwardingPreference::Subgroup,
            Some(0),
            Default::default(),
            bytes::Bytes::from_static(b"frame"),
        )
        .unwrap()
    }

    struct ManualClock(AtomicU64);

    impl Clock for ManualClock {
        fn now_ms(&self) -> u64 {
            self.0.load(AtomicOrdering::Relaxed)
        }
    }

    #[tokio::test]
    async fn reorders_by_location() {
        let (mut writer, mut reader) = Playout::produce(Options::default());

        for (group, object_id) in [(2, 0), (1, 0), (1, 1), (3, 0)] {
            writer.push(object(group, object_id)).await.unwrap();
        }

        let mut order = Vec::new();
        for _ in 0..4 {
            order.push(reader.next_object().await.unwrap().location);
        }
        assert_eq!(
            order,
            vec![
                Location::new(1, 0),
                Location::new(1, 1),
                Location::new(2, 0),
                Location::new(3, 0),
            ]
        );
    }

    #[tokio::test]
    async fn pull_waits_for_arrival() {
        let (mut writer, mut reader) = Playout::produce(Options::default());
        assert!(!reader.has_object_ready());

        let task = tokio::spawn(async move { reader.next_object().await });
        writer.push(object(1, 0)).await.unwrap();

        let delivered = task.await.unwrap().unwrap();
        assert_eq!(delivered.location, Location::new(1, 0));
    }

    #[tokio::test]
    async fn evicts_oldest_group_on_overflow() {
        let options = Options {
            capacity: 10,
            ..Default::default()
        };
        let (mut writer, mut reader) = Playout::produce(options);

        // Groups 1 and 2 hold four objects each, group 3 three; group 1 is oldest.
        for group in [1u64, 2] {
            for object_id in 0..4 {
                writer.push(object(group, object_id)).await.unwrap();
            }
        }
        for object_id in 0..3 {
            writer.push(object(3, object_id)).await.unwrap();
        }

        // The 11th push evicted group 1 wholesale.
        assert!(writer.shared.state.lock().await.heap.len() <= 7);
        let first = reader.next_object().await.unwrap();
        assert_eq!(first.location, Location::new(2, 0));
    }

    #[tokio::test]
    async fn single_group_falls_back_to_individual_drops() {
        let options = Options {
            capacity: 10,
            ..Default::default()
        };
        let (mut writer, _reader) = Playout::produce(options);

        for object_id in 0..11 {
            writer.push(object(1, object_id)).await.unwrap();
        }

        let state = writer.shared.state.lock().await;
        assert!(state.heap.len() <= 10);
        // The oldest objects went, not the newest.
        let smallest = state.heap.iter().map(|e| e.0.location).min().unwrap();
        assert!(smallest.object > 0);
    }

    #[tokio::test]
    async fn max_latency_forces_gop_eviction() {
        let clock = Arc::new(ManualClock(AtomicU64::new(0)));
        let options = Options {
            capacity: 100,
            max_latency_ms: 500,
            ..Default::default()
        };
        let (mut writer, mut reader) =
            Playout::produce_with(options, clock.clone(), None);

        writer.push(object(1, 0)).await.unwrap();
        writer.push(object(1, 1)).await.unwrap();
        clock.0.store(100, AtomicOrdering::Relaxed);
        writer.push(object(2, 0)).await.unwrap();

        // Push after the deadline; group 1 is stale and gets aged out.
        clock.0.store(700, AtomicOrdering::Relaxed);
        writer.push(object(3, 0)).await.unwrap();

        let first = reader.next_object().await.unwrap();
        assert_eq!(first.location.group, 2);
    }

    #[tokio::test]
    async fn close_drains_then_ends() {
        let (mut writer, mut reader) = Playout::produce(Options::default());

        writer.push(object(1, 0)).await.unwrap();
        writer.push(object(1, 1)).await.unwrap();
        writer.close();

        assert_eq!(
            reader.next_object().await.unwrap().location,
            Location::new(1, 0)
        );
        assert_eq!(
            reader.next_object().await.unwrap().location,
            Location::new(1, 1)
        );
        assert!(reader.next_object().await.is_none());
    }

    #[tokio::test]
    async fn push_after_reader_drop_fails() {
        let (mut writer, reader) = Playout::produce(Options::default());
        drop(reader);

        let rejected = writer.push(object(1, 0)).await;
        assert!(rejected.is_err());
    }
}
