// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Playback orchestrator.
//!
//! [`BagPlayer`] maps a virtual bag clock onto the wall clock with a speed
//! multiplier. A clock thread ticks every 33 ms; each tick advances the
//! play head, emits the decoded messages whose time falls in the one-tick
//! window just passed, and keeps a prefetch window of chunks decoded ahead
//! of the head. Chunk reads run on a worker pool bounded at two; seeks and
//! prefetches are cancelled through generation counters, and `destroy`
//! through a root flag every worker observes.
//!
//! Consumers subscribe to three streams: metadata (one item per loaded
//! file), state snapshots, and decoded message batches. Within one tick
//! the state snapshot carrying the new play-head time is always published
//! before that tick's batch.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use rayon::prelude::*;
use tracing::warn;

use crate::core::{BagError, BagTime, Result, RosbagMessage};
use crate::format::inspector::{read_metadata, BagMetadata, ChunkInfo};
use crate::io::{MmapSource, RandomAccessSource};

use super::chunk_reader::ChunkReader;
use super::options::{PlaybackOptions, PlaybackOptionsUpdate};

/// Clock tick interval.
pub const TICK_INTERVAL: Duration = Duration::from_millis(33);

/// Tick interval in seconds; also the lookback of the per-tick message
/// window and of the seek preview window.
pub const TICK_SECONDS: f64 = 0.033;

/// Bounded concurrency of chunk prefetch reads.
pub const PREFETCH_CONCURRENCY: usize = 2;

/// One observable state snapshot.
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    /// Play-head position, `None` until a file is loaded and positioned
    pub current_time: Option<BagTime>,
    /// Metadata of the loaded file
    pub metadata: Option<Arc<BagMetadata>>,
    /// Active options
    pub options: PlaybackOptions,
    /// Whether the clock is running
    pub is_playing: bool,
}

/// Mutable player state, single-writer behind the mutex.
struct PlayerState {
    source: Option<Arc<dyn RandomAccessSource>>,
    metadata: Option<Arc<BagMetadata>>,
    current_time: Option<BagTime>,
    options: PlaybackOptions,
    is_playing: bool,
    /// User-facing play/pause intent. Only `play`, `pause`, end-of-bag
    /// without loop, `load_file` and `destroy` write this; a seek pauses
    /// the clock (`is_playing`) but leaves the intent untouched, so any
    /// number of chained seeks still know whether to resume.
    playback_active: bool,
    /// Wall-clock instant of the last (re-)anchor
    wall_start: Option<Instant>,
    /// Bag time at the last (re-)anchor
    bag_anchor: Option<BagTime>,
    /// Bag-time seconds at which prefetch last triggered
    last_prefetch_sec: f64,
}

struct Subscribers {
    metadata: Vec<Sender<Arc<BagMetadata>>>,
    state: Vec<Sender<PlayerSnapshot>>,
    messages: Vec<Sender<Vec<RosbagMessage>>>,
}

struct PlayerShared {
    state: Mutex<PlayerState>,
    subscribers: Mutex<Subscribers>,
    reader: ChunkReader,
    /// Worker pool draining chunk reads, prefetch and seek alike
    pool: rayon::ThreadPool,
    /// Bumped to cancel all queued and in-flight prefetch reads
    prefetch_gen: AtomicU64,
    /// Bumped per seek; a seek worker holding a stale value discards itself
    seek_gen: AtomicU64,
    /// Root cancellation: set once by `destroy`, never cleared
    destroyed: AtomicBool,
}

/// Timeline-oriented bag playback.
pub struct BagPlayer {
    shared: Arc<PlayerShared>,
    clock: Option<JoinHandle<()>>,
}

impl BagPlayer {
    /// Create a player with an idle clock and no file loaded.
    pub fn new() -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(PREFETCH_CONCURRENCY)
            .thread_name(|index| format!("bag-prefetch-{index}"))
            .build()
            .map_err(|e| BagError::io_failure("prefetch pool", e))?;

        let shared = Arc::new(PlayerShared {
            state: Mutex::new(PlayerState {
                source: None,
                metadata: None,
                current_time: None,
                options: PlaybackOptions::default(),
                is_playing: false,
                playback_active: false,
                wall_start: None,
                bag_anchor: None,
                last_prefetch_sec: 0.0,
            }),
            subscribers: Mutex::new(Subscribers {
                metadata: Vec::new(),
                state: Vec::new(),
                messages: Vec::new(),
            }),
            reader: ChunkReader::new(),
            pool,
            prefetch_gen: AtomicU64::new(0),
            seek_gen: AtomicU64::new(0),
            destroyed: AtomicBool::new(false),
        });

        let clock_shared = Arc::clone(&shared);
        let clock = thread::Builder::new()
            .name("bag-clock".to_string())
            .spawn(move || {
                while !clock_shared.destroyed.load(Ordering::SeqCst) {
                    thread::sleep(TICK_INTERVAL);
                    if clock_shared.destroyed.load(Ordering::SeqCst) {
                        break;
                    }
                    tick(&clock_shared);
                }
            })
            .map_err(|e| BagError::io_failure("clock thread", e))?;

        Ok(Self {
            shared,
            clock: Some(clock),
        })
    }

    /// Load a bag from a byte source, resetting all per-file state.
    ///
    /// The returned metadata is also published on the metadata stream.
    /// A failed load leaves the player with no file bound.
    pub fn load_file(&self, source: Arc<dyn RandomAccessSource>) -> Result<Arc<BagMetadata>> {
        let shared = &self.shared;
        if shared.destroyed.load(Ordering::SeqCst) {
            return Err(BagError::io_failure("load_file", "player has been destroyed"));
        }

        shared.prefetch_gen.fetch_add(1, Ordering::SeqCst);
        shared.seek_gen.fetch_add(1, Ordering::SeqCst);
        shared.reader.clear();
        {
            let mut state = lock_state(shared)?;
            state.is_playing = false;
            state.playback_active = false;
            state.wall_start = None;
            state.bag_anchor = None;
            state.current_time = None;
            state.last_prefetch_sec = 0.0;
            state.metadata = None;
            state.source = None;
        }

        let metadata = Arc::new(read_metadata(&*source)?);
        {
            let mut state = lock_state(shared)?;
            state.metadata = Some(Arc::clone(&metadata));
            state.source = Some(source);
        }

        publish_metadata(shared, &metadata);
        publish_state(shared);
        Ok(metadata)
    }

    /// Convenience: memory-map a file and load it.
    pub fn load_path<P: AsRef<std::path::Path>>(&self, path: P) -> Result<Arc<BagMetadata>> {
        let source = MmapSource::open(path)?;
        self.load_file(Arc::new(source))
    }

    /// Subscribe to metadata publications (one per successful load).
    pub fn metadata_stream(&self) -> Receiver<Arc<BagMetadata>> {
        let (tx, rx) = unbounded();
        if !self.shared.destroyed.load(Ordering::SeqCst) {
            if let Ok(mut subs) = self.shared.subscribers.lock() {
                subs.metadata.push(tx);
            }
        }
        rx
    }

    /// Subscribe to state snapshots.
    pub fn state_stream(&self) -> Receiver<PlayerSnapshot> {
        let (tx, rx) = unbounded();
        if !self.shared.destroyed.load(Ordering::SeqCst) {
            if let Ok(mut subs) = self.shared.subscribers.lock() {
                subs.state.push(tx);
            }
        }
        rx
    }

    /// Subscribe to decoded message batches (per tick and seek preview).
    pub fn messages_stream(&self) -> Receiver<Vec<RosbagMessage>> {
        let (tx, rx) = unbounded();
        if !self.shared.destroyed.load(Ordering::SeqCst) {
            if let Ok(mut subs) = self.shared.subscribers.lock() {
                subs.messages.push(tx);
            }
        }
        rx
    }

    /// Start the clock from the current position (the bag start right
    /// after a load) and prefetch around it.
    pub fn play(&self) {
        let shared = &self.shared;
        if shared.destroyed.load(Ordering::SeqCst) {
            return;
        }
        let anchor = {
            let Ok(mut state) = shared.state.lock() else { return };
            if state.is_playing {
                return;
            }
            let Some(metadata) = state.metadata.clone() else {
                return;
            };
            let anchor = state.current_time.unwrap_or(metadata.start_time);
            state.current_time = Some(anchor);
            state.is_playing = true;
            state.playback_active = true;
            state.wall_start = Some(Instant::now());
            state.bag_anchor = Some(anchor);
            state.last_prefetch_sec = anchor.as_secs_f64();
            anchor
        };
        publish_state(shared);
        trigger_prefetch(shared, anchor);
    }

    /// Stop the clock; the play head stays where it is.
    pub fn pause(&self) {
        let shared = &self.shared;
        if shared.destroyed.load(Ordering::SeqCst) {
            return;
        }
        {
            let Ok(mut state) = shared.state.lock() else { return };
            // A seek in flight has already stopped the clock, but the
            // pause must still clear the intent so the seek does not
            // resume on settle.
            if !state.is_playing && !state.playback_active {
                return;
            }
            state.is_playing = false;
            state.playback_active = false;
            state.wall_start = None;
            state.bag_anchor = None;
        }
        publish_state(shared);
    }

    /// Jump the play head to `time`.
    ///
    /// Outstanding prefetches are cancelled, the clock pauses, and chunks
    /// around `time` are read on the worker pool. Once settled: playback
    /// resumes if it was active before the seek, otherwise a preview batch
    /// of cached messages in `[time - 0.033, time]` is emitted. A newer
    /// seek supersedes an unfinished one, which then discards itself
    /// without emitting anything.
    pub fn seek(&self, time: BagTime) {
        let shared = &self.shared;
        if shared.destroyed.load(Ordering::SeqCst) {
            return;
        }

        let my_seek = shared.seek_gen.fetch_add(1, Ordering::SeqCst) + 1;
        shared.prefetch_gen.fetch_add(1, Ordering::SeqCst);
        let prefetch_gen = shared.prefetch_gen.load(Ordering::SeqCst);

        let (metadata, source, options, was_playing) = {
            let Ok(mut state) = shared.state.lock() else { return };
            let (Some(metadata), Some(source)) = (state.metadata.clone(), state.source.clone())
            else {
                return;
            };
            // The intent, not the clock flag: a superseded seek has
            // already stopped the clock, and must not make a newer seek
            // in the chain forget that playback was active.
            let was_playing = state.playback_active;
            state.is_playing = false;
            state.wall_start = None;
            state.bag_anchor = None;
            state.current_time = Some(time);
            (metadata, source, state.options, was_playing)
        };
        publish_state(shared);

        let worker = Arc::clone(shared);
        let spawned = thread::Builder::new()
            .name("bag-seek".to_string())
            .spawn(move || {
                run_seek(
                    &worker,
                    my_seek,
                    prefetch_gen,
                    metadata,
                    source,
                    options,
                    time,
                    was_playing,
                );
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn seek worker");
        }
    }

    /// Merge a partial options update; it takes effect on the next tick.
    ///
    /// A speed change during playback re-anchors the clock at the current
    /// position so already-elapsed wall time is not rescaled.
    pub fn update_options(&self, update: PlaybackOptionsUpdate) {
        let shared = &self.shared;
        if shared.destroyed.load(Ordering::SeqCst) {
            return;
        }
        {
            let Ok(mut state) = shared.state.lock() else { return };
            let speed_changing = update
                .playback_speed
                .is_some_and(|s| s != state.options.playback_speed);
            if speed_changing && state.is_playing {
                if let (Some(anchor), Some(wall_start)) = (state.bag_anchor, state.wall_start) {
                    let elapsed = wall_start.elapsed().as_secs_f64();
                    let here = anchor.add_seconds(elapsed * state.options.playback_speed);
                    state.bag_anchor = Some(here);
                    state.wall_start = Some(Instant::now());
                    state.current_time = Some(here);
                }
            }
            state.options.apply(update);
        }
        publish_state(shared);
    }

    /// Current state snapshot, for callers that do not want a stream.
    pub fn snapshot(&self) -> PlayerSnapshot {
        snapshot_of(&self.shared)
    }

    /// Tear the player down permanently.
    ///
    /// Cancels everything in flight, clears all per-file state, stops the
    /// clock, and disconnects every subscriber after a final snapshot.
    /// Every later method call is a no-op.
    pub fn destroy(&self) {
        let shared = &self.shared;
        if shared.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        shared.prefetch_gen.fetch_add(1, Ordering::SeqCst);
        shared.seek_gen.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut state) = shared.state.lock() {
            state.is_playing = false;
            state.playback_active = false;
            state.wall_start = None;
            state.bag_anchor = None;
            state.current_time = None;
            state.metadata = None;
            state.source = None;
        }
        shared.reader.clear();
        publish_state(shared);
        if let Ok(mut subs) = shared.subscribers.lock() {
            subs.metadata.clear();
            subs.state.clear();
            subs.messages.clear();
        }
    }
}

impl Drop for BagPlayer {
    fn drop(&mut self) {
        self.destroy();
        if let Some(clock) = self.clock.take() {
            let _ = clock.join();
        }
    }
}

fn lock_state<'a>(shared: &'a PlayerShared) -> Result<MutexGuard<'a, PlayerState>> {
    shared
        .state
        .lock()
        .map_err(|e| BagError::io_failure("player state", format!("lock poisoned: {e}")))
}

fn snapshot_of(shared: &PlayerShared) -> PlayerSnapshot {
    match shared.state.lock() {
        Ok(state) => PlayerSnapshot {
            current_time: state.current_time,
            metadata: state.metadata.clone(),
            options: state.options,
            is_playing: state.is_playing,
        },
        Err(_) => PlayerSnapshot {
            current_time: None,
            metadata: None,
            options: PlaybackOptions::default(),
            is_playing: false,
        },
    }
}

fn publish_state(shared: &PlayerShared) {
    let snapshot = snapshot_of(shared);
    if let Ok(mut subs) = shared.subscribers.lock() {
        subs.state.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

fn publish_metadata(shared: &PlayerShared, metadata: &Arc<BagMetadata>) {
    if let Ok(mut subs) = shared.subscribers.lock() {
        subs.metadata
            .retain(|tx| tx.send(Arc::clone(metadata)).is_ok());
    }
}

fn publish_messages(shared: &PlayerShared, batch: Vec<RosbagMessage>) {
    if let Ok(mut subs) = shared.subscribers.lock() {
        subs.messages.retain(|tx| tx.send(batch.clone()).is_ok());
    }
}

/// One clock tick: advance the play head, emit the window, gate prefetch.
fn tick(shared: &Arc<PlayerShared>) {
    let metadata;
    let previous;
    let new_time;
    let prefetch_due;
    {
        let Ok(mut state) = shared.state.lock() else { return };
        if !state.is_playing {
            return;
        }
        let (Some(meta), Some(wall_start), Some(anchor)) =
            (state.metadata.clone(), state.wall_start, state.bag_anchor)
        else {
            return;
        };

        let elapsed = wall_start.elapsed().as_secs_f64();
        let advanced = anchor.add_seconds(elapsed * state.options.playback_speed);
        // One-tick lookback, deliberately not scaled by playback speed:
        // the window length matches the tick cadence, not the head's
        // advance. At non-unit speeds this can duplicate or skip messages.
        let window_start = anchor.add_seconds(elapsed - TICK_SECONDS);

        if advanced >= meta.end_time {
            let start = meta.start_time;
            if state.options.loop_playback {
                state.current_time = Some(start);
                state.wall_start = Some(Instant::now());
                state.bag_anchor = Some(start);
                state.last_prefetch_sec = start.as_secs_f64();
                drop(state);
                publish_state(shared);
                trigger_prefetch(shared, start);
            } else {
                state.is_playing = false;
                state.playback_active = false;
                state.wall_start = None;
                state.bag_anchor = None;
                state.current_time = Some(start);
                drop(state);
                publish_state(shared);
            }
            return;
        }

        state.current_time = Some(advanced);
        prefetch_due = advanced.as_secs_f64() - state.last_prefetch_sec
            > state.options.prefetch_seconds / 2.0;
        if prefetch_due {
            state.last_prefetch_sec = advanced.as_secs_f64();
        }
        metadata = meta;
        previous = window_start;
        new_time = advanced;
    }

    publish_state(shared);
    let batch = gather_window(&metadata, &shared.reader, previous, new_time);
    if !batch.is_empty() {
        publish_messages(shared, batch);
    }
    if prefetch_due {
        trigger_prefetch(shared, new_time);
    }
}

/// Collect cached messages with time in `[from, to]`, scanning chunks in
/// sort order. Chunks without a cache entry are skipped silently.
fn gather_window(
    metadata: &BagMetadata,
    reader: &ChunkReader,
    from: BagTime,
    to: BagTime,
) -> Vec<RosbagMessage> {
    let mut batch = Vec::new();
    for chunk in &metadata.chunks_info {
        if chunk.start_time > to || chunk.end_time < from {
            continue;
        }
        let Some(messages) = reader.cached(chunk.idx) else {
            continue;
        };
        batch.extend(
            messages
                .iter()
                .filter(|m| m.time >= from && m.time <= to)
                .cloned(),
        );
    }
    batch
}

/// Enqueue reads for every uncached chunk overlapping the prefetch window
/// anchored at `anchor`. Reads run on the bounded pool and drop out as
/// soon as the prefetch generation moves on.
fn trigger_prefetch(shared: &Arc<PlayerShared>, anchor: BagTime) {
    let generation = shared.prefetch_gen.load(Ordering::SeqCst);
    let (metadata, source, options) = {
        let Ok(state) = shared.state.lock() else { return };
        let (Some(metadata), Some(source)) = (state.metadata.clone(), state.source.clone())
        else {
            return;
        };
        (metadata, source, state.options)
    };

    let window_end = anchor
        .add_seconds(options.prefetch_seconds)
        .min(metadata.end_time);

    for chunk in &metadata.chunks_info {
        if chunk.end_time < anchor || chunk.start_time > window_end {
            continue;
        }
        if shared.reader.is_cached(chunk.idx) {
            continue;
        }

        let worker = Arc::clone(shared);
        let chunk_metadata = Arc::clone(&metadata);
        let chunk_source = Arc::clone(&source);
        let info = chunk.clone();
        shared.pool.spawn(move || {
            let cancelled = || {
                worker.destroyed.load(Ordering::SeqCst)
                    || worker.prefetch_gen.load(Ordering::SeqCst) != generation
            };
            if cancelled() {
                return;
            }
            if let Err(e) =
                worker
                    .reader
                    .read_chunk(&*chunk_source, &info, &chunk_metadata, &cancelled)
            {
                warn!(chunk = info.idx, error = %e, "prefetch read failed");
            }
        });
    }
}

/// Seek worker body: read the window around `time`, then resume or emit
/// the preview, unless a newer seek, a load, or destroy superseded us.
#[allow(clippy::too_many_arguments)]
fn run_seek(
    shared: &Arc<PlayerShared>,
    my_seek: u64,
    prefetch_gen: u64,
    metadata: Arc<BagMetadata>,
    source: Arc<dyn RandomAccessSource>,
    options: PlaybackOptions,
    time: BagTime,
    was_playing: bool,
) {
    let window_end = time
        .add_seconds(options.prefetch_seconds)
        .min(metadata.end_time);
    let targets: Vec<ChunkInfo> = metadata
        .chunks_info
        .iter()
        .filter(|c| c.end_time >= time && c.start_time <= window_end)
        .filter(|c| !shared.reader.is_cached(c.idx))
        .cloned()
        .collect();

    let cancelled = || {
        shared.destroyed.load(Ordering::SeqCst)
            || shared.seek_gen.load(Ordering::SeqCst) != my_seek
            || shared.prefetch_gen.load(Ordering::SeqCst) != prefetch_gen
    };

    shared.pool.install(|| {
        targets.par_iter().for_each(|info| {
            if cancelled() {
                return;
            }
            if let Err(e) = shared
                .reader
                .read_chunk(&*source, info, &metadata, &cancelled)
            {
                warn!(chunk = info.idx, error = %e, "seek read failed");
            }
        });
    });

    if cancelled() {
        return;
    }

    if was_playing {
        {
            let Ok(mut state) = shared.state.lock() else { return };
            // A load may have raced past the check above; its bump happens
            // before it takes this lock, so re-checking here is decisive.
            if shared.seek_gen.load(Ordering::SeqCst) != my_seek {
                return;
            }
            // A pause issued while this seek was in flight wins over the
            // pre-seek intent.
            if !state.playback_active {
                return;
            }
            state.is_playing = true;
            state.wall_start = Some(Instant::now());
            state.bag_anchor = Some(time);
            state.last_prefetch_sec = time.as_secs_f64();
        }
        publish_state(shared);
    } else {
        let preview = gather_window(
            &metadata,
            &shared.reader,
            time.add_seconds(-TICK_SECONDS),
            time,
        );
        if !preview.is_empty() {
            publish_messages(shared, preview);
        }
    }
}
