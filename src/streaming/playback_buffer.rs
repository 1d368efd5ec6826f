//! The shared playback buffer
//!
//! One instance sits between the producers and the driver callback. All state
//! lives behind a single `parking_lot::Mutex` that is held only while samples
//! are appended or copied out; visualizer notifications always happen after
//! the lock is released.
//!
//! # Thread Safety
//! - Any number of producer threads, externally serialized (one active at a time)
//! - Exactly one consumer: the driver callback
//! - [`PlaybackBuffer::await_drained`] is the only blocking call and is producer-side

use super::pending::PendingBuffer;
use crate::quantize::normalize_into;
use crate::visualizer::Visualizer;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

/// Stream name announced to the visualizer when none is given
pub const DEFAULT_STREAM_NAME: &str = "Aria";

/// Per-session flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackSession {
    /// A producer has enqueued since the last [`PlaybackBuffer::await_drained`]
    pub active: bool,
    /// Delivered frames are mirrored to the visualizer
    pub update_ui: bool,
    /// `load` has already been signalled for this session
    pub visual_loaded: bool,
}

/// Playback statistics for monitoring buffer health
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Number of drain calls (one per driver callback)
    pub callbacks: u64,
    /// Real samples handed to the driver
    pub samples_played: u64,
    /// Samples accepted from producers
    pub samples_enqueued: u64,
    /// Callbacks that had to zero-pad an active buffer
    pub underruns: u64,
    /// Callbacks served while no buffer existed
    pub idle_callbacks: u64,
}

#[derive(Debug, Default)]
struct PlaybackState {
    pending: PendingBuffer,
    /// Storage released by the last finished session
    spare: VecDeque<i16>,
    session: PlaybackSession,
    stats: PlaybackStats,
}

/// Queue of PCM samples shared by producers and the real-time callback
pub struct PlaybackBuffer {
    state: Mutex<PlaybackState>,
    /// Float copy of the last frame, only touched by the consumer
    visual_frame: Mutex<Vec<f32>>,
    visualizer: Arc<dyn Visualizer>,
    stream_name: String,
    sample_rate: u32,
}

impl PlaybackBuffer {
    /// Create an empty buffer for a stream running at `sample_rate`
    pub fn new(sample_rate: u32, visualizer: Arc<dyn Visualizer>) -> Self {
        Self::with_stream_name(sample_rate, DEFAULT_STREAM_NAME, visualizer)
    }

    /// Create an empty buffer announced to the visualizer under `stream_name`
    pub fn with_stream_name(
        sample_rate: u32,
        stream_name: impl Into<String>,
        visualizer: Arc<dyn Visualizer>,
    ) -> Self {
        PlaybackBuffer {
            state: Mutex::new(PlaybackState::default()),
            visual_frame: Mutex::new(Vec::new()),
            visualizer,
            stream_name: stream_name.into(),
            sample_rate,
        }
    }

    /// Append a chunk of samples (producer side).
    ///
    /// With `mark_ui` set, the first call of a session signals the visualizer's
    /// `load`. Every call overwrites the session's `update_ui` flag, so an
    /// unmarked chunk stops visualization even while playback continues.
    pub fn enqueue(&self, chunk: &[i16], mark_ui: bool) {
        if mark_ui && self.claim_visual_load() {
            debug!(stream = %self.stream_name, "Starting visualization");
            self.visualizer.load(&self.stream_name);
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.session.active = true;
        state.session.update_ui = mark_ui;
        state.stats.samples_enqueued += chunk.len() as u64;
        let spare = &mut state.spare;
        state.pending.append(chunk, || std::mem::take(spare));
    }

    fn claim_visual_load(&self) -> bool {
        let mut state = self.state.lock();
        if state.session.visual_loaded {
            return false;
        }
        state.session.visual_loaded = true;
        true
    }

    /// Fill `out` with the next samples (consumer side), zero-padding any shortfall.
    ///
    /// Returns the number of real samples written. When the session is
    /// visualized, the whole frame, padding included, is forwarded to the
    /// visualizer as float amplitudes after the buffer lock is released.
    pub fn drain_into(&self, out: &mut [i16]) -> usize {
        let (delivered, update_ui) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let was_absent = state.pending.is_absent();
            let take = state.pending.take_into(out);

            if let Some(storage) = take.released {
                state.spare = storage;
            }
            state.stats.callbacks += 1;
            state.stats.samples_played += take.delivered as u64;
            if was_absent {
                state.stats.idle_callbacks += 1;
            } else if take.underrun {
                state.stats.underruns += 1;
            }
            (take.delivered, state.session.update_ui)
        };

        if update_ui {
            let mut frame = self.visual_frame.lock();
            normalize_into(out, &mut frame);
            self.visualizer.update(&self.stream_name, &frame);
        }

        delivered
    }

    /// Return exactly `frame_count` samples, zero-padded on underrun.
    pub fn drain(&self, frame_count: usize) -> Vec<i16> {
        let mut out = vec![0i16; frame_count];
        self.drain_into(&mut out);
        out
    }

    /// Fill an interleaved driver buffer; this is the body of the driver callback.
    ///
    /// One mono sample is drained per frame and copied to every channel.
    /// `scratch` is reused between calls so the steady state does not allocate.
    /// A panic anywhere below is caught here and turned into a silent frame.
    pub fn fill_output(&self, data: &mut [i16], channels: usize, scratch: &mut Vec<i16>) {
        let channels = channels.max(1);
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            if channels == 1 {
                self.drain_into(data);
                return;
            }

            let frames = data.len() / channels;
            if scratch.len() < frames {
                scratch.resize(frames, 0);
            }
            let mono = &mut scratch[..frames];
            self.drain_into(mono);

            for (frame, &sample) in data.chunks_exact_mut(channels).zip(mono.iter()) {
                frame.fill(sample);
            }
            data[frames * channels..].fill(0);
        }));

        if result.is_err() {
            data.fill(0);
            error!(stream = %self.stream_name, "Playback callback failed; emitting silence");
        }
    }

    /// Block until the queued audio has (approximately) played out.
    ///
    /// Sleeps once for `remaining_samples / sample_rate` instead of waiting
    /// for a signal from the consumer, so it can return slightly early when
    /// more data is enqueued concurrently. Afterwards the session is reset and
    /// the next marked chunk announces itself to the visualizer again.
    pub fn await_drained(&self) {
        let remaining = {
            let state = self.state.lock();
            (!state.pending.is_absent()).then(|| state.pending.len())
        };

        if let Some(samples) = remaining {
            if self.sample_rate > 0 {
                let wait = Duration::from_secs_f64(samples as f64 / self.sample_rate as f64);
                debug!(samples, ?wait, "Waiting for playback to drain");
                std::thread::sleep(wait);
            }
        }

        let mut state = self.state.lock();
        state.session = PlaybackSession::default();
    }

    /// Samples still waiting for the driver
    pub fn pending_samples(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// True once the consumer has retired the buffer
    pub fn is_absent(&self) -> bool {
        self.state.lock().pending.is_absent()
    }

    /// Snapshot of the current session flags
    pub fn session(&self) -> PlaybackSession {
        self.state.lock().session
    }

    /// Snapshot of the playback statistics
    pub fn stats(&self) -> PlaybackStats {
        self.state.lock().stats
    }

    /// Output sample rate this buffer was created for
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Name announced to the visualizer
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }
}

impl std::fmt::Debug for PlaybackBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackBuffer")
            .field("stream_name", &self.stream_name)
            .field("sample_rate", &self.sample_rate)
            .field("pending_samples", &self.pending_samples())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::NullVisualizer;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    #[derive(Default)]
    struct CountingVisualizer {
        loads: AtomicUsize,
        updates: Mutex<Vec<Vec<f32>>>,
    }

    impl Visualizer for CountingVisualizer {
        fn load(&self, stream_name: &str) {
            assert_eq!(stream_name, DEFAULT_STREAM_NAME);
            self.loads.fetch_add(1, Ordering::SeqCst);
        }

        fn update(&self, _stream_name: &str, samples: &[f32]) {
            self.updates.lock().push(samples.to_vec());
        }
    }

    struct PanickingVisualizer;

    impl Visualizer for PanickingVisualizer {
        fn load(&self, _stream_name: &str) {}

        fn update(&self, _stream_name: &str, _samples: &[f32]) {
            panic!("visualizer went away");
        }
    }

    fn buffer() -> PlaybackBuffer {
        PlaybackBuffer::new(24_000, Arc::new(NullVisualizer))
    }

    #[test]
    fn test_idle_drain_is_silence() {
        let buf = buffer();
        for n in [1, 7, 4096] {
            assert_eq!(buf.drain(n), vec![0; n]);
        }
        assert_eq!(buf.stats().idle_callbacks, 3);
        assert_eq!(buf.stats().underruns, 0);
    }

    #[test]
    fn test_drain_exact_then_underrun() {
        let buf = buffer();
        let chunk: Vec<i16> = (1..=10).collect();
        buf.enqueue(&chunk, false);

        assert_eq!(buf.drain(4), vec![1, 2, 3, 4]);
        assert_eq!(buf.pending_samples(), 6);

        let out = buf.drain(8);
        assert_eq!(out, vec![5, 6, 7, 8, 9, 10, 0, 0]);
        assert!(buf.is_absent());

        let stats = buf.stats();
        assert_eq!(stats.samples_played, 10);
        assert_eq!(stats.samples_enqueued, 10);
        assert_eq!(stats.underruns, 1);
    }

    #[test]
    fn test_chunks_concatenate_in_order() {
        let buf = buffer();
        buf.enqueue(&[1, 2, 3], false);
        buf.enqueue(&[4], false);
        buf.enqueue(&[5, 6], false);

        let mut played = Vec::new();
        for n in [2, 1, 3, 4] {
            played.extend(buf.drain(n));
        }
        assert_eq!(played, vec![1, 2, 3, 4, 5, 6, 0, 0, 0, 0]);
    }

    #[test]
    fn test_load_signalled_once_per_session() {
        let viz = Arc::new(CountingVisualizer::default());
        let buf = PlaybackBuffer::new(24_000, viz.clone());

        buf.enqueue(&[100; 8], true);
        buf.enqueue(&[100; 8], true);
        assert_eq!(viz.loads.load(Ordering::SeqCst), 1);

        buf.drain(16);
        buf.drain(16);
        buf.await_drained();
        assert!(!buf.session().visual_loaded);

        buf.enqueue(&[100; 8], true);
        assert_eq!(viz.loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_update_carries_full_padded_frame() {
        let viz = Arc::new(CountingVisualizer::default());
        let buf = PlaybackBuffer::new(24_000, viz.clone());

        buf.enqueue(&[16384, -16384], true);
        buf.drain(4);

        let updates = viz.updates.lock();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0], vec![0.5, -0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_unmarked_chunk_silences_visualization() {
        let viz = Arc::new(CountingVisualizer::default());
        let buf = PlaybackBuffer::new(24_000, viz.clone());

        buf.enqueue(&[1; 8], true);
        buf.drain(4);
        buf.enqueue(&[1; 8], false);
        buf.drain(4);
        buf.drain(4);

        assert_eq!(viz.updates.lock().len(), 1);
        assert!(!buf.session().update_ui);
        assert!(buf.session().visual_loaded);
    }

    #[test]
    fn test_await_drained_on_absent_returns_immediately() {
        let buf = buffer();
        let start = Instant::now();
        buf.await_drained();
        assert!(start.elapsed() < Duration::from_millis(50));
        assert_eq!(buf.session(), PlaybackSession::default());
    }

    #[test]
    fn test_await_drained_sleeps_for_remaining_audio() {
        // 1200 samples at 24 kHz = 50 ms
        let buf = buffer();
        buf.enqueue(&[1; 1200], false);
        let start = Instant::now();
        buf.await_drained();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_fill_output_duplicates_mono_across_channels() {
        let buf = buffer();
        buf.enqueue(&[1, 2, 3], false);

        let mut data = [9i16; 8];
        let mut scratch = Vec::new();
        buf.fill_output(&mut data, 2, &mut scratch);
        assert_eq!(data, [1, 1, 2, 2, 3, 3, 0, 0]);
        assert!(buf.is_absent());
    }

    #[test]
    fn test_fill_output_zeroes_partial_trailing_frame() {
        let buf = buffer();
        buf.enqueue(&[5, 6, 7], false);

        let mut data = [9i16; 5];
        let mut scratch = Vec::new();
        buf.fill_output(&mut data, 2, &mut scratch);
        assert_eq!(data, [5, 5, 6, 6, 0]);
        assert_eq!(buf.pending_samples(), 1);
    }

    #[test]
    fn test_fill_output_survives_panicking_visualizer() {
        let buf = PlaybackBuffer::new(24_000, Arc::new(PanickingVisualizer));
        buf.enqueue(&[123; 4], true);

        let mut data = [1i16; 4];
        let mut scratch = Vec::new();
        buf.fill_output(&mut data, 1, &mut scratch);
        assert_eq!(data, [0; 4]);

        // The buffer is still usable afterwards
        buf.enqueue(&[5; 4], false);
        buf.fill_output(&mut data, 1, &mut scratch);
        assert_eq!(data, [5; 4]);
    }

    #[test]
    fn test_released_storage_is_reused_across_sessions() {
        let buf = buffer();
        buf.enqueue(&[3; 3000], false);
        buf.drain(4096);
        assert!(buf.is_absent());
        let settled = buf.state.lock().spare.capacity();
        assert!(settled >= 3000);

        for _ in 0..5_000 {
            buf.enqueue(&[3; 3000], false);
            assert_eq!(buf.state.lock().spare.capacity(), 0);
            buf.drain(4096);
            assert!(buf.is_absent());
        }

        assert_eq!(buf.state.lock().spare.capacity(), settled);
    }

    #[test]
    fn test_concurrent_producer_and_consumer_lose_nothing() {
        let buf = Arc::new(buffer());
        let producer = {
            let buf = Arc::clone(&buf);
            std::thread::spawn(move || {
                for i in 0..200i16 {
                    buf.enqueue(&[i; 50], false);
                }
            })
        };

        let mut played = Vec::new();
        for _ in 0..200 {
            let frame = buf.drain(64);
            assert_eq!(frame.len(), 64);
            played.extend(frame);
        }
        producer.join().unwrap();
        played.extend(buf.drain(10_000));

        let real: Vec<i16> = played.iter().copied().filter(|&s| s != 0).collect();
        let expected: Vec<i16> = (1..200i16).flat_map(|i| std::iter::repeat(i).take(50)).collect();
        assert_eq!(real, expected);
    }
}
