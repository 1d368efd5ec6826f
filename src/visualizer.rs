//! "Now playing" side channel for a waveform display
//!
//! `load` is called from producer threads at most once per session; `update`
//! is called from the real-time callback once per frame while a session is
//! visualized. Implementations must therefore never block in `update`.
//! [`QueuedVisualizer`] hands events to a bounded channel and drops frames
//! the UI has not kept up with.

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// How long [`QueuedVisualizer`] waits for room before dropping a `load` event
pub const LOAD_SEND_TIMEOUT: Duration = Duration::from_millis(100);

/// Receiver of playback notifications
pub trait Visualizer: Send + Sync {
    /// A new visualized session is starting on `stream_name`
    fn load(&self, stream_name: &str);

    /// One delivered frame, as float amplitudes in [-1, 1]
    fn update(&self, stream_name: &str, samples: &[f32]);
}

/// Visualizer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVisualizer;

impl Visualizer for NullVisualizer {
    fn load(&self, _stream_name: &str) {}

    fn update(&self, _stream_name: &str, _samples: &[f32]) {}
}

/// Notification forwarded by [`QueuedVisualizer`]
#[derive(Debug, Clone, PartialEq)]
pub enum VisualEvent {
    /// Start showing `stream`
    Load {
        /// Stream name
        stream: Arc<str>,
    },
    /// Waveform for the frame just handed to the driver
    Update {
        /// Stream name
        stream: Arc<str>,
        /// Frame samples in [-1, 1]; hand back through a [`FrameRecycler`] when done
        samples: Vec<f32>,
    },
}

/// Returns consumed frame buffers to the [`QueuedVisualizer`] they came from
#[derive(Debug, Clone)]
pub struct FrameRecycler {
    returns: Sender<Vec<f32>>,
}

impl FrameRecycler {
    /// Give a frame back for reuse; dropped if the pool is already full
    pub fn recycle(&self, frame: Vec<f32>) {
        let _ = self.returns.try_send(frame);
    }
}

/// Forwards notifications to a bounded channel without blocking the callback
///
/// Frame buffers circulate through a small pool: the UI returns them with
/// [`FrameRecycler::recycle`] and `update` refills them, so the callback only
/// allocates while the pool is warming up or when the UI keeps its frames.
#[derive(Debug)]
pub struct QueuedVisualizer {
    sender: Sender<VisualEvent>,
    pool: Receiver<Vec<f32>>,
    returns: Sender<Vec<f32>>,
    stream: Mutex<Option<Arc<str>>>,
    dropped: AtomicU64,
    dropped_loads: AtomicU64,
}

impl QueuedVisualizer {
    /// Create a visualizer and the receiving end for the UI thread.
    ///
    /// `capacity` bounds how many undelivered frames may pile up.
    pub fn bounded(capacity: usize) -> (Self, Receiver<VisualEvent>) {
        let capacity = capacity.max(1);
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        let (returns, pool) = crossbeam_channel::bounded(capacity + 1);
        (
            QueuedVisualizer {
                sender,
                pool,
                returns,
                stream: Mutex::new(None),
                dropped: AtomicU64::new(0),
                dropped_loads: AtomicU64::new(0),
            },
            receiver,
        )
    }

    /// Handle the UI uses to return frames once drawn
    pub fn recycler(&self) -> FrameRecycler {
        FrameRecycler {
            returns: self.returns.clone(),
        }
    }

    /// Number of frames discarded because the queue was full
    pub fn dropped_updates(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of `load` events given up after [`LOAD_SEND_TIMEOUT`]
    pub fn dropped_loads(&self) -> u64 {
        self.dropped_loads.load(Ordering::Relaxed)
    }

    /// Shared copy of `name`, allocated only when the stream changes
    fn stream_name(&self, name: &str) -> Arc<str> {
        let mut cached = self.stream.lock();
        if let Some(stream) = cached.as_ref() {
            if stream.as_ref() == name {
                return Arc::clone(stream);
            }
        }
        let stream: Arc<str> = Arc::from(name);
        *cached = Some(Arc::clone(&stream));
        stream
    }
}

impl Visualizer for QueuedVisualizer {
    fn load(&self, stream_name: &str) {
        let event = VisualEvent::Load {
            stream: self.stream_name(stream_name),
        };
        // Producer side: wait briefly for room, but a stalled UI must not stop speech
        match self.sender.send_timeout(event, LOAD_SEND_TIMEOUT) {
            Ok(()) => {}
            Err(SendTimeoutError::Timeout(_)) => {
                self.dropped_loads.fetch_add(1, Ordering::Relaxed);
                warn!(stream = stream_name, "Visualizer queue full; load event dropped");
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                warn!(stream = stream_name, "Visualizer receiver dropped");
            }
        }
    }

    fn update(&self, stream_name: &str, samples: &[f32]) {
        let mut frame = self.pool.try_recv().unwrap_or_default();
        frame.clear();
        frame.extend_from_slice(samples);
        let event = VisualEvent::Update {
            stream: self.stream_name(stream_name),
            samples: frame,
        };
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) | Err(TrySendError::Disconnected(event)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                if let VisualEvent::Update { samples, .. } = event {
                    let _ = self.returns.try_send(samples);
                }
            }
        }
    }
}
