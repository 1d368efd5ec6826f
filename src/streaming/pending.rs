//! Pending PCM samples awaiting playback
//!
//! "No session" and "session open but nothing queued" are different states:
//! a buffer drained to exactly zero stays [`PendingBuffer::Active`] until the
//! next callback finds it empty and retires it.

use std::collections::VecDeque;

/// Samples queued between producers and the driver callback
#[derive(Debug, Default)]
pub enum PendingBuffer {
    /// No playback in progress
    #[default]
    Absent,
    /// Playback in progress; holds the samples not yet delivered
    Active(VecDeque<i16>),
}

/// Result of one [`PendingBuffer::take_into`] call
#[derive(Debug, Default)]
pub struct Take {
    /// Real samples copied to the output (the rest is zero padding)
    pub delivered: usize,
    /// Whether the output had to be padded while a session was active
    pub underrun: bool,
    /// Storage of a buffer that just became absent, for reuse by the next session
    pub released: Option<VecDeque<i16>>,
}

impl PendingBuffer {
    /// Append a chunk, opening the buffer with `storage` if it was absent.
    ///
    /// `storage` is only consumed on the absent → active transition so that a
    /// previously released allocation can be reused.
    pub fn append(&mut self, chunk: &[i16], storage: impl FnOnce() -> VecDeque<i16>) {
        match self {
            PendingBuffer::Absent => {
                let mut samples = storage();
                samples.clear();
                samples.extend(chunk.iter().copied());
                *self = PendingBuffer::Active(samples);
            }
            PendingBuffer::Active(samples) => samples.extend(chunk.iter().copied()),
        }
    }

    /// Fill `out` completely from the front of the buffer.
    ///
    /// - absent: `out` becomes silence
    /// - enough samples: the first `out.len()` samples are moved out
    /// - too few: the remainder is copied, zero-padded, and the buffer becomes absent
    pub fn take_into(&mut self, out: &mut [i16]) -> Take {
        let samples = match self {
            PendingBuffer::Absent => {
                out.fill(0);
                return Take::default();
            }
            PendingBuffer::Active(samples) => samples,
        };

        let wanted = out.len();
        if samples.len() >= wanted {
            let (front, back) = samples.as_slices();
            if front.len() >= wanted {
                out.copy_from_slice(&front[..wanted]);
            } else {
                out[..front.len()].copy_from_slice(front);
                out[front.len()..].copy_from_slice(&back[..wanted - front.len()]);
            }
            samples.drain(..wanted);
            return Take {
                delivered: wanted,
                ..Take::default()
            };
        }

        let delivered = samples.len();
        let (front, back) = samples.as_slices();
        out[..front.len()].copy_from_slice(front);
        out[front.len()..delivered].copy_from_slice(back);
        out[delivered..].fill(0);

        let released = match std::mem::take(self) {
            PendingBuffer::Active(storage) => Some(storage),
            PendingBuffer::Absent => None,
        };
        Take {
            delivered,
            underrun: true,
            released,
        }
    }

    /// Number of samples still queued (0 when absent)
    pub fn len(&self) -> usize {
        match self {
            PendingBuffer::Absent => 0,
            PendingBuffer::Active(samples) => samples.len(),
        }
    }

    /// True when nothing is queued, whether or not a session is open
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when no session is open
    pub fn is_absent(&self) -> bool {
        matches!(self, PendingBuffer::Absent)
    }
}
