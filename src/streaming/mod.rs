//! Real-time playback: producer-side buffer and driver-side callback
//!
//! Producers (speech synthesis, one-shot cue sounds) append PCM chunks to a
//! [`PlaybackBuffer`]. The audio driver pulls exactly one callback's worth of
//! frames at a time and receives silence whenever the producers fall behind.

pub mod pending;
pub mod playback_buffer;

#[cfg(feature = "streaming")]
pub mod audio_device;

pub use pending::PendingBuffer;
pub use playback_buffer::{PlaybackBuffer, PlaybackSession, PlaybackStats, DEFAULT_STREAM_NAME};

#[cfg(feature = "streaming")]
pub use audio_device::AudioDevice;

use std::time::Duration;

/// Default output sample rate (24 kHz, the native rate of the speech models)
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Default frames per driver callback
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Output stream format: signed 16-bit at a fixed rate and callback size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Frames the driver requests per callback
    /// Larger sizes = more latency but fewer callbacks
    pub buffer_size: usize,

    /// Number of output channels (mono material is copied to each)
    pub channels: u16,
}

impl StreamConfig {
    /// Create a mono configuration
    pub fn mono(sample_rate: u32, buffer_size: usize) -> Self {
        StreamConfig {
            sample_rate,
            buffer_size,
            channels: 1,
        }
    }

    /// Time between two driver callbacks
    pub fn callback_period(&self) -> Duration {
        Duration::from_secs_f64(self.buffer_size as f64 / self.sample_rate as f64)
    }

    /// Get latency of one callback buffer in milliseconds
    pub fn latency_ms(&self) -> f32 {
        ((self.buffer_size as f32) / (self.sample_rate as f32)) * 1000.0
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::mono(DEFAULT_SAMPLE_RATE, DEFAULT_BUFFER_SIZE)
    }
}
