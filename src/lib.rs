//! Real-time playback core for a voice assistant
//!
//! Turns audio chunks produced irregularly by a text-to-speech engine into the
//! fixed-size frames a native audio driver pulls on a strict schedule. Producers
//! append to a single [`PlaybackBuffer`]; the driver callback drains exactly
//! `buffer_size` frames per invocation and zero-fills any shortfall.
//!
//! # Features
//! - Underrun-safe playback buffer (silence is the only recovery policy)
//! - FFT-based offline resampling of cue sounds to the output rate
//! - Mono fold-down and int16 quantisation for one-shot sounds
//! - Non-blocking "now playing" notifications for a waveform visualizer
//!
//! # Crate feature flags
//! - `streaming` (opt-in): Real-time audio output via cpal (`AudioDevice`) and the CLI
//!
//! # Quick start
//! ## Buffer only
//! ```
//! use voice_playback::{NullVisualizer, PlaybackBuffer};
//! use std::sync::Arc;
//!
//! let buffer = PlaybackBuffer::new(24_000, Arc::new(NullVisualizer));
//! buffer.enqueue(&[1000; 1000], false);
//! let frame = buffer.drain(4096);
//! assert_eq!(&frame[..1000], &[1000; 1000][..]);
//! assert!(frame[1000..].iter().all(|&s| s == 0));
//! ```
//!
//! ## Real-time streaming
//! ```no_run
//! # #[cfg(feature = "streaming")]
//! # {
//! use voice_playback::{AudioDevice, CuePlayer, NullVisualizer, PlaybackBuffer, PlaybackConfig};
//! use std::sync::Arc;
//!
//! let config = PlaybackConfig::load("config.json").unwrap();
//! let stream = config.stream_config();
//! let buffer = Arc::new(PlaybackBuffer::new(stream.sample_rate, Arc::new(NullVisualizer)));
//! let cues = CuePlayer::from_config(&config, Arc::clone(&buffer)).unwrap();
//! let _dev = AudioDevice::open(&config.audio_device, stream, Arc::clone(&buffer)).unwrap();
//! cues.play_listening();
//! # }
//! ```

#![warn(missing_docs)]

pub mod asset; // Cue sound decoding
pub mod config; // Runtime parameters
pub mod player; // One-shot sounds and speech producer
pub mod quantize; // Sample format conversion
pub mod resample; // Offline rate conversion
pub mod streaming; // Playback buffer & driver binding
pub mod visualizer; // UI side-channel

use std::path::PathBuf;

/// Error types for playback core operations
#[derive(thiserror::Error, Debug)]
pub enum PlaybackError {
    /// Audio device could not be found or opened
    #[error("Audio device error: {0}")]
    DeviceInit(String),

    /// Asset file could not be read or decoded
    #[error("Failed to load asset '{}': {reason}", .path.display())]
    AssetLoad {
        /// Asset file path
        path: PathBuf,
        /// Why loading failed
        reason: String,
    },

    /// Audio data rejected by a conversion step
    #[error("Invalid audio data: {0}")]
    InvalidAudioData(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error from filesystem or device
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<String> for PlaybackError {
    /// Converts a String into `PlaybackError::Other`.
    ///
    /// Prefer the specific variants (`Config`, `DeviceInit`, ...) where the failure
    /// category is known; this exists for ad-hoc messages only.
    fn from(msg: String) -> Self {
        PlaybackError::Other(msg)
    }
}

impl From<&str> for PlaybackError {
    fn from(msg: &str) -> Self {
        PlaybackError::Other(msg.to_string())
    }
}

/// Result type for playback core operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

// Public API exports
pub use asset::AudioAsset;
pub use config::{AssetPaths, DeviceSelector, PlaybackConfig};
pub use player::{CuePlayer, SoundPlayer, SpeechSource};
pub use resample::resample;
pub use streaming::{PlaybackBuffer, PlaybackStats, StreamConfig};
pub use visualizer::{FrameRecycler, NullVisualizer, QueuedVisualizer, VisualEvent, Visualizer};

#[cfg(feature = "streaming")]
pub use streaming::AudioDevice;
