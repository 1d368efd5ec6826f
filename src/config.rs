//! Runtime parameters for the playback core
//!
//! Read once at startup from a JSON document:
//!
//! ```json
//! {
//!   "audio_device": "default",
//!   "samplerate": 24000,
//!   "buffer_size": 4096,
//!   "channels": 1,
//!   "assets": {
//!     "listening_sound": "assets/listening.wav",
//!     "transition_sound": "assets/transition.wav"
//!   }
//! }
//! ```

use crate::streaming::StreamConfig;
use crate::{PlaybackError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Which output device to open
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<RawDevice>", into = "RawDevice")]
pub enum DeviceSelector {
    /// Platform default output device (`"default"`, `null` or omitted)
    #[default]
    Default,
    /// Position in the host's list of output devices
    Index(usize),
    /// Exact device name as reported by the host
    Name(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDevice {
    Index(usize),
    Name(String),
}

impl From<Option<RawDevice>> for DeviceSelector {
    fn from(raw: Option<RawDevice>) -> Self {
        match raw {
            None => DeviceSelector::Default,
            Some(RawDevice::Index(index)) => DeviceSelector::Index(index),
            Some(RawDevice::Name(name)) if name.eq_ignore_ascii_case("default") => {
                DeviceSelector::Default
            }
            Some(RawDevice::Name(name)) => DeviceSelector::Name(name),
        }
    }
}

impl From<DeviceSelector> for RawDevice {
    fn from(selector: DeviceSelector) -> Self {
        match selector {
            DeviceSelector::Default => RawDevice::Name("default".into()),
            DeviceSelector::Index(index) => RawDevice::Index(index),
            DeviceSelector::Name(name) => RawDevice::Name(name),
        }
    }
}

impl std::fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceSelector::Default => write!(f, "default"),
            DeviceSelector::Index(index) => write!(f, "#{index}"),
            DeviceSelector::Name(name) => write!(f, "\"{name}\""),
        }
    }
}

/// Cue sound files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPaths {
    /// Played when the assistant starts listening
    pub listening_sound: PathBuf,
    /// Played between listening and answering
    pub transition_sound: PathBuf,
}

/// Configuration consumed when the playback core is constructed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Output device
    #[serde(default)]
    pub audio_device: DeviceSelector,
    /// Output sample rate in Hz
    pub samplerate: u32,
    /// Frames per driver callback
    pub buffer_size: usize,
    /// Output channel count
    pub channels: u16,
    /// Cue sound files
    pub assets: AssetPaths,
}

impl PlaybackConfig {
    /// Read and validate a JSON configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            PlaybackError::Config(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json(text: &str) -> Result<Self> {
        let config: PlaybackConfig =
            serde_json::from_str(text).map_err(|e| PlaybackError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the output stream cannot be opened with
    pub fn validate(&self) -> Result<()> {
        if self.samplerate == 0 {
            return Err(PlaybackError::Config(
                "samplerate must be greater than 0".into(),
            ));
        }
        if self.buffer_size == 0 {
            return Err(PlaybackError::Config(
                "buffer_size must be greater than 0".into(),
            ));
        }
        if self.buffer_size > u32::MAX as usize {
            return Err(PlaybackError::Config(format!(
                "buffer_size {} is too large",
                self.buffer_size
            )));
        }
        if self.channels == 0 {
            return Err(PlaybackError::Config(
                "channels must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    /// Output stream format described by this configuration
    pub fn stream_config(&self) -> StreamConfig {
        StreamConfig {
            sample_rate: self.samplerate,
            buffer_size: self.buffer_size,
            channels: self.channels,
        }
    }
}
