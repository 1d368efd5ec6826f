//! Decoded, immutable sound assets
//!
//! Cue sounds are read once at startup, normalised to the output sample rate
//! and then shared read-only for the lifetime of the process.

use crate::resample::resample_interleaved;
use crate::{PlaybackError, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Highest channel count accepted for an asset
pub const MAX_ASSET_CHANNELS: u16 = 8;

/// A decoded sound: interleaved float samples plus their rate and layout
#[derive(Debug, Clone, PartialEq)]
pub struct AudioAsset {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl AudioAsset {
    /// Build an asset from interleaved samples.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::InvalidAudioData`] for a zero sample rate, an
    /// unsupported channel count, or a sample count that is not a whole number
    /// of frames.
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(PlaybackError::InvalidAudioData(
                "sample rate must be greater than 0".into(),
            ));
        }
        if channels == 0 || channels > MAX_ASSET_CHANNELS {
            return Err(PlaybackError::InvalidAudioData(format!(
                "unsupported channel layout: {channels} channels (1..={MAX_ASSET_CHANNELS})"
            )));
        }
        if samples.len() % channels as usize != 0 {
            return Err(PlaybackError::InvalidAudioData(format!(
                "{} samples do not divide into {channels} channels",
                samples.len()
            )));
        }
        Ok(AudioAsset {
            samples,
            channels,
            sample_rate,
        })
    }

    /// Build a mono asset.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, 1, sample_rate)
    }

    /// Decode a WAV file into floating-point samples in [-1, 1].
    ///
    /// Integer PCM of any bit depth and 32-bit float data are accepted.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let fail = |reason: String| PlaybackError::AssetLoad {
            path: path.to_path_buf(),
            reason,
        };

        let reader = WavReader::open(path).map_err(|e| fail(e.to_string()))?;
        let spec = reader.spec();

        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| fail(e.to_string()))?,
            SampleFormat::Int => {
                let full_scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| fail(e.to_string()))?
            }
        };

        if samples.is_empty() {
            return Err(fail("file contains no samples".into()));
        }

        let asset = Self::new(samples, spec.channels, spec.sample_rate).map_err(|e| match e {
            PlaybackError::InvalidAudioData(reason) => fail(reason),
            other => other,
        })?;

        info!(
            path = %path.display(),
            channels = asset.channels,
            sample_rate = asset.sample_rate,
            seconds = asset.duration().as_secs_f32(),
            "Loaded audio asset"
        );
        Ok(asset)
    }

    /// Decode a WAV file and bring it to `target_rate`.
    pub fn load_at_rate<P: AsRef<Path>>(path: P, target_rate: u32) -> Result<Self> {
        Self::load(path)?.into_rate(target_rate)
    }

    /// Convert to `target_rate`, leaving the asset untouched if it already matches.
    pub fn into_rate(self, target_rate: u32) -> Result<Self> {
        if self.sample_rate == target_rate {
            return Ok(self);
        }
        debug!(
            from = self.sample_rate,
            to = target_rate,
            "Resampling audio asset"
        );
        let samples =
            resample_interleaved(&self.samples, self.channels, self.sample_rate, target_rate)?;
        Ok(AudioAsset {
            samples,
            channels: self.channels,
            sample_rate: target_rate,
        })
    }

    /// Average all channels into a single one.
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels == 1 {
            return self.samples.clone();
        }
        let channels = self.channels as usize;
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    }

    /// Interleaved samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Number of interleaved channels
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Playback length at the asset's own rate
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }
}
