//! Audio device integration using cpal
//!
//! Opens one fixed-format output stream (signed 16-bit, configured rate,
//! channel count and callback size) and drives the [`PlaybackBuffer`] from
//! the driver's real-time callback. The stream is open for as long as the
//! [`AudioDevice`] is alive.

use super::{PlaybackBuffer, StreamConfig};
use crate::config::DeviceSelector;
use crate::{PlaybackError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use tracing::{error, info};

/// Open output stream feeding from a playback buffer
pub struct AudioDevice {
    _stream: cpal::Stream,
    buffer: Arc<PlaybackBuffer>,
    config: StreamConfig,
    device_name: String,
}

impl AudioDevice {
    /// Open the selected device and start pulling from `buffer`
    ///
    /// # Arguments
    /// * `selector` - Which output device to use
    /// * `config` - Sample rate, frames per callback and channel count
    /// * `buffer` - Playback buffer drained once per callback
    ///
    /// # Errors
    ///
    /// [`PlaybackError::DeviceInit`] if the device does not exist or rejects
    /// the requested format.
    pub fn open(
        selector: &DeviceSelector,
        config: StreamConfig,
        buffer: Arc<PlaybackBuffer>,
    ) -> Result<Self> {
        let host = cpal::default_host();
        let device = select_device(&host, selector)?;
        let device_name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());

        let frames = u32::try_from(config.buffer_size).map_err(|_| {
            PlaybackError::DeviceInit(format!("buffer size {} too large", config.buffer_size))
        })?;
        let stream_config = cpal::StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(frames),
        };

        let channels = config.channels as usize;
        let callback_buffer = Arc::clone(&buffer);
        // Sized for the configured callback so the steady state never allocates
        let mut scratch = vec![0i16; config.buffer_size];

        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                    callback_buffer.fill_output(data, channels, &mut scratch);
                },
                |err| error!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| {
                PlaybackError::DeviceInit(format!(
                    "Failed to open '{device_name}' for {} Hz / {} ch / {} frames: {e}",
                    config.sample_rate, config.channels, config.buffer_size
                ))
            })?;

        stream
            .play()
            .map_err(|e| PlaybackError::DeviceInit(format!("Failed to start audio stream: {e}")))?;

        info!(
            device = %device_name,
            sample_rate = config.sample_rate,
            channels = config.channels,
            buffer_size = config.buffer_size,
            latency_ms = config.latency_ms(),
            "Audio stream opened"
        );

        Ok(AudioDevice {
            _stream: stream,
            buffer,
            config,
            device_name,
        })
    }

    /// Stop the stream and release the device
    pub fn close(self) {
        drop(self);
    }

    /// Name of the opened device
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Format the stream was opened with
    pub fn config(&self) -> StreamConfig {
        self.config
    }

    /// Buffer the callback drains
    pub fn buffer(&self) -> &Arc<PlaybackBuffer> {
        &self.buffer
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        let stats = self.buffer.stats();
        info!(
            device = %self.device_name,
            callbacks = stats.callbacks,
            samples_played = stats.samples_played,
            underruns = stats.underruns,
            "Audio stream closed"
        );
    }
}

/// Resolve a [`DeviceSelector`] against the host's output devices
fn select_device(host: &cpal::Host, selector: &DeviceSelector) -> Result<cpal::Device> {
    match selector {
        DeviceSelector::Default => host
            .default_output_device()
            .ok_or_else(|| PlaybackError::DeviceInit("No audio output device available".into())),
        DeviceSelector::Index(index) => host
            .output_devices()
            .map_err(|e| PlaybackError::DeviceInit(format!("Failed to list output devices: {e}")))?
            .nth(*index)
            .ok_or_else(|| PlaybackError::DeviceInit(format!("No output device at index {index}"))),
        DeviceSelector::Name(name) => host
            .output_devices()
            .map_err(|e| PlaybackError::DeviceInit(format!("Failed to list output devices: {e}")))?
            .find(|device| device.name().map(|n| n == *name).unwrap_or(false))
            .ok_or_else(|| PlaybackError::DeviceInit(format!("No output device named '{name}'"))),
    }
}
