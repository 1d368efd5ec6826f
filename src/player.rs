//! Producers: one-shot cue sounds and streamed speech
//!
//! Both feed the shared [`PlaybackBuffer`]. Cue sounds are folded to mono,
//! cut into callback-sized chunks, quantised and played to completion without
//! visualization. Speech chunks arrive at whatever size the synthesizer emits
//! and are visualized.

use crate::asset::AudioAsset;
use crate::config::PlaybackConfig;
use crate::quantize::f32_to_i16;
use crate::streaming::PlaybackBuffer;
use crate::Result;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A text-to-speech engine as seen by the playback core
pub trait SpeechSource {
    /// Successive float chunks in [-1, 1] at the output sample rate
    type Chunks: Iterator<Item = Vec<f32>>;

    /// Start synthesizing `text`
    fn synthesize(&mut self, text: &str) -> Result<Self::Chunks>;
}

/// Feeds sounds and speech into a playback buffer
#[derive(Debug, Clone)]
pub struct SoundPlayer {
    buffer: Arc<PlaybackBuffer>,
    buffer_size: usize,
}

impl SoundPlayer {
    /// Create a player that chunks one-shot sounds into `buffer_size` samples
    pub fn new(buffer: Arc<PlaybackBuffer>, buffer_size: usize) -> Self {
        SoundPlayer {
            buffer,
            buffer_size: buffer_size.max(1),
        }
    }

    /// Play a one-shot sound and block until it has (approximately) finished.
    pub fn play(&self, asset: &AudioAsset) {
        let chunks = self.queue(asset);
        debug!(chunks, "Queued one-shot sound");
        self.buffer.await_drained();
    }

    /// Queue a one-shot sound without waiting; returns the number of chunks.
    ///
    /// Multi-channel material is averaged to mono, then enqueued in
    /// `buffer_size` pieces (the last one may be shorter), never visualized.
    pub fn queue(&self, asset: &AudioAsset) -> usize {
        if asset.sample_rate() != self.buffer.sample_rate() {
            warn!(
                asset_rate = asset.sample_rate(),
                stream_rate = self.buffer.sample_rate(),
                "Playing sound at a mismatched sample rate"
            );
        }

        let mono = asset.to_mono();
        let mut pcm = Vec::with_capacity(self.buffer_size);
        let mut chunks = 0;
        for chunk in mono.chunks(self.buffer_size) {
            pcm.clear();
            pcm.extend(chunk.iter().copied().map(f32_to_i16));
            self.buffer.enqueue(&pcm, false);
            chunks += 1;
        }
        chunks
    }

    /// Queue synthesized speech chunk by chunk, visualized; returns the sample count.
    ///
    /// Does not wait for playback: call [`PlaybackBuffer::await_drained`] when
    /// the utterance must finish before the next sound.
    pub fn stream_speech<I, C>(&self, chunks: I) -> usize
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[f32]>,
    {
        let mut pcm = Vec::new();
        let mut total = 0;
        for chunk in chunks {
            let chunk = chunk.as_ref();
            pcm.clear();
            pcm.extend(chunk.iter().copied().map(f32_to_i16));
            self.buffer.enqueue(&pcm, true);
            total += pcm.len();
        }
        total
    }

    /// Synthesize `text` with `source` and stream the result.
    pub fn speak<S: SpeechSource>(&self, source: &mut S, text: &str) -> Result<usize> {
        let chunks = source.synthesize(text)?;
        let samples = self.stream_speech(chunks);
        info!(
            samples,
            seconds = samples as f32 / self.buffer.sample_rate().max(1) as f32,
            "Speech queued"
        );
        Ok(samples)
    }

    /// The buffer this player feeds
    pub fn buffer(&self) -> &Arc<PlaybackBuffer> {
        &self.buffer
    }
}

/// The assistant's fixed cue sounds, normalised to the output rate at load time
#[derive(Debug, Clone)]
pub struct CuePlayer {
    player: SoundPlayer,
    listening: AudioAsset,
    transition: AudioAsset,
}

impl CuePlayer {
    /// Wrap already-loaded cue assets
    pub fn new(player: SoundPlayer, listening: AudioAsset, transition: AudioAsset) -> Self {
        CuePlayer {
            player,
            listening,
            transition,
        }
    }

    /// Load both cue files named in `config` and resample them to its rate.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::PlaybackError::AssetLoad`] or
    /// [`crate::PlaybackError::InvalidAudioData`]; either must stop startup
    /// before the output stream is opened.
    pub fn from_config(config: &PlaybackConfig, buffer: Arc<PlaybackBuffer>) -> Result<Self> {
        let listening =
            AudioAsset::load_at_rate(&config.assets.listening_sound, config.samplerate)?;
        let transition =
            AudioAsset::load_at_rate(&config.assets.transition_sound, config.samplerate)?;
        Ok(Self::new(
            SoundPlayer::new(buffer, config.buffer_size),
            listening,
            transition,
        ))
    }

    /// Play the "listening" cue to completion
    pub fn play_listening(&self) {
        self.player.play(&self.listening);
    }

    /// Play the "transition" cue to completion
    pub fn play_transition(&self) {
        self.player.play(&self.transition);
    }

    /// The underlying sound player
    pub fn player(&self) -> &SoundPlayer {
        &self.player
    }

    /// The "listening" cue
    pub fn listening(&self) -> &AudioAsset {
        &self.listening
    }

    /// The "transition" cue
    pub fn transition(&self) -> &AudioAsset {
        &self.transition
    }
}
