//! Offline sample-rate conversion
//!
//! Band-limited resampling in the frequency domain: the whole signal is
//! transformed, its spectrum is truncated or zero-padded to the target length,
//! and transformed back. This keeps everything below the Nyquist frequency of
//! the lower of the two rates and is only meant for short, fixed assets that
//! are converted once at load time.

use crate::{PlaybackError, Result};
use rustfft::{num_complex::Complex, FftPlanner};

/// Number of output samples for `len` input samples: `round(len * target / source)`.
pub fn output_len(len: usize, source_rate: u32, target_rate: u32) -> usize {
    let source = source_rate as u64;
    let scaled = len as u64 * target_rate as u64;
    ((scaled + source / 2) / source) as usize
}

/// Resample a mono sequence from `source_rate` to `target_rate`.
///
/// Equal rates return the input unchanged, bit for bit.
///
/// # Errors
///
/// Returns [`PlaybackError::InvalidAudioData`] if `samples` is empty, either
/// rate is zero, or the conversion would produce no output at all.
pub fn resample(samples: &[f32], source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    validate(samples.len(), source_rate, target_rate)?;

    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }

    let out_len = output_len(samples.len(), source_rate, target_rate);
    if out_len == 0 {
        return Err(PlaybackError::InvalidAudioData(format!(
            "{} samples at {source_rate} Hz leave nothing at {target_rate} Hz",
            samples.len()
        )));
    }

    let mut planner = FftPlanner::<f32>::new();
    Ok(fft_resample(&mut planner, samples, out_len))
}

/// Resample interleaved multi-channel material, each channel independently.
///
/// # Errors
///
/// Same conditions as [`resample`], plus a zero channel count or a sample count
/// that is not a whole number of frames.
pub fn resample_interleaved(
    samples: &[f32],
    channels: u16,
    source_rate: u32,
    target_rate: u32,
) -> Result<Vec<f32>> {
    if channels == 0 {
        return Err(PlaybackError::InvalidAudioData(
            "channel count must be greater than 0".into(),
        ));
    }
    if channels == 1 {
        return resample(samples, source_rate, target_rate);
    }

    let channels = channels as usize;
    if samples.len() % channels != 0 {
        return Err(PlaybackError::InvalidAudioData(format!(
            "{} samples do not divide into {channels} channels",
            samples.len()
        )));
    }
    let frames = samples.len() / channels;
    validate(frames, source_rate, target_rate)?;

    if source_rate == target_rate {
        return Ok(samples.to_vec());
    }

    let out_frames = output_len(frames, source_rate, target_rate);
    if out_frames == 0 {
        return Err(PlaybackError::InvalidAudioData(format!(
            "{frames} frames at {source_rate} Hz leave nothing at {target_rate} Hz"
        )));
    }

    let mut planner = FftPlanner::<f32>::new();
    let mut output = vec![0.0f32; out_frames * channels];
    let mut lane = Vec::with_capacity(frames);

    for ch in 0..channels {
        lane.clear();
        lane.extend(samples.iter().skip(ch).step_by(channels).copied());
        let converted = fft_resample(&mut planner, &lane, out_frames);
        for (frame, sample) in converted.into_iter().enumerate() {
            output[frame * channels + ch] = sample;
        }
    }

    Ok(output)
}

fn validate(len: usize, source_rate: u32, target_rate: u32) -> Result<()> {
    if len == 0 {
        return Err(PlaybackError::InvalidAudioData(
            "cannot resample an empty signal".into(),
        ));
    }
    if source_rate == 0 || target_rate == 0 {
        return Err(PlaybackError::InvalidAudioData(format!(
            "sample rates must be positive (source {source_rate} Hz, target {target_rate} Hz)"
        )));
    }
    Ok(())
}

fn fft_resample(planner: &mut FftPlanner<f32>, input: &[f32], out_len: usize) -> Vec<f32> {
    let in_len = input.len();

    let mut spectrum: Vec<Complex<f32>> = input.iter().map(|&s| Complex::new(s, 0.0)).collect();
    planner.plan_fft_forward(in_len).process(&mut spectrum);

    // Bins shared by both lengths: DC and positive frequencies up to the
    // smaller Nyquist, then the matching negative frequencies at the tail.
    let shared = in_len.min(out_len);
    let positive = shared / 2 + 1;
    let negative = shared - positive;

    let mut resized = vec![Complex::new(0.0f32, 0.0); out_len];
    resized[..positive].copy_from_slice(&spectrum[..positive]);
    for j in 1..=negative {
        resized[out_len - j] = spectrum[in_len - j];
    }

    if shared % 2 == 0 {
        let half = shared / 2;
        if out_len < in_len {
            // Fold the mirrored bin into the new Nyquist bin
            resized[half] = spectrum[half] + spectrum[in_len - half];
        } else if out_len > in_len {
            // Split the old Nyquist bin across both halves of the wider spectrum
            let split = spectrum[half] * 0.5;
            resized[half] = split;
            resized[out_len - half] = split;
        }
    }

    planner.plan_fft_inverse(out_len).process(&mut resized);

    let scale = 1.0 / in_len as f32;
    resized.into_iter().map(|c| c.re * scale).collect()
}
