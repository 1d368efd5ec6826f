//! Sample format conversion between float amplitude and signed 16-bit PCM

/// Full-scale factor used for both directions of the conversion
pub const I16_SCALE: f32 = 32768.0;

/// Quantise one float sample: `round(sample * 32768)` clamped to the i16 domain.
#[inline]
pub fn f32_to_i16(sample: f32) -> i16 {
    let scaled = (sample * I16_SCALE).round();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

/// Quantise a slice of float samples.
pub fn quantize(samples: &[f32]) -> Vec<i16> {
    samples.iter().copied().map(f32_to_i16).collect()
}

/// Normalise one PCM sample to floating-point amplitude in [-1, 1).
#[inline]
pub fn i16_to_f32(sample: i16) -> f32 {
    sample as f32 / I16_SCALE
}

/// Normalise `src` into `dest`, reusing its allocation.
pub fn normalize_into(src: &[i16], dest: &mut Vec<f32>) {
    dest.clear();
    dest.extend(src.iter().copied().map(i16_to_f32));
}
