// Waveform blob codec
// Packs normalized amplitude samples into little-endian i16 for the waveform_blob column

/// Integer ceiling a sample of 1.0 maps to
pub const SAMPLE_CEILING: f32 = i16::MAX as f32;

/// Bytes per encoded sample
pub const SAMPLE_WIDTH: usize = 2;

/// Encode normalized samples (0.0..=1.0) into a blob.
///
/// Out-of-range values are clamped, NaN is stored as silence. The output is
/// always `SAMPLE_WIDTH * samples.len()` bytes.
pub fn encode_waveform(samples: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(samples.len() * SAMPLE_WIDTH);
    for &sample in samples {
        let clamped = if sample.is_nan() { 0.0 } else { sample.clamp(0.0, 1.0) };
        let quantized = (clamped * SAMPLE_CEILING).round() as i16;
        blob.extend_from_slice(&quantized.to_le_bytes());
    }
    blob
}

/// Decode a blob back into samples.
///
/// Best effort: the blob is not validated. A trailing odd byte is dropped and
/// blobs that were not produced by `encode_waveform` may yield negative values.
pub fn decode_waveform(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(SAMPLE_WIDTH)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / SAMPLE_CEILING)
        .collect()
}
