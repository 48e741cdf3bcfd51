//! CSI payload decoding: raw sample bytes → per-subcarrier amplitudes.
//!
//! The firmware reports one complex channel estimate per OFDM subcarrier,
//! packed as interleaved little-endian `i16` real/imaginary pairs in
//! natural FFT output order. Decoding reorders the sequence so index 0 is
//! the most negative frequency (DC in the middle) and reduces each sample
//! to its magnitude.

use num_complex::Complex;

/// Error produced when a payload cannot supply a full amplitude vector.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExtractError {
    #[error("csi payload too short: got {got} bytes, need {need}")]
    InsufficientData { got: usize, need: usize },
}

/// Number of subcarriers reported for a channel of the given bandwidth.
///
/// `floor(bandwidth × 3.2)` — 64 for 20 MHz up to 512 for 160 MHz.
pub fn subcarrier_count(bandwidth_mhz: f64) -> usize {
    (bandwidth_mhz * 3.2) as usize
}

/// Decode a CSI payload into `nsub` per-subcarrier amplitudes.
///
/// Only the first `4 × nsub` bytes are consumed; trailing bytes are
/// ignored. Amplitudes are plain Euclidean magnitudes — no clamping or
/// rounding, display scaling is the consumer's business.
pub fn amplitudes(payload: &[u8], nsub: usize) -> Result<Vec<f64>, ExtractError> {
    let need = nsub * 4;
    if payload.len() < need {
        return Err(ExtractError::InsufficientData {
            got: payload.len(),
            need,
        });
    }

    let mut csi: Vec<Complex<f64>> = payload[..need]
        .chunks_exact(4)
        .map(|b| {
            let re = i16::from_le_bytes([b[0], b[1]]) as f64;
            let im = i16::from_le_bytes([b[2], b[3]]) as f64;
            Complex::new(re, im)
        })
        .collect();

    fft_shift(&mut csi);

    Ok(csi.into_iter().map(|z| z.norm()).collect())
}

/// Center the zero-frequency component: rotate the sequence so the upper
/// half comes first. Self-inverse for even lengths.
pub fn fft_shift<T>(v: &mut [T]) {
    let n = v.len() / 2;
    v.rotate_right(n);
}
