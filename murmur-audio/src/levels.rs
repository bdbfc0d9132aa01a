/// Root-mean-square amplitude of a sample block.
pub fn rms_amplitude(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Maps an RMS value onto the [0, 1] display range.
///
/// Speech RMS sits well below full scale, so the raw value is boosted
/// before clamping; the factor is tuned for a readable waveform, not for
/// metering accuracy.
pub fn normalize_amplitude(rms: f32) -> f32 {
    (rms * 5.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_is_zero() {
        assert_eq!(rms_amplitude(&[]), 0.0);
        assert_eq!(rms_amplitude(&[0.0; 64]), 0.0);
        assert_eq!(normalize_amplitude(0.0), 0.0);
    }

    #[test]
    fn full_scale_clamps_to_one() {
        let rms = rms_amplitude(&[1.0; 64]);
        assert!((rms - 1.0).abs() < 1e-6);
        assert_eq!(normalize_amplitude(rms), 1.0);
    }

    #[test]
    fn quiet_speech_is_boosted_but_bounded() {
        let normalized = normalize_amplitude(0.1);
        assert!((normalized - 0.5).abs() < 1e-6);
        assert!(normalize_amplitude(0.5) <= 1.0);
    }
}
