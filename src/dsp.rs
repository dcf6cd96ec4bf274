//! Shared DSP primitives: RMS, parabolic peak refinement, and test signal generators.

/// Root mean square of an audio buffer.
pub fn compute_rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum / samples.len() as f64).sqrt()
}

/// Sub-sample offset of the extremum of the parabola through three equally
/// spaced points (left, center, right), relative to the center index.
///
/// Works for both minima (difference tables) and maxima (correlation tables).
/// Returns None when the three points are collinear and the vertex is undefined.
pub fn parabolic_offset(left: f64, center: f64, right: f64) -> Option<f64> {
    let denom = 2.0 * (2.0 * center - right - left);
    if denom.abs() < f64::EPSILON {
        return None;
    }
    let offset = (right - left) / denom;
    offset.is_finite().then_some(offset)
}

/// Test signal generators shared by unit tests.
#[cfg(test)]
pub mod test_helpers {
    use std::f64::consts::PI;

    /// Generate `n` samples of a mono sine wave.
    pub fn sine_samples(freq_hz: f64, amp: f64, sr: f64, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (amp * (2.0 * PI * freq_hz * i as f64 / sr).sin()) as f32)
            .collect()
    }

    /// Generate a tone with a few decaying harmonics, closer to a plucked string.
    pub fn harmonic_tone(freq_hz: f64, amp: f64, sr: f64, n: usize) -> Vec<f32> {
        let partials = [(1.0, 1.0), (2.0, 0.5), (3.0, 0.25), (4.0, 0.12)];
        let norm: f64 = partials.iter().map(|(_, a)| a).sum();
        (0..n)
            .map(|i| {
                let t = i as f64 / sr;
                partials
                    .iter()
                    .map(|&(h, a)| a * (2.0 * PI * freq_hz * h * t).sin())
                    .sum::<f64>()
                    * amp
                    / norm
            })
            .map(|s| s as f32)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_helpers::sine_samples;
    use super::*;

    #[test]
    fn test_rms_of_sine() {
        // RMS of a full-scale sine is amp / sqrt(2)
        let s = sine_samples(441.0, 0.5, 44100.0, 4410);
        let rms = compute_rms(&s);
        assert!((rms - 0.5 / 2f64.sqrt()).abs() < 1e-3, "rms={}", rms);
    }

    #[test]
    fn test_rms_empty_and_silent() {
        assert_eq!(compute_rms(&[]), 0.0);
        assert_eq!(compute_rms(&[0.0; 64]), 0.0);
    }

    #[test]
    fn test_parabolic_offset_symmetric_is_zero() {
        let off = parabolic_offset(1.0, 0.2, 1.0).unwrap();
        assert!(off.abs() < 1e-12);
    }

    #[test]
    fn test_parabolic_offset_recovers_vertex() {
        // y = (x - 0.3)^2 sampled at x = -1, 0, 1
        let f = |x: f64| (x - 0.3) * (x - 0.3);
        let off = parabolic_offset(f(-1.0), f(0.0), f(1.0)).unwrap();
        assert!((off - 0.3).abs() < 1e-9, "offset={}", off);

        // Maximum: y = -(x + 0.25)^2
        let g = |x: f64| -(x + 0.25) * (x + 0.25);
        let off = parabolic_offset(g(-1.0), g(0.0), g(1.0)).unwrap();
        assert!((off + 0.25).abs() < 1e-9, "offset={}", off);
    }

    #[test]
    fn test_parabolic_offset_collinear() {
        assert_eq!(parabolic_offset(0.1, 0.2, 0.3), None);
    }
}
