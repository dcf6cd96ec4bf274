use crate::dsp::{compute_rms, parabolic_offset};
use crate::error::PitchResult;
use crate::pitch::{validate_input, EstimatorConfig, PitchEstimator, MIN_HALF_LEN};
use crate::types::PitchEstimate;
use log::trace;

/// Autocorrelation pitch estimator.
///
/// Trims the buffer to a rising-zero-crossing span, computes the raw
/// autocorrelation for every lag, and takes the first periodic peak after the
/// correlation has dropped under half its zero-lag energy. Confidence is the
/// peak height relative to the zero-lag energy.
///
/// Simpler than YIN and noticeably worse on noisy input; kept as an
/// alternative engine.
pub struct Autocorrelation;

impl PitchEstimator for Autocorrelation {
    fn name(&self) -> &'static str {
        "autocorrelation"
    }

    fn estimate(
        &self,
        samples: &[f32],
        sample_rate: f64,
        config: &EstimatorConfig,
    ) -> PitchResult<PitchEstimate> {
        validate_input(samples, sample_rate, config)?;

        let rms = compute_rms(samples);
        if rms < config.silence_rms {
            trace!("acf: silent (rms={:.5})", rms);
            return Ok(PitchEstimate::none());
        }

        let trimmed = trim_to_zero_crossings(samples);
        if trimmed.len() < MIN_HALF_LEN * 2 {
            return Ok(PitchEstimate::none());
        }

        let r = autocorrelate(trimmed);
        if r[0] <= 0.0 {
            return Ok(PitchEstimate::none());
        }

        let peak = match first_peak(&r) {
            Some(p) => p,
            None => {
                trace!("acf: no periodic peak in {} lags", r.len());
                return Ok(PitchEstimate::none());
            }
        };

        let offset = parabolic_offset(r[peak - 1], r[peak], r[peak + 1]).unwrap_or(0.0);
        let refined = peak as f64 + offset;
        let hz = sample_rate / refined;
        let confidence = r[peak] / r[0];
        trace!(
            "acf: peak={} refined={:.3} → {:.2} Hz conf={:.3}",
            peak,
            refined,
            hz,
            confidence
        );

        if !hz.is_finite() || !config.in_range(hz) {
            return Ok(PitchEstimate::none());
        }
        Ok(PitchEstimate::detected(hz, confidence))
    }
}

/// Slice from the first rising zero crossing in the first half to the last
/// rising zero crossing in the second half. An edge with no crossing is left
/// untrimmed.
fn trim_to_zero_crossings(samples: &[f32]) -> &[f32] {
    let n = samples.len();
    let half = n / 2;
    let rising = |i: usize| samples[i] <= 0.0 && samples[i + 1] > 0.0;

    let start = (0..half).find(|&i| rising(i)).unwrap_or(0);
    let end = (half..n - 1).rev().find(|&i| rising(i)).map_or(n, |i| i + 1);
    if end <= start {
        return samples;
    }
    &samples[start..end]
}

/// Unnormalized autocorrelation `r(lag) = Σ x[i]·x[i+lag]` for every lag.
fn autocorrelate(samples: &[f32]) -> Vec<f64> {
    let n = samples.len();
    (0..n)
        .map(|lag| {
            samples[..n - lag]
                .iter()
                .zip(&samples[lag..])
                .map(|(&a, &b)| a as f64 * b as f64)
                .sum()
        })
        .collect()
}

/// First genuine periodic peak: fall under half the zero-lag value, ride the
/// slope down to the trough, then up to the next local maximum.
fn first_peak(r: &[f64]) -> Option<usize> {
    let n = r.len();
    let half_energy = 0.5 * r[0];

    let mut lag = 1;
    while lag < n && r[lag] > half_energy {
        lag += 1;
    }
    while lag + 1 < n && r[lag + 1] <= r[lag] {
        lag += 1;
    }
    while lag + 1 < n && r[lag + 1] > r[lag] {
        lag += 1;
    }

    // Ran off the end of the table without a peak on both sides
    if lag + 1 >= n || r[lag] <= 0.0 {
        return None;
    }
    Some(lag)
}
