use crate::dsp::{compute_rms, parabolic_offset};
use crate::error::PitchResult;
use crate::pitch::{validate_input, EstimatorConfig, PitchEstimator};
use crate::types::PitchEstimate;
use log::trace;

/// YIN fundamental-frequency estimator.
///
/// # How it works
///
/// 1. Silence gate on the buffer RMS.
/// 2. Squared-difference function `d(τ)` over the first half of the buffer.
/// 3. Cumulative-mean normalization `d'(τ) = d(τ)·τ / Σ d(1..=τ)`, `d'(0) = 1`.
/// 4. First lag (from τ = 2) whose `d'` dips under the absolute threshold,
///    then walk down to the bottom of that dip. Taking the first dip rather
///    than the global minimum keeps the estimate off subharmonics.
/// 5. Parabolic interpolation around the dip for sub-sample lag.
/// 6. `f = sample_rate / lag`, `confidence = 1 − d'(τ)`, range filter.
///
/// The dip walk is bounded by the end of the lag table. A walk that ends
/// at the table edge skips interpolation; its lag is long enough that the
/// range filter almost always discards it anyway.
pub struct Yin;

impl PitchEstimator for Yin {
    fn name(&self) -> &'static str {
        "yin"
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
            trace!("yin: silent (rms={:.5})", rms);
            return Ok(PitchEstimate::none());
        }

        let cmnd = normalized_difference(samples);
        let tau = match first_dip(&cmnd, config.threshold) {
            Some(t) => t,
            None => {
                trace!("yin: no dip under {:.2}", config.threshold);
                return Ok(PitchEstimate::none());
            }
        };

        let refined = if tau + 1 < cmnd.len() {
            let offset = parabolic_offset(cmnd[tau - 1], cmnd[tau], cmnd[tau + 1]);
            tau as f64 + offset.unwrap_or(0.0)
        } else {
            tau as f64
        };

        let hz = sample_rate / refined;
        let confidence = 1.0 - cmnd[tau];
        trace!(
            "yin: τ={} refined={:.3} → {:.2} Hz conf={:.3}",
            tau,
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

/// Cumulative-mean-normalized difference table, indexed by lag `0..half`.
fn normalized_difference(samples: &[f32]) -> Vec<f64> {
    let half = samples.len() / 2;
    let mut cmnd = vec![0.0f64; half];
    cmnd[0] = 1.0;

    let mut running_sum = 0.0f64;
    for tau in 1..half {
        let mut diff = 0.0f64;
        for i in 0..half {
            let d = samples[i] as f64 - samples[i + tau] as f64;
            diff += d * d;
        }
        running_sum += diff;
        cmnd[tau] = if running_sum > 0.0 {
            diff * tau as f64 / running_sum
        } else {
            1.0
        };
    }
    cmnd
}

/// First lag under `threshold`, advanced to the bottom of its dip.
fn first_dip(cmnd: &[f64], threshold: f64) -> Option<usize> {
    let start = (2..cmnd.len()).find(|&tau| cmnd[tau] < threshold)?;
    let mut tau = start;
    while tau + 1 < cmnd.len() && cmnd[tau + 1] < cmnd[tau] {
        tau += 1;
    }
    Some(tau)
}
