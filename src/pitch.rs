//! Pitch estimation front end: parameters, engine selection, and the
//! `PitchEstimator` trait shared by the YIN and autocorrelation engines.
//!
//! Estimators are stateless. Every call takes the buffer, its sample rate and
//! the caller's `EstimatorConfig`, and returns either an estimate (possibly
//! "no detection") or a `PitchError` for malformed input.

use crate::autocorrelation::Autocorrelation;
use crate::error::{PitchError, PitchResult};
use crate::types::PitchEstimate;
use crate::yin::Yin;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Smallest number of samples either engine needs after halving the buffer.
pub const MIN_HALF_LEN: usize = 4;

/// Which estimation strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    /// Cumulative-mean-normalized difference function (default).
    #[default]
    Yin,
    /// Raw autocorrelation peak picking. Cheaper, less robust to noise.
    Autocorrelation,
}

impl Engine {
    pub fn estimator(self) -> &'static dyn PitchEstimator {
        match self {
            Engine::Yin => &Yin,
            Engine::Autocorrelation => &Autocorrelation,
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.estimator().name())
    }
}

/// Algorithm parameters, owned by the caller and read-only during a pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    pub engine: Engine,
    /// YIN absolute threshold on the normalized difference function.
    pub threshold: f64,
    /// Accepted fundamental range `[min_hz, max_hz]`.
    pub frequency_range: [f64; 2],
    /// Buffers quieter than this RMS are reported as no detection.
    pub silence_rms: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            engine: Engine::Yin,
            threshold: 0.15,
            frequency_range: [70.0, 1200.0],
            silence_rms: 0.01,
        }
    }
}

impl EstimatorConfig {
    pub fn min_hz(&self) -> f64 {
        self.frequency_range[0]
    }

    pub fn max_hz(&self) -> f64 {
        self.frequency_range[1]
    }

    pub fn in_range(&self, hz: f64) -> bool {
        (self.min_hz()..=self.max_hz()).contains(&hz)
    }

    pub fn validate(&self) -> PitchResult<()> {
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(PitchError::invalid_param(
                "threshold",
                format!("{} is outside (0, 1)", self.threshold),
            ));
        }
        let [lo, hi] = self.frequency_range;
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo < hi) {
            return Err(PitchError::invalid_param(
                "frequency_range",
                format!("[{}, {}] is not an increasing positive range", lo, hi),
            ));
        }
        if !(self.silence_rms >= 0.0 && self.silence_rms.is_finite()) {
            return Err(PitchError::invalid_param(
                "silence_rms",
                format!("{} must be a non-negative number", self.silence_rms),
            ));
        }
        Ok(())
    }
}

/// One fundamental-frequency estimation strategy.
pub trait PitchEstimator: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Estimate the fundamental of `samples`.
    fn estimate(
        &self,
        samples: &[f32],
        sample_rate: f64,
        config: &EstimatorConfig,
    ) -> PitchResult<PitchEstimate>;
}

/// Run the engine selected in `config`.
pub fn estimate(
    samples: &[f32],
    sample_rate: f64,
    config: &EstimatorConfig,
) -> PitchResult<PitchEstimate> {
    config.engine.estimator().estimate(samples, sample_rate, config)
}

/// Shared input checks for every engine.
pub(crate) fn validate_input(
    samples: &[f32],
    sample_rate: f64,
    config: &EstimatorConfig,
) -> PitchResult<()> {
    if samples.len() / 2 < MIN_HALF_LEN {
        return Err(PitchError::BufferTooShort {
            len: samples.len(),
            min: MIN_HALF_LEN * 2,
        });
    }
    if !(sample_rate > 0.0 && sample_rate.is_finite()) {
        return Err(PitchError::InvalidSampleRate { rate: sample_rate });
    }
    config.validate()
}
