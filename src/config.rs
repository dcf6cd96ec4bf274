//! Trainer configuration: everything a pass reads but never writes.
//!
//! The caller owns one `TrainerConfig`, mutates it only between passes
//! (settings change, finished calibration), and hands it to each pass by
//! reference. Stored as JSON; every field has a default so partial files load.

use crate::calibration::CalibrationOffsets;
use crate::error::{ConfigError, PitchError, PitchResult};
use crate::matcher::Difficulty;
use crate::pitch::{EstimatorConfig, MIN_HALF_LEN};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub estimator: EstimatorConfig,
    /// Estimates below this confidence are shown as "no note" and never match.
    pub min_confidence: f64,
    pub difficulty: Difficulty,
    /// Explicit tolerance in cents; overrides `difficulty` when set.
    pub tolerance_cents: Option<f64>,
    /// Samples per analysis window.
    pub buffer_size: usize,
    /// Passes per second (one per display refresh).
    pub analysis_rate_hz: u32,
    pub calibration: CalibrationOffsets,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            estimator: EstimatorConfig::default(),
            min_confidence: 0.5,
            difficulty: Difficulty::Normal,
            tolerance_cents: None,
            buffer_size: 2048,
            analysis_rate_hz: 60,
            calibration: CalibrationOffsets::default(),
        }
    }
}

impl TrainerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&data)?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Config saved to {:?}", path);
        Ok(())
    }

    pub fn tolerance_cents(&self) -> f64 {
        self.tolerance_cents
            .unwrap_or_else(|| self.difficulty.tolerance_cents())
    }

    /// Samples between passes at the given sample rate.
    pub fn hop_size(&self, sample_rate: u32) -> usize {
        hop_size(sample_rate, self.analysis_rate_hz)
    }

    /// Reject settings no pass could run with.
    pub fn validate(&self) -> PitchResult<()> {
        self.estimator.validate()?;
        if self.buffer_size < 2 * MIN_HALF_LEN {
            return Err(PitchError::invalid_param(
                "buffer_size",
                format!("{} is below {} samples", self.buffer_size, 2 * MIN_HALF_LEN),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(PitchError::invalid_param(
                "min_confidence",
                format!("{} is outside [0, 1]", self.min_confidence),
            ));
        }
        if let Some(t) = self.tolerance_cents {
            if !(t.is_finite() && t > 0.0) {
                return Err(PitchError::invalid_param(
                    "tolerance_cents",
                    format!("{} must be a positive number", t),
                ));
            }
        }
        Ok(())
    }
}

/// Samples between passes for `rate_hz` passes per second.
pub fn hop_size(sample_rate: u32, rate_hz: u32) -> usize {
    (sample_rate / rate_hz.max(1)).max(1) as usize
}
