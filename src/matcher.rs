//! Cents-based pitch matching.
//!
//! Distances are measured in cents (1200 per octave), so a tolerance means the
//! same thing at 82 Hz as at 880 Hz.

use crate::notes::MIN_NOTE_HZ;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TOLERANCE_CENTS: f64 = 50.0;

/// Signed distance from `target_hz` to `detected_hz` in cents.
/// Positive = sharp, negative = flat.
pub fn cents_offset(detected_hz: f64, target_hz: f64) -> f64 {
    1200.0 * (detected_hz / target_hz).log2()
}

/// True if `detected_hz` is within `tolerance_cents` of `target_hz`, either
/// direction. Missing, non-finite, non-positive and sub-20 Hz detections never
/// match.
pub fn is_match(detected_hz: Option<f64>, target_hz: f64, tolerance_cents: f64) -> bool {
    let detected = match detected_hz {
        Some(hz) if hz.is_finite() && hz >= MIN_NOTE_HZ => hz,
        _ => return false,
    };
    if !(target_hz > 0.0 && target_hz.is_finite()) {
        return false;
    }
    cents_offset(detected, target_hz).abs() <= tolerance_cents
}

/// Match strictness presets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// ±100¢: the neighbouring semitone still counts
    Easy,
    /// ±50¢: nearest semitone
    #[default]
    Normal,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn tolerance_cents(self) -> f64 {
        match self {
            Difficulty::Easy => 100.0,
            Difficulty::Normal => DEFAULT_TOLERANCE_CENTS,
            Difficulty::Hard => 25.0,
            Difficulty::Expert => 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(hz: f64, cents: f64) -> f64 {
        hz * 2f64.powf(cents / 1200.0)
    }

    #[test]
    fn test_reflexive() {
        for f in [20.5, 82.41, 440.0, 1318.5, 4000.0] {
            for tol in [0.0, 10.0, 50.0, 100.0] {
                assert!(is_match(Some(f), f, tol), "{} Hz @ {}¢", f, tol);
            }
        }
    }

    #[test]
    fn test_symmetric_sharp_flat() {
        let target = 196.0;
        assert!(is_match(Some(shift(target, 20.0)), target, 50.0));
        assert!(is_match(Some(shift(target, -20.0)), target, 50.0));
        assert!(!is_match(Some(shift(target, 100.0)), target, 50.0));
        assert!(!is_match(Some(shift(target, -100.0)), target, 50.0));
    }

    #[test]
    fn test_boundary_inclusive() {
        let target = 110.0;
        assert!(is_match(Some(shift(target, 49.9)), target, 50.0));
        assert!(!is_match(Some(shift(target, 50.1)), target, 50.0));
    }

    #[test]
    fn test_rejects_bad_detections() {
        for d in [None, Some(0.0), Some(-110.0), Some(19.9), Some(f64::NAN)] {
            assert!(!is_match(d, 110.0, 1200.0), "{:?}", d);
        }
        assert!(!is_match(Some(110.0), 0.0, 50.0));
    }

    #[test]
    fn test_cents_offset_sign() {
        assert_eq!(cents_offset(440.0, 440.0), 0.0);
        assert!(cents_offset(445.0, 440.0) > 0.0);
        assert!(cents_offset(435.0, 440.0) < 0.0);
        assert!((cents_offset(880.0, 440.0) - 1200.0).abs() < 1e-9);
        assert!((cents_offset(shift(82.41, -30.0), 82.41) + 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_difficulty_tolerances() {
        assert_eq!(Difficulty::default().tolerance_cents(), 50.0);
        let tols: Vec<f64> = [
            Difficulty::Easy,
            Difficulty::Normal,
            Difficulty::Hard,
            Difficulty::Expert,
        ]
        .iter()
        .map(|d| d.tolerance_cents())
        .collect();
        assert!(tols.windows(2).all(|w| w[0] > w[1]));
        // A detection 30¢ flat passes on normal but not on hard
        let d = Some(shift(246.94, -30.0));
        assert!(is_match(d, 246.94, Difficulty::Normal.tolerance_cents()));
        assert!(!is_match(d, 246.94, Difficulty::Hard.tolerance_cents()));
    }
}
