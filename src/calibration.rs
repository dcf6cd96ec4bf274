//! Per-string calibration: cents offsets applied to target frequencies.
//!
//! A guitar tuned a little flat or sharp would otherwise fail every match on
//! that string. Instead of asking the player to retune, we learn a per-string
//! offset from a held open string and shift the targets to meet the guitar.
//!
//! The interactive collector that feeds this from live audio lives in
//! `calibrator.rs`.

use crate::error::{CalibrationError, ConfigError};
use crate::fretboard::tuning_entry;
use crate::matcher::cents_offset;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Any sample further than this from the expected open string rejects the run.
pub const REJECT_CENTS: f64 = 100.0;

/// How long the player holds the open string.
pub const HOLD_SECS: f64 = 2.0;

/// Per-string offsets in cents, keyed by string index (1–6). Missing = 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationOffsets {
    pub strings: BTreeMap<u8, f64>,
}

impl CalibrationOffsets {
    /// Load from a JSON file. Returns None if file is absent or malformed.
    pub fn load(path: &Path) -> Option<Self> {
        let data = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(c) => {
                info!("Loaded calibration from {:?}", path);
                Some(c)
            }
            Err(e) => {
                warn!("Failed to parse calibration file {:?}: {}", path, e);
                None
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        info!("Calibration saved to {:?}", path);
        Ok(())
    }

    pub fn offset(&self, string_index: u8) -> f64 {
        self.strings.get(&string_index).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, string_index: u8, cents: f64) {
        self.strings.insert(string_index, cents);
    }

    pub fn clear(&mut self, string_index: u8) {
        self.strings.remove(&string_index);
    }

    /// `raw_hz` shifted by the string's offset: `raw · 2^(offset/1200)`.
    pub fn adjusted_target(&self, raw_hz: f64, string_index: u8) -> f64 {
        raw_hz * 2.0_f64.powf(self.offset(string_index) / 1200.0)
    }
}

/// Offset in cents that maps `expected_hz` onto the median of `samples`.
///
/// Rejects the whole set if any sample is more than `REJECT_CENTS` away from
/// `expected_hz`.
pub fn compute_offset(samples: &[f64], expected_hz: f64) -> Result<f64, CalibrationError> {
    if samples.is_empty() {
        return Err(CalibrationError::NoSamples);
    }
    if let Some(worst) = samples
        .iter()
        .map(|&s| cents_offset(s, expected_hz))
        .find(|c| !(c.abs() <= REJECT_CENTS))
    {
        return Err(CalibrationError::WrongNote {
            deviation_cents: worst,
            limit_cents: REJECT_CENTS,
        });
    }
    Ok(cents_offset(median(samples), expected_hz))
}

fn median(v: &[f64]) -> f64 {
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

// ─── Hold collector ──────────────────────────────────────────────────────────

/// Where a calibration hold currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationStatus {
    /// Still inside the hold window. `progress` runs 0.0 → 1.0.
    Collecting { samples: usize, progress: f64 },
    /// Hold finished and the samples agreed with the expected string.
    Complete { offset_cents: f64, samples: usize },
    /// Hold finished with a bad sample set. The session has reset and the
    /// next detection starts a fresh hold.
    Rejected(CalibrationError),
}

/// Collects pitch samples while the player holds one open string.
///
/// The hold window starts at the first detected pitch and closes once
/// `hold_us` has elapsed; "no detection" frames neither start nor extend it.
pub struct CalibrationSession {
    string_index: u8,
    expected_hz: f64,
    hold_us: u64,
    started_us: Option<u64>,
    samples: Vec<f64>,
}

impl CalibrationSession {
    pub fn new(string_index: u8) -> Result<Self, CalibrationError> {
        let entry = tuning_entry(string_index).ok_or(CalibrationError::UnknownString(string_index))?;
        Ok(Self {
            string_index,
            expected_hz: entry.reference_hz,
            hold_us: (HOLD_SECS * 1_000_000.0) as u64,
            started_us: None,
            samples: Vec::new(),
        })
    }

    pub fn with_hold_secs(mut self, secs: f64) -> Self {
        self.hold_us = (secs.max(0.0) * 1_000_000.0) as u64;
        self
    }

    pub fn string_index(&self) -> u8 {
        self.string_index
    }

    pub fn expected_hz(&self) -> f64 {
        self.expected_hz
    }

    /// Feed one estimator result taken at `timestamp_us`.
    pub fn push(&mut self, frequency_hz: Option<f64>, timestamp_us: u64) -> CalibrationStatus {
        if let Some(hz) = frequency_hz {
            let start = *self.started_us.get_or_insert(timestamp_us);
            if timestamp_us.saturating_sub(start) < self.hold_us || self.samples.is_empty() {
                self.samples.push(hz);
            }
        }

        let start = match self.started_us {
            Some(s) => s,
            None => {
                return CalibrationStatus::Collecting {
                    samples: 0,
                    progress: 0.0,
                }
            }
        };
        let elapsed = timestamp_us.saturating_sub(start);
        if elapsed < self.hold_us {
            return CalibrationStatus::Collecting {
                samples: self.samples.len(),
                progress: elapsed as f64 / self.hold_us as f64,
            };
        }

        let n = self.samples.len();
        let result = compute_offset(&self.samples, self.expected_hz);
        self.reset();
        match result {
            Ok(offset_cents) => {
                info!(
                    "String {} calibrated: {:+.1} cents from {} samples",
                    self.string_index, offset_cents, n
                );
                CalibrationStatus::Complete {
                    offset_cents,
                    samples: n,
                }
            }
            Err(e) => {
                warn!("String {} calibration rejected: {}", self.string_index, e);
                CalibrationStatus::Rejected(e)
            }
        }
    }

    pub fn reset(&mut self) {
        self.started_us = None;
        self.samples.clear();
    }
}
