use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

// ─── Audio data ─────────────────────────────────────────────────────────────

/// A chunk of audio samples from a buffer source (WAV file or simulator).
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Microseconds since session start (timestamp of first sample)
    pub timestamp_us: u64,
    /// Mono f32 samples, normalized -1.0 to 1.0
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl AudioChunk {
    /// Timestamp just past the last sample.
    pub fn end_us(&self) -> u64 {
        self.timestamp_us + self.samples.len() as u64 * 1_000_000 / self.sample_rate.max(1) as u64
    }
}

// ─── Pitch estimate ─────────────────────────────────────────────────────────

/// Result of one estimation pass over a sample buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchEstimate {
    /// Fundamental frequency in Hz. None when the buffer is too quiet, has no
    /// periodic structure, or the estimate fell outside the configured range.
    pub frequency_hz: Option<f64>,
    /// Periodicity strength, 0.0–1.0. Always 0.0 when `frequency_hz` is None.
    pub confidence: f64,
}

impl PitchEstimate {
    pub fn none() -> Self {
        Self {
            frequency_hz: None,
            confidence: 0.0,
        }
    }

    pub fn detected(frequency_hz: f64, confidence: f64) -> Self {
        Self {
            frequency_hz: Some(frequency_hz),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn is_detected(&self) -> bool {
        self.frequency_hz.is_some()
    }

    /// The frequency, but only if confidence reaches `min_confidence`.
    pub fn gated(&self, min_confidence: f64) -> Option<f64> {
        self.frequency_hz.filter(|_| self.confidence >= min_confidence)
    }
}

// ─── Notes and fretboard ────────────────────────────────────────────────────

/// Nearest chromatic note for a frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NoteInfo {
    pub name: &'static str,
    pub midi: i32,
    pub octave: i32,
}

impl fmt::Display for NoteInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.octave)
    }
}

/// One open string of the instrument.
/// String 1 is the highest-pitched string, string 6 the lowest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TuningEntry {
    pub string_index: u8,
    pub note_name: &'static str,
    pub octave: i32,
    pub reference_hz: f64,
    pub midi: i32,
}

/// A (string, fret) cell of the fretboard with the note it sounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FretPosition {
    pub string_index: u8,
    pub fret: u8,
    pub note_name: &'static str,
    pub octave: i32,
    pub frequency_hz: f64,
    pub midi: i32,
}

impl fmt::Display for FretPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "string {} fret {:>2} → {}{} ({:.2} Hz)",
            self.string_index, self.fret, self.note_name, self.octave, self.frequency_hz
        )
    }
}

// ─── Per-pass output ────────────────────────────────────────────────────────

/// Everything one analysis pass produced.
/// Produced by the session, consumed by the console display and tests.
/// Rendered for humans by `console_display::render_line`.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionFrame {
    pub timestamp_us: u64,
    pub estimate: PitchEstimate,
    /// Nearest note, only when the estimate passed the confidence gate
    pub note: Option<NoteInfo>,
    /// Position the player is asked to play, if any
    pub target: Option<FretPosition>,
    /// Target frequency after the per-string calibration offset
    pub adjusted_target_hz: Option<f64>,
    /// Signed distance to the adjusted target. Positive = sharp.
    pub cents_offset: Option<f64>,
    pub matched: bool,
}

// ─── Inter-thread messages ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum InputEvent {
    Audio(AudioChunk),
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic clock for the training session.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}
