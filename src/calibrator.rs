//! Open-string calibrator.
//!
//! Reads `InputEvent::Audio` chunks from a channel, so it works with both
//! the WAV player and the simulator. The player holds one open string; pitch
//! samples are collected for the hold window and turned into a cents offset
//! for that string. A rejected hold (wrong string, wrong note) is reported
//! and the next detection starts a new hold.

use crate::calibration::{CalibrationSession, CalibrationStatus};
use crate::config::TrainerConfig;
use crate::error::CalibrationError;
use crate::pitch::estimate;
use crate::session::AudioWindow;
use crate::types::InputEvent;
use crossbeam_channel::Receiver;
use log::{info, warn};

pub struct Calibrator {
    audio_rx: Receiver<InputEvent>,
    config: TrainerConfig,
    /// Rejected holds tolerated before giving up
    max_attempts: u32,
}

impl Calibrator {
    pub fn new(audio_rx: Receiver<InputEvent>, config: TrainerConfig) -> Self {
        Self {
            audio_rx,
            config,
            max_attempts: 3,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Run until `session` completes, the attempts run out, or the audio
    /// channel closes. Returns the learned offset in cents.
    pub fn run(&self, mut session: CalibrationSession) -> Result<f64, CalibrationError> {
        info!(
            "Calibrating string {}: hold the open string ({:.2} Hz)",
            session.string_index(),
            session.expected_hz()
        );

        let mut window = AudioWindow::new(&self.config);
        let mut attempts = 0u32;
        let mut last_err = CalibrationError::NoSamples;

        for event in self.audio_rx.iter() {
            let InputEvent::Audio(chunk) = event;
            window.push(&chunk);
            let samples = match window.take() {
                Some(s) => s,
                None => continue,
            };

            let est = match estimate(samples, chunk.sample_rate as f64, &self.config.estimator) {
                Ok(e) => e,
                Err(e) => {
                    warn!("Calibration pass failed: {}", e);
                    continue;
                }
            };

            match session.push(est.gated(self.config.min_confidence), chunk.end_us()) {
                CalibrationStatus::Collecting { .. } => {}
                CalibrationStatus::Complete { offset_cents, .. } => return Ok(offset_cents),
                CalibrationStatus::Rejected(e) => {
                    attempts += 1;
                    warn!(
                        "Attempt {}/{} rejected ({}). Hold the open string {} and try again.",
                        attempts,
                        self.max_attempts,
                        e,
                        session.string_index()
                    );
                    last_err = e;
                    if attempts >= self.max_attempts {
                        return Err(last_err);
                    }
                }
            }
        }

        warn!("Audio ended before calibration finished.");
        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::pluck_samples;
    use crate::types::AudioChunk;
    use crossbeam_channel::unbounded;

    fn feed(freq: f64, secs: f64) -> Receiver<InputEvent> {
        let (tx, rx) = unbounded();
        let sr = 44100u32;
        let total = (secs * sr as f64) as u64;
        let mut age = 0u64;
        while age < total {
            let n = 512.min((total - age) as usize);
            tx.send(InputEvent::Audio(AudioChunk {
                timestamp_us: age * 1_000_000 / sr as u64,
                samples: pluck_samples(freq, 0.6, sr, age, n),
                sample_rate: sr,
            }))
            .unwrap();
            age += n as u64;
        }
        rx
    }

    #[test]
    fn test_calibrates_flat_string() {
        let session = CalibrationSession::new(5).unwrap();
        let flat = session.expected_hz() * 2f64.powf(-25.0 / 1200.0);
        let rx = feed(flat, 3.0);
        let offset = Calibrator::new(rx, TrainerConfig::default())
            .run(session)
            .unwrap();
        assert!((offset + 25.0).abs() < 3.0, "offset={:.2}", offset);
    }

    #[test]
    fn test_wrong_string_rejected() {
        // Player holds the A string while calibrating low E
        let session = CalibrationSession::new(6).unwrap();
        let rx = feed(110.0, 5.0);
        let err = Calibrator::new(rx, TrainerConfig::default())
            .with_max_attempts(2)
            .run(session)
            .unwrap_err();
        assert!(matches!(err, CalibrationError::WrongNote { .. }), "{:?}", err);
    }

    #[test]
    fn test_audio_ends_early() {
        let session = CalibrationSession::new(1).unwrap();
        let rx = feed(329.63, 0.5);
        let err = Calibrator::new(rx, TrainerConfig::default())
            .run(session)
            .unwrap_err();
        assert_eq!(err, CalibrationError::NoSamples);
    }

    #[test]
    fn test_waits_for_configured_window() {
        // 0.15s is under one 8192-sample window: no pass runs at all
        let session = CalibrationSession::new(5).unwrap().with_hold_secs(0.05);
        let config = TrainerConfig {
            buffer_size: 8192,
            ..Default::default()
        };
        let err = Calibrator::new(feed(110.0, 0.15), config).run(session).unwrap_err();
        assert_eq!(err, CalibrationError::NoSamples);

        // The default 2048-sample window completes the same short hold
        let session = CalibrationSession::new(5).unwrap().with_hold_secs(0.05);
        let offset = Calibrator::new(feed(110.0, 0.15), TrainerConfig::default())
            .run(session)
            .unwrap();
        assert!(offset.abs() < 3.0, "offset={:.2}", offset);
    }
}
