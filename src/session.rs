use crate::config::{hop_size, TrainerConfig};
use crate::console_display::render_line;
use crate::error::PitchResult;
use crate::matcher::{cents_offset, is_match};
use crate::notes::frequency_to_note;
use crate::pitch::estimate;
use crate::types::*;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, trace};

/// One full analysis pass: estimator → note mapper → match evaluator.
///
/// Pure apart from logging. The note and the cents offset are only reported
/// when the estimate clears `config.min_confidence`; the match is evaluated
/// against the target after its string's calibration offset.
pub fn analyze(
    samples: &[f32],
    sample_rate: f64,
    config: &TrainerConfig,
    target: Option<&FretPosition>,
    timestamp_us: u64,
) -> PitchResult<DetectionFrame> {
    let est = estimate(samples, sample_rate, &config.estimator)?;
    let heard = est.gated(config.min_confidence);

    let note = heard.and_then(frequency_to_note);
    let adjusted_target_hz =
        target.map(|t| config.calibration.adjusted_target(t.frequency_hz, t.string_index));
    let cents = match (heard, adjusted_target_hz) {
        (Some(hz), Some(t)) => Some(cents_offset(hz, t)),
        _ => None,
    };
    let matched = adjusted_target_hz
        .map(|t| is_match(heard, t, config.tolerance_cents()))
        .unwrap_or(false);

    Ok(DetectionFrame {
        timestamp_us,
        estimate: est,
        note,
        target: target.copied(),
        adjusted_target_hz,
        cents_offset: cents,
        matched,
    })
}

/// Sliding analysis window over the incoming audio.
///
/// Keeps at most two windows of samples and hands out the latest full
/// window once per hop. Training sessions and the calibrator both pace
/// their passes through it.
pub struct AudioWindow {
    buf: Vec<f32>,
    size: usize,
    rate_hz: u32,
    /// Samples accumulated since last pass
    samples_since_analysis: usize,
    sample_rate: u32,
}

impl AudioWindow {
    pub fn new(config: &TrainerConfig) -> Self {
        Self {
            buf: Vec::with_capacity(config.buffer_size * 2),
            size: config.buffer_size,
            rate_hz: config.analysis_rate_hz,
            samples_since_analysis: 0,
            sample_rate: 44100,
        }
    }

    pub fn push(&mut self, chunk: &AudioChunk) {
        self.sample_rate = chunk.sample_rate;
        self.buf.extend_from_slice(&chunk.samples);
        self.samples_since_analysis += chunk.samples.len();

        // Keep buffer bounded
        let max_len = self.size * 2;
        if self.buf.len() > max_len {
            let excess = self.buf.len() - max_len;
            self.buf.drain(..excess);
        }
    }

    /// True if a full window is buffered and a hop has elapsed.
    pub fn ready(&self) -> bool {
        self.buf.len() >= self.size
            && self.samples_since_analysis >= hop_size(self.sample_rate, self.rate_hz)
    }

    /// The most recent full window, if a pass is due. Restarts the hop.
    pub fn take(&mut self) -> Option<&[f32]> {
        if !self.ready() {
            return None;
        }
        self.samples_since_analysis = 0;
        Some(&self.buf[self.buf.len() - self.size..])
    }

    /// Sample rate of the latest chunk.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

/// The session receives audio chunks, keeps the most recent analysis window,
/// and runs exactly one `analyze` pass per hop, publishing the resulting
/// `DetectionFrame` to every downstream consumer.
///
/// Passes run synchronously on the session's own thread, so two passes never
/// overlap and the config is never read while it is being changed.
pub struct Session {
    input_rx: Receiver<InputEvent>,
    frame_txs: Vec<Sender<DetectionFrame>>,
    config: TrainerConfig,
    target: Option<FretPosition>,
    window: AudioWindow,
}

impl Session {
    pub fn new(
        input_rx: Receiver<InputEvent>,
        frame_txs: Vec<Sender<DetectionFrame>>,
        config: TrainerConfig,
    ) -> Self {
        let window = AudioWindow::new(&config);
        Self {
            input_rx,
            frame_txs,
            config,
            target: None,
            window,
        }
    }

    /// Position the player is asked to play.
    pub fn with_target(mut self, target: Option<FretPosition>) -> Self {
        self.target = target;
        self
    }

    /// Push new audio samples into the window.
    pub fn push_audio(&mut self, chunk: &AudioChunk) {
        self.window.push(chunk);
    }

    pub fn ready(&self) -> bool {
        self.window.ready()
    }

    /// Run one pass over the most recent window if one is due.
    pub fn step(&mut self, timestamp_us: u64) -> Option<DetectionFrame> {
        let sample_rate = self.window.sample_rate() as f64;
        let samples = self.window.take()?;
        match analyze(
            samples,
            sample_rate,
            &self.config,
            self.target.as_ref(),
            timestamp_us,
        ) {
            Ok(frame) => Some(frame),
            Err(e) => {
                error!("Analysis pass failed: {}", e);
                None
            }
        }
    }

    pub fn run(&mut self) {
        info!(
            "Session running (engine: {}, window: {} samples, tolerance: ±{:.0}¢)",
            self.config.estimator.engine,
            self.config.buffer_size,
            self.config.tolerance_cents()
        );
        if let Some(t) = &self.target {
            info!("Target: {}", t);
        }

        let mut frame_count: u64 = 0;
        let mut match_count: u64 = 0;

        while let Ok(event) = self.input_rx.recv() {
            match event {
                InputEvent::Audio(chunk) => {
                    self.push_audio(&chunk);

                    let frame = match self.step(chunk.end_us()) {
                        Some(f) => f,
                        None => continue,
                    };
                    trace!("{}", render_line(&frame));
                    if frame.matched {
                        match_count += 1;
                    }
                    for tx in &self.frame_txs {
                        let _ = tx.send(frame.clone());
                    }

                    frame_count += 1;
                    if frame_count % 600 == 0 {
                        debug!("Session: {} passes, {} matched", frame_count, match_count);
                    }
                }
            }
        }

        info!(
            "Session shutting down after {} passes ({} matched)",
            frame_count, match_count
        );
    }
}
