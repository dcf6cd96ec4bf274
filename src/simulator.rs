use crate::fretboard::{position, STANDARD_TUNING};
use crate::types::*;
use crossbeam_channel::Sender;
use log::{error, info};
use std::f64::consts::PI;
use std::thread;
use std::time::{Duration, Instant};

/// Samples per AudioChunk. ~12ms at 44.1kHz.
const CHUNK_SIZE: usize = 512;

/// Relative strength of the first partials of a plucked string.
const PARTIALS: [(f64, f64); 5] = [(1.0, 1.0), (2.0, 0.45), (3.0, 0.25), (4.0, 0.12), (5.0, 0.06)];

/// Per-second exponential decay of a plucked note.
const DECAY_PER_SEC: f64 = 1.0;

/// One step of a simulated performance: a plucked note or a rest.
#[derive(Debug, Clone, PartialEq)]
pub struct SimNote {
    /// None = silence
    pub frequency_hz: Option<f64>,
    pub duration_ms: u32,
}

impl SimNote {
    /// Pluck `string` at `fret`, detuned by `detune_cents`.
    /// Positions off the fretboard become rests.
    pub fn pluck(string: u8, fret: u8, detune_cents: f64, duration_ms: u32) -> Self {
        Self {
            frequency_hz: position(string, fret)
                .map(|p| p.frequency_hz * 2.0_f64.powf(detune_cents / 1200.0)),
            duration_ms,
        }
    }

    pub fn rest(duration_ms: u32) -> Self {
        Self {
            frequency_hz: None,
            duration_ms,
        }
    }
}

/// Named demo sequences for the CLI.
///
/// - `open`: the six open strings, low to high
/// - `scale`: C major scale across the first five frets
/// - `flat`: every open string 30 cents flat, for trying out calibration
pub fn demo_sequence(name: &str) -> Option<Vec<SimNote>> {
    let seq = match name {
        "open" => STANDARD_TUNING
            .iter()
            .rev()
            .flat_map(|e| [SimNote::pluck(e.string_index, 0, 0.0, 1200), SimNote::rest(300)])
            .collect(),
        "scale" => [(5, 3), (4, 0), (4, 2), (4, 3), (3, 0), (3, 2), (2, 0), (2, 1)]
            .iter()
            .flat_map(|&(s, f)| [SimNote::pluck(s, f, 0.0, 700), SimNote::rest(150)])
            .collect(),
        "flat" => STANDARD_TUNING
            .iter()
            .rev()
            .flat_map(|e| [SimNote::pluck(e.string_index, 0, -30.0, 2500), SimNote::rest(500)])
            .collect(),
        _ => return None,
    };
    Some(seq)
}

/// Synthesize `n` samples of a plucked string, starting `age` samples after
/// the pluck. Amplitude decays exponentially from `amp`.
pub fn pluck_samples(freq_hz: f64, amp: f64, sample_rate: u32, age: u64, n: usize) -> Vec<f32> {
    let sr = sample_rate as f64;
    let norm: f64 = PARTIALS.iter().map(|(_, a)| a).sum();
    (0..n)
        .map(|i| {
            let t = (age + i as u64) as f64 / sr;
            let env = amp * (-DECAY_PER_SEC * t).exp() / norm;
            let s: f64 = PARTIALS
                .iter()
                .filter(|(h, _)| freq_hz * h < sr / 2.0)
                .map(|&(h, a)| a * (2.0 * PI * freq_hz * h * t).sin())
                .sum();
            (env * s) as f32
        })
        .collect()
}

/// Streams synthetic guitar audio as `InputEvent::Audio` chunks so the whole
/// pipeline can run without a microphone.
pub struct Simulator {
    clock: SessionClock,
    tx: Sender<InputEvent>,
    sample_rate: u32,
    amplitude: f64,
    /// Pace chunks to wall-clock time. Off for tests and batch runs.
    realtime: bool,
    /// Monotonic sample counter; timestamps derive from it when not realtime.
    sample_counter: u64,
}

impl Simulator {
    pub fn new(clock: SessionClock, tx: Sender<InputEvent>, sample_rate: u32) -> Self {
        Self {
            clock,
            tx,
            sample_rate,
            amplitude: 0.6,
            realtime: true,
            sample_counter: 0,
        }
    }

    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Play the sequence once. Returns early if the receiver hangs up.
    pub fn run(&mut self, sequence: &[SimNote]) {
        if self.sample_rate == 0 {
            error!("Simulator: sample rate must be positive; nothing to play");
            return;
        }
        info!(
            "Simulator: {} steps at {} Hz{}",
            sequence.len(),
            self.sample_rate,
            if self.realtime { " (real-time)" } else { "" }
        );
        let start = Instant::now();
        let chunk_dur = Duration::from_secs_f64(CHUNK_SIZE as f64 / self.sample_rate as f64);
        let mut chunks_sent: u32 = 0;

        for note in sequence {
            let total = (self.sample_rate as u64 * note.duration_ms as u64 / 1000) as usize;
            let mut age: u64 = 0;
            while (age as usize) < total {
                let n = CHUNK_SIZE.min(total - age as usize);
                let samples = match note.frequency_hz {
                    Some(hz) => pluck_samples(hz, self.amplitude, self.sample_rate, age, n),
                    None => vec![0.0; n],
                };

                if self.realtime {
                    let target = chunk_dur * chunks_sent;
                    let elapsed = start.elapsed();
                    if elapsed < target {
                        thread::sleep(target - elapsed);
                    }
                }
                let timestamp_us = if self.realtime {
                    self.clock.now_us()
                } else {
                    self.sample_counter * 1_000_000 / self.sample_rate as u64
                };

                let event = InputEvent::Audio(AudioChunk {
                    timestamp_us,
                    samples,
                    sample_rate: self.sample_rate,
                });
                if self.tx.send(event).is_err() {
                    return;
                }
                age += n as u64;
                self.sample_counter += n as u64;
                chunks_sent += 1;
            }
        }
        info!("Simulator: sequence complete.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::{estimate, EstimatorConfig};
    use crossbeam_channel::unbounded;

    #[test]
    fn test_demo_sequences() {
        for name in ["open", "scale", "flat"] {
            let seq = demo_sequence(name).unwrap();
            assert!(!seq.is_empty());
        }
        assert!(demo_sequence("nope").is_none());
        let open = demo_sequence("open").unwrap();
        // Low E first
        assert!((open[0].frequency_hz.unwrap() - 82.41).abs() < 1e-9);
    }

    #[test]
    fn test_pluck_detected_at_expected_pitch() {
        let samples = pluck_samples(146.83, 0.6, 44100, 4410, 2048);
        let est = estimate(&samples, 44100.0, &EstimatorConfig::default()).unwrap();
        let hz = est.frequency_hz.expect("pluck should be pitched");
        assert!((hz - 146.83).abs() < 1.5, "got {:.2}", hz);
    }

    #[test]
    fn test_pluck_decays() {
        let early = pluck_samples(110.0, 0.6, 44100, 0, 4410);
        let late = pluck_samples(110.0, 0.6, 44100, 44100, 4410);
        let peak = |v: &[f32]| v.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak(&late) < peak(&early) * 0.5);
    }

    #[test]
    fn test_quiet_pluck_below_gate() {
        let (tx, rx) = unbounded();
        Simulator::new(SessionClock::new(), tx, 44100)
            .with_realtime(false)
            .with_amplitude(0.005)
            .run(&[SimNote::pluck(5, 0, 0.0, 100)]);
        let samples: Vec<f32> = rx
            .iter()
            .flat_map(|InputEvent::Audio(c)| c.samples)
            .collect();
        let est = estimate(&samples[..2048], 44100.0, &EstimatorConfig::default()).unwrap();
        assert!(!est.is_detected());
    }

    #[test]
    fn test_zero_sample_rate_sends_nothing() {
        let (tx, rx) = unbounded();
        Simulator::new(SessionClock::new(), tx, 0)
            .with_realtime(false)
            .run(&demo_sequence("open").unwrap());
        assert_eq!(rx.iter().count(), 0);
    }

    #[test]
    fn test_run_streams_all_samples() {
        let (tx, rx) = unbounded();
        let mut sim = Simulator::new(SessionClock::new(), tx, 44100).with_realtime(false);
        sim.run(&[SimNote::pluck(6, 0, 0.0, 100), SimNote::rest(50)]);
        drop(sim);

        let chunks: Vec<AudioChunk> = rx
            .iter()
            .map(|InputEvent::Audio(c)| c)
            .collect();
        let total: usize = chunks.iter().map(|c| c.samples.len()).sum();
        assert_eq!(total, 4410 + 2205);
        assert!(chunks.iter().all(|c| c.samples.len() <= CHUNK_SIZE));
        assert!(chunks.windows(2).all(|w| w[1].timestamp_us > w[0].timestamp_us));
        // Trailing rest is silent
        assert!(chunks.last().unwrap().samples.iter().all(|&s| s == 0.0));
    }
}
