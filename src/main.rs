use fret_trainer::calibration::{CalibrationOffsets, CalibrationSession};
use fret_trainer::calibrator::Calibrator;
use fret_trainer::config::TrainerConfig;
use fret_trainer::console_display::ConsoleDisplay;
use fret_trainer::fretboard::{position, random_challenge_with, ChallengeFilter};
use fret_trainer::matcher::Difficulty;
use fret_trainer::pitch::Engine;
use fret_trainer::session::Session;
use fret_trainer::simulator::{demo_sequence, Simulator};
use fret_trainer::types::*;
use fret_trainer::wav_player::WavPlayer;

use clap::Parser;
use crossbeam_channel::{bounded, Receiver};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;

#[derive(Parser)]
#[command(name = "fret-trainer")]
#[command(about = "Guitar fretboard trainer: pitch detection and note matching")]
struct Cli {
    /// Analyze a WAV recording instead of the built-in simulator
    #[arg(long)]
    wav: Option<PathBuf>,

    /// Simulator demo sequence: "open" (default), "scale", or "flat"
    #[arg(long, default_value = "open")]
    demo: String,

    /// Simulator sample rate (Hz)
    #[arg(long, default_value_t = 44100, value_parser = clap::value_parser!(u32).range(1..))]
    sample_rate: u32,

    /// Pace input to wall-clock time
    #[arg(long)]
    realtime: bool,

    /// JSON config file (estimator, tolerance, calibration)
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON calibration offsets; loaded if present, written after --calibrate
    #[arg(long)]
    calibration: Option<PathBuf>,

    /// Pitch estimation engine
    #[arg(long, value_enum)]
    engine: Option<Engine>,

    /// YIN absolute threshold
    #[arg(long)]
    threshold: Option<f64>,

    /// Lowest accepted fundamental (Hz)
    #[arg(long)]
    min_hz: Option<f64>,

    /// Highest accepted fundamental (Hz)
    #[arg(long)]
    max_hz: Option<f64>,

    /// Silence gate (buffer RMS)
    #[arg(long)]
    silence_rms: Option<f64>,

    /// Minimum confidence for a detection to count
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Match strictness preset
    #[arg(long, value_enum)]
    difficulty: Option<Difficulty>,

    /// Explicit match tolerance in cents (overrides --difficulty)
    #[arg(long)]
    tolerance_cents: Option<f64>,

    /// Analysis window in samples
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Target string (1 = high E, 6 = low E)
    #[arg(long, requires = "target_fret")]
    target_string: Option<u8>,

    /// Target fret (0–12)
    #[arg(long, requires = "target_string")]
    target_fret: Option<u8>,

    /// Pick a random target position
    #[arg(long, conflicts_with = "target_string")]
    challenge: bool,

    /// Restrict random challenges to frets up to this one
    #[arg(long, default_value_t = 12)]
    max_fret: u8,

    /// Calibrate the given open string instead of training
    #[arg(long)]
    calibrate: Option<u8>,

    /// Console refresh rate (Hz)
    #[arg(long, default_value_t = 10)]
    display_hz: u32,
}

impl Cli {
    /// File config (or defaults) with command-line overrides applied.
    fn build_config(&self) -> Result<TrainerConfig, String> {
        let mut config = match &self.config {
            Some(path) => TrainerConfig::load(path)
                .map_err(|e| format!("cannot load config {:?}: {}", path, e))?,
            None => TrainerConfig::default(),
        };
        if let Some(path) = &self.calibration {
            match CalibrationOffsets::load(path) {
                Some(cal) => config.calibration = cal,
                None => info!("No calibration at {:?}; using zero offsets", path),
            }
        }

        let est = &mut config.estimator;
        if let Some(engine) = self.engine {
            est.engine = engine;
        }
        if let Some(t) = self.threshold {
            est.threshold = t;
        }
        if let Some(lo) = self.min_hz {
            est.frequency_range[0] = lo;
        }
        if let Some(hi) = self.max_hz {
            est.frequency_range[1] = hi;
        }
        if let Some(rms) = self.silence_rms {
            est.silence_rms = rms;
        }
        if let Some(c) = self.min_confidence {
            config.min_confidence = c;
        }
        if let Some(d) = self.difficulty {
            config.difficulty = d;
        }
        if self.tolerance_cents.is_some() {
            config.tolerance_cents = self.tolerance_cents;
        }
        if let Some(n) = self.buffer_size {
            config.buffer_size = n;
        }
        config.validate().map_err(|e| e.to_string())?;
        Ok(config)
    }

    fn target(&self) -> Result<Option<FretPosition>, String> {
        if let (Some(s), Some(f)) = (self.target_string, self.target_fret) {
            return position(s, f)
                .copied()
                .map(Some)
                .ok_or_else(|| format!("no position at string {} fret {}", s, f));
        }
        if self.challenge {
            let filter = ChallengeFilter {
                strings: Vec::new(),
                max_fret: self.max_fret,
            };
            return random_challenge_with(&mut rand::thread_rng(), &filter)
                .copied()
                .map(Some)
                .ok_or_else(|| "challenge filter excludes every position".to_string());
        }
        Ok(None)
    }

    /// Start the buffer source on its own thread.
    fn spawn_source(&self, clock: SessionClock) -> Result<(Receiver<InputEvent>, thread::JoinHandle<()>), String> {
        let (input_tx, input_rx) = bounded::<InputEvent>(1024);
        let realtime = self.realtime;

        let handle = match &self.wav {
            Some(path) => {
                let path = path.clone();
                thread::Builder::new().name("wav-player".into()).spawn(move || {
                    WavPlayer::new(path, input_tx, clock).with_realtime(realtime).run();
                })
            }
            None => {
                let sequence = demo_sequence(&self.demo)
                    .ok_or_else(|| format!("unknown demo sequence '{}'", self.demo))?;
                let sample_rate = self.sample_rate;
                thread::Builder::new().name("simulator".into()).spawn(move || {
                    Simulator::new(clock, input_tx, sample_rate)
                        .with_realtime(realtime)
                        .run(&sequence);
                })
            }
        }
        .map_err(|e| format!("cannot spawn input thread: {}", e))?;

        Ok((input_rx, handle))
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let config = cli.build_config()?;
    let clock = SessionClock::new();

    info!("═══════════════════════════════════════════════");
    info!("  FRET TRAINER v{}", env!("CARGO_PKG_VERSION"));
    info!("  Engine: {}", config.estimator.engine);
    info!(
        "  Input: {}",
        match &cli.wav {
            Some(p) => format!("WAV {:?}", p),
            None => format!("simulator ({})", cli.demo),
        }
    );
    info!("═══════════════════════════════════════════════");

    if let Some(string) = cli.calibrate {
        return calibrate(cli, config, string, clock);
    }

    let target = cli.target()?;
    let (input_rx, source) = cli.spawn_source(clock)?;

    let (frame_tx, frame_rx) = bounded::<DetectionFrame>(256);
    let display_hz = cli.display_hz;
    let pass_hz = config.analysis_rate_hz;
    let display = thread::Builder::new()
        .name("display".into())
        .spawn(move || ConsoleDisplay::new(frame_rx, display_hz, pass_hz).run())
        .map_err(|e| format!("cannot spawn display thread: {}", e))?;

    let session = thread::Builder::new()
        .name("session".into())
        .spawn(move || {
            Session::new(input_rx, vec![frame_tx], config)
                .with_target(target)
                .run();
        })
        .map_err(|e| format!("cannot spawn session thread: {}", e))?;

    for h in [source, session, display] {
        let _ = h.join();
    }
    Ok(())
}

fn calibrate(cli: &Cli, config: TrainerConfig, string: u8, clock: SessionClock) -> Result<(), String> {
    let session = CalibrationSession::new(string).map_err(|e| e.to_string())?;
    let mut offsets = config.calibration.clone();
    let (input_rx, source) = cli.spawn_source(clock)?;

    let result = Calibrator::new(input_rx, config).run(session);
    // Receiver is gone; the source stops on its next send
    let _ = source.join();

    let offset = result.map_err(|e| format!("calibration of string {} failed: {}", string, e))?;
    info!("String {}: {:+.1} cents", string, offset);
    offsets.set(string, offset);

    match &cli.calibration {
        Some(path) => offsets.save(path).map_err(|e| e.to_string())?,
        None => warn!("No --calibration path given; offset not saved"),
    }
    Ok(())
}
