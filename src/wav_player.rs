use crate::types::*;
use crossbeam_channel::Sender;
use hound::{SampleFormat, WavReader};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

/// Samples sent per AudioChunk. ~12ms at 44.1kHz.
const CHUNK_SIZE: usize = 512;

/// Decode a WAV file to mono f32 samples in [-1, 1].
/// Returns the samples and the file's sample rate.
pub fn read_mono(path: &Path) -> Result<(Vec<f32>, u32), hound::Error> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let samples_f32: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<_, _>>()?,
        SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()?
        }
    };

    let mono = if channels == 1 {
        samples_f32
    } else {
        samples_f32
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };
    Ok((mono, spec.sample_rate))
}

/// Reads a WAV file and streams it as AudioChunk events.
///
/// Typical use: `--wav my_playing.wav` to check detection on a recording
/// before trying it live.
pub struct WavPlayer {
    path: PathBuf,
    tx: Sender<InputEvent>,
    clock: SessionClock,
    /// Pace chunks to wall-clock time instead of sending as fast as possible.
    realtime: bool,
}

impl WavPlayer {
    pub fn new(path: PathBuf, tx: Sender<InputEvent>, clock: SessionClock) -> Self {
        Self {
            path,
            tx,
            clock,
            realtime: true,
        }
    }

    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn run(&self) {
        let (mono, sample_rate) = match read_mono(&self.path) {
            Ok(r) => r,
            Err(e) => {
                error!("Failed to read WAV file {:?}: {}", self.path, e);
                return;
            }
        };

        if sample_rate == 0 {
            error!("WAV file {:?} declares a 0 Hz sample rate", self.path);
            return;
        }

        let duration_secs = mono.len() as f64 / sample_rate as f64;
        info!(
            "WAV: {:?}  {} Hz  {:.2}s, {} samples",
            self.path.file_name().unwrap_or_default(),
            sample_rate,
            duration_secs,
            mono.len()
        );

        let chunk_dur = Duration::from_secs_f64(CHUNK_SIZE as f64 / sample_rate as f64);
        let start = Instant::now();

        for (i, chunk) in mono.chunks(CHUNK_SIZE).enumerate() {
            let timestamp_us = if self.realtime {
                // Pace to real time: wait until this chunk's expected send time
                let target = chunk_dur * i as u32;
                let elapsed = start.elapsed();
                if elapsed < target {
                    thread::sleep(target - elapsed);
                }
                self.clock.now_us()
            } else {
                (i * CHUNK_SIZE) as u64 * 1_000_000 / sample_rate as u64
            };

            let event = InputEvent::Audio(AudioChunk {
                timestamp_us,
                samples: chunk.to_vec(),
                sample_rate,
            });

            if self.tx.send(event).is_err() {
                // Session shut down
                break;
            }
        }

        info!("WAV playback complete.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use hound::{WavSpec, WavWriter};

    fn write_stereo_i16(path: &Path, n: usize) {
        let spec = WavSpec {
            channels: 2,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut w = WavWriter::create(path, spec).unwrap();
        for _ in 0..n {
            w.write_sample(i16::MAX / 2).unwrap();
            w.write_sample(0i16).unwrap();
        }
        w.finalize().unwrap();
    }

    #[test]
    fn test_read_mono_mixes_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_stereo_i16(&path, 100);
        let (mono, sr) = read_mono(&path).unwrap();
        assert_eq!(sr, 22050);
        assert_eq!(mono.len(), 100);
        // (0.5 + 0.0) / 2
        assert!((mono[0] - 0.25).abs() < 1e-3, "got {}", mono[0]);
    }

    #[test]
    fn test_read_missing_file() {
        assert!(read_mono(Path::new("/nonexistent/file.wav")).is_err());
    }

    #[test]
    fn test_player_streams_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_stereo_i16(&path, 1200);

        let (tx, rx) = unbounded();
        WavPlayer::new(path, tx, SessionClock::new())
            .with_realtime(false)
            .run();
        let sizes: Vec<usize> = rx
            .iter()
            .map(|InputEvent::Audio(c)| c.samples.len())
            .collect();
        assert_eq!(sizes, vec![512, 512, 176]);
    }
}
