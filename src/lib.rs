pub mod autocorrelation;
pub mod calibration;
pub mod calibrator;
pub mod config;
pub mod console_display;
pub mod dsp;
pub mod error;
pub mod fretboard;
pub mod matcher;
pub mod notes;
pub mod pitch;
pub mod session;
pub mod simulator;
pub mod types;
pub mod wav_player;
pub mod yin;
