//! Command-line parsing and listener configuration.

mod defaults;
mod validation;

use clap::Parser;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::PathBuf;

pub use defaults::{
    DEFAULT_CALIBRATION_SECS, DEFAULT_CHUNK_SIZE, DEFAULT_DAMPING, DEFAULT_ENERGY_RATIO,
    DEFAULT_ENERGY_THRESHOLD, DEFAULT_NON_SPEAKING_SECS, DEFAULT_PAUSE_THRESHOLD_SECS,
    DEFAULT_PHRASE_THRESHOLD_SECS, DEFAULT_SAMPLE_RATE, DEFAULT_SAMPLE_WIDTH, MAX_CHUNK_SIZE,
    MAX_SAMPLE_RATE,
};

/// CLI options for the earwire phrase server. Validated before any socket
/// is opened.
#[derive(Debug, Parser, Clone)]
#[command(about = "Earwire phrase extraction server", author, version)]
pub struct AppConfig {
    /// Address to accept PCM streams on
    #[arg(long, env = "EARWIRE_BIND", default_value = "127.0.0.1:7331")]
    pub bind: SocketAddr,

    /// Bytes per frame read from a stream
    #[arg(long = "chunk-size", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Stream sample rate (Hz)
    #[arg(long = "sample-rate", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Bytes per PCM sample (1, 2, 3 or 4)
    #[arg(long = "sample-width", default_value_t = DEFAULT_SAMPLE_WIDTH)]
    pub sample_width: u16,

    /// Initial speech energy threshold (raw sample units)
    #[arg(long = "energy-threshold", default_value_t = DEFAULT_ENERGY_THRESHOLD)]
    pub energy_threshold: f64,

    /// Keep the energy threshold fixed instead of tracking ambient noise
    #[arg(long = "no-dynamic-energy", default_value_t = false)]
    pub no_dynamic_energy: bool,

    /// Damping constant for threshold adaptation (between 0 and 1)
    #[arg(long = "energy-damping", default_value_t = DEFAULT_DAMPING)]
    pub energy_damping: f64,

    /// Ambient energy multiplier the threshold converges toward (>1)
    #[arg(long = "energy-ratio", default_value_t = DEFAULT_ENERGY_RATIO)]
    pub energy_ratio: f64,

    /// Seconds of silence that end a phrase
    #[arg(long = "pause-threshold", default_value_t = DEFAULT_PAUSE_THRESHOLD_SECS)]
    pub pause_threshold: f64,

    /// Minimum seconds of speech for a phrase to count
    #[arg(long = "phrase-threshold", default_value_t = DEFAULT_PHRASE_THRESHOLD_SECS)]
    pub phrase_threshold: f64,

    /// Seconds of silence margin retained around a phrase
    #[arg(long = "non-speaking-duration", default_value_t = DEFAULT_NON_SPEAKING_SECS)]
    pub non_speaking_duration: f64,

    /// Seconds to wait for speech before a listen attempt times out
    #[arg(long = "wait-timeout")]
    pub wait_timeout: Option<f64>,

    /// Hard cap on a single phrase's duration (seconds)
    #[arg(long = "phrase-time-limit")]
    pub phrase_time_limit: Option<f64>,

    /// Seconds of ambient audio sampled before segmentation starts
    #[arg(long = "calibration-secs", default_value_t = DEFAULT_CALIBRATION_SECS)]
    pub calibration_secs: f64,

    /// Write each phrase as a WAV file into this directory
    #[arg(long = "save-phrases", value_name = "DIR")]
    pub save_phrases: Option<PathBuf>,

    /// Enable JSONL trace logging (debug)
    #[arg(long = "logs", env = "EARWIRE_LOGS", default_value_t = false)]
    pub logs: bool,
}

/// Segmentation options for one listening session; immutable once the
/// session starts.
#[derive(Debug, Clone, Serialize)]
pub struct ListenerConfig {
    pub chunk_size: usize,
    pub sample_rate: u32,
    pub sample_width: u16,
    pub energy_threshold: f64,
    pub dynamic_energy: bool,
    pub damping: f64,
    pub energy_ratio: f64,
    pub pause_threshold: f64,
    pub phrase_threshold: f64,
    pub non_speaking_duration: f64,
    pub wait_timeout: Option<f64>,
    pub phrase_time_limit: Option<f64>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            sample_rate: DEFAULT_SAMPLE_RATE,
            sample_width: DEFAULT_SAMPLE_WIDTH,
            energy_threshold: DEFAULT_ENERGY_THRESHOLD,
            dynamic_energy: true,
            damping: DEFAULT_DAMPING,
            energy_ratio: DEFAULT_ENERGY_RATIO,
            pause_threshold: DEFAULT_PAUSE_THRESHOLD_SECS,
            phrase_threshold: DEFAULT_PHRASE_THRESHOLD_SECS,
            non_speaking_duration: DEFAULT_NON_SPEAKING_SECS,
            wait_timeout: None,
            phrase_time_limit: None,
        }
    }
}

impl ListenerConfig {
    /// Audio seconds represented by one full frame.
    pub fn seconds_per_buffer(&self) -> f64 {
        self.chunk_size as f64
            / (f64::from(self.sample_rate) * f64::from(self.sample_width))
    }
}
