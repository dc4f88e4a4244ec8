//! Default tuning constants for phrase segmentation.

/// Bytes per frame read from a stream.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Stream sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 16_000;

/// Bytes per PCM sample (16-bit audio).
pub const DEFAULT_SAMPLE_WIDTH: u16 = 2;

/// Initial speech energy threshold in raw sample units.
pub const DEFAULT_ENERGY_THRESHOLD: f64 = 300.0;

/// Damping constant for dynamic threshold adaptation.
pub const DEFAULT_DAMPING: f64 = 0.15;

/// Ambient energy multiplier the threshold converges toward.
pub const DEFAULT_ENERGY_RATIO: f64 = 1.5;

/// Seconds of silence that end a phrase.
pub const DEFAULT_PAUSE_THRESHOLD_SECS: f64 = 0.8;

/// Minimum seconds of speech for a phrase to count.
pub const DEFAULT_PHRASE_THRESHOLD_SECS: f64 = 0.3;

/// Seconds of silence margin retained around a phrase.
pub const DEFAULT_NON_SPEAKING_SECS: f64 = 0.5;

/// Seconds of ambient audio sampled before segmentation starts.
pub const DEFAULT_CALIBRATION_SECS: f64 = 1.0;

/// Upper bounds keeping misconfigured sessions from allocating wildly.
pub const MAX_CHUNK_SIZE: usize = 1 << 20;
pub const MAX_SAMPLE_RATE: u32 = 192_000;
