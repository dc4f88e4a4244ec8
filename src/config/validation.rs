use super::{AppConfig, ListenerConfig, MAX_CHUNK_SIZE, MAX_SAMPLE_RATE};
use anyhow::{bail, Context, Result};
use clap::Parser;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values before any socket is opened.
    pub fn validate(&self) -> Result<()> {
        if !self.calibration_secs.is_finite() || self.calibration_secs < 0.0 {
            bail!(
                "--calibration-secs must be a non-negative number, got {}",
                self.calibration_secs
            );
        }
        if let Some(dir) = &self.save_phrases {
            if dir.exists() && !dir.is_dir() {
                bail!("--save-phrases '{}' exists and is not a directory", dir.display());
            }
        }
        self.listener_config()
            .validate()
            .context("invalid segmentation options")?;
        Ok(())
    }

    /// Snapshot the CLI-controlled segmentation settings for a session.
    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            chunk_size: self.chunk_size,
            sample_rate: self.sample_rate,
            sample_width: self.sample_width,
            energy_threshold: self.energy_threshold,
            dynamic_energy: !self.no_dynamic_energy,
            damping: self.energy_damping,
            energy_ratio: self.energy_ratio,
            pause_threshold: self.pause_threshold,
            phrase_threshold: self.phrase_threshold,
            non_speaking_duration: self.non_speaking_duration,
            wait_timeout: self.wait_timeout,
            phrase_time_limit: self.phrase_time_limit,
        }
    }
}

impl ListenerConfig {
    /// Reject invariant violations before any I/O happens.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            bail!(
                "chunk_size must be between 1 and {MAX_CHUNK_SIZE} bytes, got {}",
                self.chunk_size
            );
        }
        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            bail!(
                "sample_rate must be between 1 and {MAX_SAMPLE_RATE} Hz, got {}",
                self.sample_rate
            );
        }
        if !(1..=4).contains(&self.sample_width) {
            bail!(
                "sample_width must be 1, 2, 3 or 4 bytes, got {}",
                self.sample_width
            );
        }
        if self.chunk_size % usize::from(self.sample_width) != 0 {
            bail!(
                "chunk_size {} is not a whole number of {}-byte samples",
                self.chunk_size,
                self.sample_width
            );
        }
        if !self.energy_threshold.is_finite() || self.energy_threshold < 0.0 {
            bail!(
                "energy_threshold must be a non-negative number, got {}",
                self.energy_threshold
            );
        }
        if !self.damping.is_finite() || self.damping <= 0.0 || self.damping >= 1.0 {
            bail!(
                "damping must be between 0 and 1, exclusive, got {}",
                self.damping
            );
        }
        if !self.energy_ratio.is_finite() || self.energy_ratio <= 1.0 {
            bail!("energy_ratio must be greater than 1, got {}", self.energy_ratio);
        }
        for (name, value) in [
            ("pause_threshold", self.pause_threshold),
            ("phrase_threshold", self.phrase_threshold),
            ("non_speaking_duration", self.non_speaking_duration),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{name} must be a non-negative number of seconds, got {value}");
            }
        }
        if self.pause_threshold < self.non_speaking_duration {
            bail!(
                "pause_threshold ({}) must be at least non_speaking_duration ({})",
                self.pause_threshold,
                self.non_speaking_duration
            );
        }
        for (name, value) in [
            ("wait_timeout", self.wait_timeout),
            ("phrase_time_limit", self.phrase_time_limit),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value <= 0.0 {
                    bail!("{name} must be a positive number of seconds, got {value}");
                }
            }
        }
        Ok(())
    }
}
