//! Phrase boundary detection state machine.
//!
//! `listen` waits for frame energy to cross the threshold, records until
//! a long enough pause (or a time limit, or stream end), and returns the
//! retained frames as one phrase. Bursts too short to be speech are
//! discarded internally without surfacing to the caller.

use super::energy::rms;
use super::phrase::PhraseBuffer;
use super::source::{FrameRead, FrameSource};
use super::threshold::AdaptiveThreshold;
use crate::config::ListenerConfig;
use std::collections::VecDeque;
use std::io;
use thiserror::Error;

/// Failures surfaced by listening and calibration.
#[derive(Debug, Error)]
pub enum ListenError {
    /// Rejected configuration; raised before any frame is read.
    #[error("invalid listener configuration: {reason}")]
    Config { reason: String },
    /// No speech crossed the threshold within the wait timeout. A direct
    /// caller may simply listen again; the background loop uses this as
    /// its cancellation poll.
    #[error("timed out waiting for a phrase to start")]
    Timeout,
    /// The stream closed with no phrase in progress.
    #[error("audio stream ended")]
    EndOfStream,
    /// Transport failure or protocol violation; terminal for the session.
    #[error("audio stream error: {0}")]
    Stream(#[from] io::Error),
}

/// Frame-count equivalents of the second-valued policies, derived once
/// per `listen` call.
///
/// Counts use ceiling division so the retained margins are never shorter
/// than configured, whatever the chunk size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounts {
    /// Consecutive silent frames that end a phrase.
    pub pause_buffers: usize,
    /// Minimum recorded frames for a phrase to count as speech.
    pub phrase_buffers: usize,
    /// Silent frames retained as margin before and after a phrase.
    pub non_speaking_buffers: usize,
}

impl FrameCounts {
    pub fn from_config(config: &ListenerConfig) -> Self {
        let seconds_per_buffer = config.seconds_per_buffer();
        Self {
            pause_buffers: ceil_buffers(config.pause_threshold, seconds_per_buffer),
            phrase_buffers: ceil_buffers(config.phrase_threshold, seconds_per_buffer),
            non_speaking_buffers: ceil_buffers(config.non_speaking_duration, seconds_per_buffer),
        }
    }
}

fn ceil_buffers(seconds: f64, seconds_per_buffer: f64) -> usize {
    (seconds / seconds_per_buffer).ceil() as usize
}

/// Consumes frames from a source one at a time and groups contiguous
/// speech into phrases.
///
/// All elapsed-time accounting is in audio seconds (one frame advances
/// `seconds_per_buffer`); idle reads advance by the wall interval the
/// source waited, so timeouts still fire on a stalled stream.
pub struct PhraseSegmenter<S> {
    source: S,
    config: ListenerConfig,
    threshold: AdaptiveThreshold,
}

impl<S: FrameSource> PhraseSegmenter<S> {
    /// Validate `config` and wrap `source`. Runs no I/O.
    pub fn new(source: S, config: ListenerConfig) -> Result<Self, ListenError> {
        config.validate().map_err(|err| ListenError::Config {
            reason: format!("{err:#}"),
        })?;
        let threshold = AdaptiveThreshold::new(
            config.energy_threshold,
            config.damping,
            config.energy_ratio,
        );
        Ok(Self {
            source,
            config,
            threshold,
        })
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Current energy threshold in raw sample units.
    pub fn energy_threshold(&self) -> f64 {
        self.threshold.current()
    }

    /// Seed the threshold from ambient noise before segmentation starts.
    ///
    /// Reads up to `duration_secs` of audio and folds every frame into
    /// the threshold, speech or not. Returns the final threshold. The
    /// stream closing before the duration elapses is an error — a source
    /// that cannot supply a calibration window cannot supply phrases
    /// either.
    pub fn calibrate_ambient(&mut self, duration_secs: f64) -> Result<f64, ListenError> {
        let seconds_per_buffer = self.config.seconds_per_buffer();
        let mut elapsed = 0.0f64;
        while elapsed + seconds_per_buffer <= duration_secs {
            match self.source.read_frame()? {
                FrameRead::Frame(frame) => {
                    elapsed += seconds_per_buffer;
                    let energy = rms(&frame, self.config.sample_width);
                    self.threshold.observe(energy, seconds_per_buffer);
                }
                FrameRead::Idle { .. } => continue,
                FrameRead::Closed => {
                    return Err(ListenError::Stream(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "stream ended {elapsed:.2}s into a {duration_secs:.2}s ambient calibration"
                        ),
                    )));
                }
            }
        }
        let threshold = self.threshold.current();
        tracing::debug!(threshold, "ambient calibration complete");
        Ok(threshold)
    }

    /// Record a single phrase using the configured timeouts.
    pub fn listen(&mut self) -> Result<PhraseBuffer, ListenError> {
        self.listen_with(self.config.wait_timeout, self.config.phrase_time_limit)
    }

    /// Record a single phrase, overriding the configured timeouts.
    ///
    /// Blocks until speech is found and a phrase completes; with both
    /// timeouts set the call finishes within roughly their sum. With
    /// neither set and a stream that stays open and silent, it blocks
    /// indefinitely — absence of speech is not an error.
    pub fn listen_with(
        &mut self,
        wait_timeout: Option<f64>,
        phrase_time_limit: Option<f64>,
    ) -> Result<PhraseBuffer, ListenError> {
        let seconds_per_buffer = self.config.seconds_per_buffer();
        let counts = FrameCounts::from_config(&self.config);
        let width = self.config.sample_width;

        let mut elapsed = 0.0f64;
        let mut ring: VecDeque<Vec<u8>> = VecDeque::new();
        let mut discarded_bursts = 0usize;

        loop {
            // Waiting for speech: keep only the most recent silence
            // margin, learning the ambient level from frames that do not
            // trigger.
            loop {
                if let Some(timeout) = wait_timeout {
                    if elapsed + seconds_per_buffer > timeout {
                        return Err(ListenError::Timeout);
                    }
                }
                match self.source.read_frame()? {
                    FrameRead::Idle { waited } => {
                        elapsed += waited.as_secs_f64();
                    }
                    FrameRead::Closed => return Err(ListenError::EndOfStream),
                    FrameRead::Frame(frame) => {
                        elapsed += seconds_per_buffer;
                        let energy = rms(&frame, width);
                        if energy > self.threshold.current() {
                            // First speech frame; retained ahead of the
                            // recording loop.
                            ring.push_back(frame);
                            break;
                        }
                        ring.push_back(frame);
                        while ring.len() > counts.non_speaking_buffers {
                            ring.pop_front();
                        }
                        if self.config.dynamic_energy {
                            self.threshold.observe(energy, seconds_per_buffer);
                        }
                    }
                }
            }

            // Recording: retain every frame until the pause outlasts the
            // policy, the time limit hits, or the stream ends. The
            // threshold is not adjusted while a phrase is in progress.
            let speech_threshold = self.threshold.current();
            let phrase_start = elapsed;
            let mut pause_count = 0usize;
            // The triggering frame is already retained and counts as the
            // first recorded frame, so a burst of exactly the phrase
            // threshold is accepted.
            let mut phrase_count = 1usize;
            let mut stream_ended = false;
            loop {
                if let Some(limit) = phrase_time_limit {
                    if elapsed + seconds_per_buffer - phrase_start > limit {
                        break;
                    }
                }
                match self.source.read_frame()? {
                    FrameRead::Idle { waited } => {
                        elapsed += waited.as_secs_f64();
                    }
                    FrameRead::Closed => {
                        stream_ended = true;
                        break;
                    }
                    FrameRead::Frame(frame) => {
                        elapsed += seconds_per_buffer;
                        let energy = rms(&frame, width);
                        ring.push_back(frame);
                        phrase_count += 1;
                        if energy > speech_threshold {
                            pause_count = 0;
                        } else {
                            pause_count += 1;
                        }
                        if pause_count > counts.pause_buffers {
                            break;
                        }
                    }
                }
            }

            // The trailing pause is not speech; judge length without it.
            let effective_count = phrase_count.saturating_sub(pause_count);
            if effective_count >= counts.phrase_buffers || stream_ended {
                for _ in 0..pause_count.saturating_sub(counts.non_speaking_buffers) {
                    ring.pop_back();
                }
                if ring.is_empty() {
                    return Err(ListenError::EndOfStream);
                }
                tracing::debug!(
                    "phrase_metrics|frames={}|speech_frames={}|discarded_bursts={}|stream_ended={}",
                    ring.len(),
                    effective_count,
                    discarded_bursts,
                    stream_ended
                );
                return Ok(PhraseBuffer::from_frames(
                    ring,
                    self.config.sample_rate,
                    width,
                ));
            }

            // Too short to be speech (a click or a pop): keep the trailing
            // margin as context and wait again within this same call.
            discarded_bursts += 1;
            while ring.len() > counts.non_speaking_buffers {
                ring.pop_front();
            }
        }
    }
}
