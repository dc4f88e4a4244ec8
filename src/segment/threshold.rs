//! Adaptive energy threshold tracking.
//!
//! The threshold decays toward recent ambient energy scaled by a ratio,
//! with exponential damping normalized by frame duration so convergence
//! speed is independent of the chunk size.

/// Mutable threshold state for one listening session.
///
/// Owned exclusively by its segmenter; there is one writer per session and
/// no sharing, so no synchronization is involved.
#[derive(Debug, Clone)]
pub struct AdaptiveThreshold {
    threshold: f64,
    damping: f64,
    ratio: f64,
}

impl AdaptiveThreshold {
    pub fn new(initial: f64, damping: f64, ratio: f64) -> Self {
        Self {
            threshold: initial,
            damping,
            ratio,
        }
    }

    /// Current threshold in raw sample units.
    pub fn current(&self) -> f64 {
        self.threshold
    }

    /// Fold one frame's energy into the threshold and return the updated
    /// value.
    ///
    /// `seconds_per_buffer` scales the damping exponent, so a short frame
    /// moves the threshold proportionally less than a long one. Callers
    /// decide when to observe: the segmenter only feeds frames that did
    /// not trigger speech (and only with dynamic adjustment enabled),
    /// while ambient calibration feeds every frame.
    pub fn observe(&mut self, energy: f64, seconds_per_buffer: f64) -> f64 {
        let damping = self.damping.powf(seconds_per_buffer);
        let target = energy * self.ratio;
        self.threshold = self.threshold * damping + target * (1.0 - damping);
        self.threshold
    }
}
