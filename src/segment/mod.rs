//! Phrase segmentation over a raw PCM byte stream.
//!
//! Frames are pulled from a [`FrameSource`], classified as speech or
//! silence by RMS energy against an adaptive threshold, and grouped into
//! phrases delivered as [`PhraseBuffer`]s. The engine never interprets
//! what was said; transcription is a downstream collaborator.

mod energy;
mod listener;
mod phrase;
mod segmenter;
mod source;
#[cfg(test)]
mod tests;
mod threshold;

pub use energy::rms;
pub use listener::{listen_in_background, spawn_listener, ListenerHandle};
pub use phrase::PhraseBuffer;
pub use segmenter::{FrameCounts, ListenError, PhraseSegmenter};
pub use source::{
    ChannelFrameSource, FrameRead, FrameSource, TcpFrameSource, DEFAULT_POLL_INTERVAL,
};
pub use threshold::AdaptiveThreshold;
