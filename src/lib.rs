//! Phrase extraction from streamed raw PCM audio.
//!
//! Energy-based voice activity detection with an adaptive threshold turns
//! a continuous byte stream into discrete speech phrases, delivered to a
//! callback without any knowledge of what was said. Transcription and
//! transport are external collaborators: this crate only reads fixed-size
//! frames, classifies them, and emits phrase buffers.

pub mod config;
pub mod segment;
pub mod server;
pub mod telemetry;

pub use config::ListenerConfig;
pub use segment::{
    listen_in_background, spawn_listener, ChannelFrameSource, FrameRead, FrameSource,
    ListenError, ListenerHandle, PhraseBuffer, PhraseSegmenter, TcpFrameSource,
};
