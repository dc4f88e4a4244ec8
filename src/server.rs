//! TCP accept loop binding phrase extraction to stdout events.
//!
//! One listening session per connection: calibrate against ambient noise,
//! then run a background listener whose callback prints one JSON line per
//! phrase. Sessions are fully independent; a failing connection never
//! affects the others.

use crate::config::{AppConfig, ListenerConfig};
use crate::segment::{spawn_listener, PhraseBuffer, PhraseSegmenter, TcpFrameSource};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::Path;
use std::thread;

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ServerEvent {
    Listening {
        addr: SocketAddr,
        config: ListenerConfig,
    },
    Phrase {
        peer: SocketAddr,
        seq: usize,
        duration_secs: f64,
        bytes: usize,
        sample_rate: u32,
        sample_width: u16,
        #[serde(skip_serializing_if = "Option::is_none")]
        wav_path: Option<String>,
    },
    StreamClosed {
        peer: SocketAddr,
    },
}

fn emit(event: &ServerEvent) {
    if let Ok(line) = serde_json::to_string(event) {
        println!("{line}");
    }
}

/// Accept PCM streams forever, one listening session per connection.
pub fn run(config: &AppConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind)
        .with_context(|| format!("failed to bind {}", config.bind))?;
    let local = listener.local_addr().context("failed to read bound address")?;
    emit(&ServerEvent::Listening {
        addr: local,
        config: config.listener_config(),
    });
    tracing::info!(addr = %local, "accepting PCM streams");

    if let Some(dir) = &config.save_phrases {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create '{}'", dir.display()))?;
    }

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let config = config.clone();
                thread::spawn(move || {
                    if let Err(err) = serve_connection(stream, &config) {
                        tracing::warn!("connection ended with error: {err:#}");
                    }
                });
            }
            Err(err) => tracing::warn!(error = %err, "accept failed"),
        }
    }
    Ok(())
}

fn serve_connection(stream: TcpStream, config: &AppConfig) -> Result<()> {
    let peer = stream.peer_addr().context("failed to read peer address")?;
    tracing::info!(peer = %peer, "stream connected");

    let listener_config = config.listener_config();
    let chunk_size = listener_config.chunk_size;
    let source = TcpFrameSource::new(stream, chunk_size)
        .context("failed to configure stream timeouts")?;
    let mut segmenter = PhraseSegmenter::new(source, listener_config)?;

    if config.calibration_secs > 0.0 {
        let threshold = segmenter.calibrate_ambient(config.calibration_secs)?;
        tracing::info!(peer = %peer, threshold, "ambient calibration complete");
    }

    let save_dir = config.save_phrases.clone();
    let mut seq = 0usize;
    let handle = spawn_listener(segmenter, move |phrase: PhraseBuffer| {
        seq += 1;
        let wav_path = save_dir
            .as_ref()
            .and_then(|dir| write_phrase_wav(dir, peer, seq, &phrase));
        emit(&ServerEvent::Phrase {
            peer,
            seq,
            duration_secs: phrase.duration_secs(),
            bytes: phrase.data.len(),
            sample_rate: phrase.sample_rate,
            sample_width: phrase.sample_width,
            wav_path,
        });
    });

    // Sessions end when the peer closes its stream; the accept loop never
    // cancels them.
    handle.join();
    emit(&ServerEvent::StreamClosed { peer });
    tracing::info!(peer = %peer, "stream closed");
    Ok(())
}

fn write_phrase_wav(
    dir: &Path,
    peer: SocketAddr,
    seq: usize,
    phrase: &PhraseBuffer,
) -> Option<String> {
    let peer_tag = peer.to_string().replace(':', "-");
    let path = dir.join(format!("{peer_tag}-{seq:04}.wav"));
    let bytes = match phrase.wav_bytes() {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(error = %err, "failed to encode phrase wav");
            return None;
        }
    };
    match fs::write(&path, bytes) {
        Ok(()) => Some(path.display().to_string()),
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "failed to write phrase wav");
            None
        }
    }
}
