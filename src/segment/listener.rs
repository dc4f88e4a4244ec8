//! Background phrase listening with cooperative cancellation.
//!
//! Runs the segmenter repeatedly on a worker thread and hands each
//! completed phrase to a callback. The worker polls its stop flag between
//! phrases, using a roughly one-second wait timeout as the poll interval.

use super::phrase::PhraseBuffer;
use super::segmenter::{ListenError, PhraseSegmenter};
use super::source::FrameSource;
use crate::config::ListenerConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Wait timeout for each inner `listen` call; bounds how long a stop
/// request can go unnoticed between phrases.
const POLL_WAIT_TIMEOUT_SECS: f64 = 1.0;

/// A running background listening session.
///
/// Owns the cancellation flag and the worker's join handle. Dropping the
/// handle leaves the worker running until its stream closes; call
/// [`ListenerHandle::stop`] for a deliberate shutdown.
pub struct ListenerHandle {
    stop_flag: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Request cancellation. With `wait_for_completion`, blocks until the
    /// worker has exited; after that no further reads or callback
    /// deliveries can occur.
    pub fn stop(mut self, wait_for_completion: bool) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if wait_for_completion {
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
        }
    }

    /// Wait for the session to end on its own (stream closed) without
    /// requesting cancellation.
    pub fn join(mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    /// Whether the worker has exited.
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

/// Validate `config`, wrap `source` in a segmenter, and listen on a
/// dedicated worker thread, delivering each phrase to `callback`.
pub fn listen_in_background<S, F>(
    source: S,
    config: ListenerConfig,
    callback: F,
) -> Result<ListenerHandle, ListenError>
where
    S: FrameSource + Send + 'static,
    F: FnMut(PhraseBuffer) + Send + 'static,
{
    let segmenter = PhraseSegmenter::new(source, config)?;
    Ok(spawn_listener(segmenter, callback))
}

/// Run an existing (typically calibrated) segmenter on a worker thread.
///
/// Phrases reach the callback synchronously, in detection order, exactly
/// once each; the next `listen` does not start until the callback
/// returns, so a slow callback delays segmentation rather than piling up
/// deliveries. Wait timeouts are absorbed as the cancellation poll; the
/// stream closing or a transport error ends the session.
pub fn spawn_listener<S, F>(mut segmenter: PhraseSegmenter<S>, mut callback: F) -> ListenerHandle
where
    S: FrameSource + Send + 'static,
    F: FnMut(PhraseBuffer) + Send + 'static,
{
    let stop_flag = Arc::new(AtomicBool::new(false));
    let flag = stop_flag.clone();
    let worker = thread::spawn(move || {
        let phrase_time_limit = segmenter.config().phrase_time_limit;
        // A frame longer than the poll timeout would otherwise time out
        // before a single read.
        let wait_timeout =
            POLL_WAIT_TIMEOUT_SECS.max(segmenter.config().seconds_per_buffer() * 2.0);
        while !flag.load(Ordering::Relaxed) {
            match segmenter.listen_with(Some(wait_timeout), phrase_time_limit) {
                Ok(phrase) => {
                    // A stop requested mid-phrase wins over delivery.
                    if !flag.load(Ordering::Relaxed) {
                        callback(phrase);
                    }
                }
                Err(ListenError::Timeout) => continue,
                Err(ListenError::EndOfStream) => break,
                Err(err) => {
                    tracing::warn!(error = %err, "background listener stopping");
                    break;
                }
            }
        }
    });
    ListenerHandle {
        stop_flag,
        worker: Some(worker),
    }
}
