//! Frame acquisition from byte-stream endpoints.
//!
//! A frame source yields fixed-size raw PCM chunks and signals
//! end-of-stream where a socket would return a zero-length read. Sources
//! poll with a timeout and report idle reads, so a listener stays
//! cancellable even when the stream goes quiet.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::io::{self, Read};
use std::net::TcpStream;
use std::time::Duration;

/// Default poll timeout before a source reports an idle read.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Outcome of a single frame read.
#[derive(Debug)]
pub enum FrameRead {
    /// A complete frame of exactly `chunk_size` bytes.
    Frame(Vec<u8>),
    /// No data arrived within the poll timeout; the stream is still open.
    Idle { waited: Duration },
    /// The remote side closed the stream.
    Closed,
}

/// Pulls fixed-size raw PCM chunks from a byte-stream endpoint.
///
/// A closed stream is terminal for the current listening attempt; sources
/// never retry on their own.
pub trait FrameSource {
    /// Read the next frame, blocking for at most the source's poll
    /// timeout.
    fn read_frame(&mut self) -> io::Result<FrameRead>;
}

/// Frame source over a TCP byte stream.
///
/// TCP delivers bytes without framing, so partial reads are accumulated
/// internally and only complete frames are yielded. EOF with a partial
/// frame pending is treated as stream termination, since no further bytes
/// can ever complete it.
pub struct TcpFrameSource {
    stream: TcpStream,
    buf: Vec<u8>,
    filled: usize,
    poll_interval: Duration,
}

impl TcpFrameSource {
    pub fn new(stream: TcpStream, chunk_size: usize) -> io::Result<Self> {
        Self::with_poll_interval(stream, chunk_size, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(
        stream: TcpStream,
        chunk_size: usize,
        poll_interval: Duration,
    ) -> io::Result<Self> {
        stream.set_read_timeout(Some(poll_interval))?;
        Ok(Self {
            stream,
            buf: vec![0; chunk_size],
            filled: 0,
            poll_interval,
        })
    }
}

impl FrameSource for TcpFrameSource {
    fn read_frame(&mut self) -> io::Result<FrameRead> {
        loop {
            match self.stream.read(&mut self.buf[self.filled..]) {
                Ok(0) => {
                    if self.filled > 0 {
                        tracing::warn!(
                            bytes = self.filled,
                            chunk_size = self.buf.len(),
                            "discarding partial frame at end of stream"
                        );
                        self.filled = 0;
                    }
                    return Ok(FrameRead::Closed);
                }
                Ok(n) => {
                    self.filled += n;
                    if self.filled == self.buf.len() {
                        self.filled = 0;
                        return Ok(FrameRead::Frame(self.buf.clone()));
                    }
                }
                Err(err)
                    if matches!(
                        err.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Ok(FrameRead::Idle {
                        waited: self.poll_interval,
                    });
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

/// In-process frame source backed by a bounded channel.
///
/// The producing side sends whole frames; an empty frame signals
/// end-of-stream, mirroring the zero-length read on a socket. Dropping
/// the sender closes the stream as well. A frame of any other length is
/// a protocol violation and fails the read.
pub struct ChannelFrameSource {
    receiver: Receiver<Vec<u8>>,
    chunk_size: usize,
    poll_interval: Duration,
}

impl ChannelFrameSource {
    /// Create a source and its producing handle with room for `capacity`
    /// in-flight frames.
    pub fn bounded(chunk_size: usize, capacity: usize) -> (Sender<Vec<u8>>, Self) {
        let (sender, receiver) = bounded(capacity.max(1));
        (
            sender,
            Self {
                receiver,
                chunk_size,
                poll_interval: DEFAULT_POLL_INTERVAL,
            },
        )
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl FrameSource for ChannelFrameSource {
    fn read_frame(&mut self) -> io::Result<FrameRead> {
        match self.receiver.recv_timeout(self.poll_interval) {
            Ok(frame) if frame.is_empty() => Ok(FrameRead::Closed),
            Ok(frame) if frame.len() != self.chunk_size => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "frame of {} bytes does not match chunk size {}",
                    frame.len(),
                    self.chunk_size
                ),
            )),
            Ok(frame) => Ok(FrameRead::Frame(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(FrameRead::Idle {
                waited: self.poll_interval,
            }),
            Err(RecvTimeoutError::Disconnected) => Ok(FrameRead::Closed),
        }
    }
}
