//! Blocking line receiver for connection-oriented channels.

use std::io::{self, BufReader};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use log::debug;

use super::RecvError;
use crate::parser::{tokenize, Reading};
use crate::util::{ByteSource, ByteSourceErr, IoReader};

/// Transport handles that can interrupt a blocked read from another thread.
///
/// [`StreamReceiver::close`] calls this while a `receive()` may be blocked
/// inside the source; the implementation must make that read fail promptly
/// rather than hang. Implemented for [`TcpStream`] via a socket shutdown.
pub trait Disconnect: Send + Sync {
    /// Tears the channel down; in-flight and subsequent reads fail.
    fn disconnect(&self) -> io::Result<()>;
}

impl Disconnect for TcpStream {
    fn disconnect(&self) -> io::Result<()> {
        self.shutdown(Shutdown::Both)
    }
}

/// Receives readings from a connection-oriented byte channel.
///
/// One reading arrives per `\n`-terminated line. `receive()` takes `&self`
/// and serializes concurrent callers, so a receiver can be shared between
/// threads (the background worker relies on this). The channel is owned
/// exclusively by the receiver; `close()` is idempotent and safe to race
/// against an in-flight blocking read.
pub struct StreamReceiver<R: ByteSource> {
    line: Mutex<LineReader<R>>,
    disconnect: Option<Box<dyn Disconnect>>,
    closed: AtomicBool,
}

impl<R: ByteSource> StreamReceiver<R> {
    /// Creates a receiver reading from `source`.
    ///
    /// A receiver built this way has no disconnect handle: `close()` marks
    /// it closed but cannot interrupt a read that is already blocked inside
    /// the source. Use [`StreamReceiver::tcp`] for sockets.
    pub fn new(source: R) -> Self {
        Self::with_disconnect(source, None)
    }

    fn with_disconnect(source: R, disconnect: Option<Box<dyn Disconnect>>) -> Self {
        StreamReceiver {
            line: Mutex::new(LineReader {
                source,
                buf: Vec::new(),
            }),
            disconnect,
            closed: AtomicBool::new(false),
        }
    }

    /// Receives the next reading.
    ///
    /// Blocks until a full line has been read, then tokenizes and decodes
    /// it. A line that violates the tag grammar yields
    /// [`RecvError::IllegalData`]; the channel stays usable and the next
    /// call reads the next line.
    pub fn receive(&self) -> Result<Reading, RecvError<R::Error>> {
        if self.is_closed() {
            return Err(RecvError::Closed);
        }
        let line = {
            let mut reader = self.line.lock().unwrap_or_else(PoisonError::into_inner);
            reader.read_line()?
        };
        let attrs = tokenize(&line)?;
        Ok(Reading::from_attrs(&attrs))
    }

    /// Whether [`close`](StreamReceiver::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes the channel.
    ///
    /// Idempotent. Marks the receiver closed, which also requests
    /// cancellation of an active background worker, then tears the
    /// transport down so a blocked read unblocks. Errors from tearing down
    /// an already-broken transport are suppressed.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = &self.disconnect {
            if let Err(e) = handle.disconnect() {
                debug!("disconnect during close failed: {e}");
            }
        }
    }
}

impl StreamReceiver<IoReader<BufReader<TcpStream>>> {
    /// Adapts a connected TCP stream.
    ///
    /// Reads go through a buffered clone of the stream; the original is kept
    /// as the disconnect handle so `close()` can shut the socket down while
    /// a read is blocked on it.
    pub fn tcp(stream: TcpStream) -> io::Result<Self> {
        let reader = IoReader::new(BufReader::new(stream.try_clone()?));
        Ok(Self::with_disconnect(reader, Some(Box::new(stream))))
    }
}

impl<R: ByteSource> Drop for StreamReceiver<R> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Accumulates bytes into lines.
struct LineReader<R: ByteSource> {
    source: R,
    buf: Vec<u8>,
}

impl<R: ByteSource> LineReader<R> {
    /// Reads up to the next newline. The newline is consumed but not part of
    /// the returned line. A zero byte is the peer's closed-channel sentinel.
    ///
    /// On a would-block error the partial line is kept so the next call
    /// resumes where this one stopped; any other error discards it.
    fn read_line(&mut self) -> Result<String, RecvError<R::Error>> {
        loop {
            match self.source.read_byte() {
                Ok(0) => {
                    self.buf.clear();
                    return Err(RecvError::Closed);
                }
                Ok(b'\n') => {
                    let line = String::from_utf8_lossy(&self.buf).into_owned();
                    self.buf.clear();
                    return Ok(line);
                }
                Ok(b) => self.buf.push(b),
                Err(e) => {
                    if !e.is_would_block() {
                        self.buf.clear();
                    }
                    return Err(RecvError::Io(e));
                }
            }
        }
    }
}
