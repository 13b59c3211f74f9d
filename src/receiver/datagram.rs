//! Blocking packet receiver for connectionless channels.

use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::RecvError;
use crate::parser::{tokenize, Reading};
use crate::util::ByteSourceErr;

/// Payload capacity for one telemetry datagram.
///
/// Stations keep a reading well under one Ethernet MTU; a longer payload is
/// truncated by the transport, not by the receiver.
pub const MAX_DATAGRAM_LEN: usize = 1500;

/// How often a blocked `receive()` rechecks whether the receiver was closed.
///
/// `std::net::UdpSocket` has no shutdown, so `close()` cannot interrupt a
/// blocked `recv` directly; the socket carries a read timeout instead.
const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Receives readings from a connectionless channel, one per packet.
///
/// Each packet payload is decoded as a single telemetry line through the
/// same tokenize/decode pipeline as the stream receiver. Calls are
/// independent of each other; concurrent callers are serialized.
pub struct DatagramReceiver {
    socket: UdpSocket,
    // the buffer is reused across packets; its lock also serializes receive()
    buf: Mutex<Box<[u8; MAX_DATAGRAM_LEN]>>,
    closed: AtomicBool,
}

impl DatagramReceiver {
    /// Binds a fresh socket listening on `port` on all interfaces.
    pub fn bind(port: u16) -> io::Result<Self> {
        Self::from_socket(UdpSocket::bind(("0.0.0.0", port))?)
    }

    /// Adapts an already-bound socket.
    ///
    /// A short read timeout is set on the socket so that `close()` can
    /// interrupt a blocked `receive()`.
    pub fn from_socket(socket: UdpSocket) -> io::Result<Self> {
        socket.set_read_timeout(Some(CLOSE_POLL_INTERVAL))?;
        Ok(DatagramReceiver {
            socket,
            buf: Mutex::new(Box::new([0; MAX_DATAGRAM_LEN])),
            closed: AtomicBool::new(false),
        })
    }

    /// Local address of the underlying socket.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Receives and decodes the next packet.
    ///
    /// Blocks until a packet arrives or the receiver is closed. A payload
    /// that violates the tag grammar yields [`RecvError::IllegalData`]; the
    /// socket stays usable for the next call.
    pub fn receive(&self) -> Result<Reading, RecvError<io::Error>> {
        let mut buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if self.is_closed() {
                return Err(RecvError::Closed);
            }
            match self.socket.recv(&mut buf[..]) {
                Ok(len) => {
                    let line = String::from_utf8_lossy(&buf[..len]);
                    let attrs = tokenize(&line)?;
                    return Ok(Reading::from_attrs(&attrs));
                }
                // timeout wakeup: recheck the closed flag, keep waiting
                Err(e) if e.is_would_block() => continue,
                Err(e) => return Err(RecvError::Io(e)),
            }
        }
    }

    /// Whether [`close`](DatagramReceiver::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes the receiver.
    ///
    /// Idempotent. A blocked `receive()` returns [`RecvError::Closed`] at
    /// its next timeout wakeup; subsequent calls fail immediately.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

impl Drop for DatagramReceiver {
    fn drop(&mut self) {
        self.close();
    }
}
