//! Receivers that deliver readings from a stream or datagram channel.
//!
//! Both channel flavours run the same pipeline: raw bytes become one line,
//! the line is tokenized into an attribute map and the map is decoded into a
//! [`Reading`](crate::Reading). They differ only in framing: a
//! [`StreamReceiver`] treats `\n` as the delimiter on a connection-oriented
//! byte channel, while a [`DatagramReceiver`] treats each packet payload as
//! one line. A [`BackgroundReceiver`] moves the blocking stream loop onto a
//! dedicated worker thread and delivers through a callback.
//!
//! `receive()` is safe to call from several threads; calls are serialized so
//! two callers never interleave mid-line. Field-level decode problems never
//! surface here (the decoder substitutes defaults); line- and channel-level
//! problems are reported as [`RecvError`].

use std::fmt;

use crate::parser::MalformedLine;

mod background;
mod datagram;
mod stream;

pub use background::{AlreadyStarted, BackgroundReceiver, ReadingObserver};
pub use datagram::{DatagramReceiver, MAX_DATAGRAM_LEN};
pub use stream::{Disconnect, StreamReceiver};

/// Error type used by the receivers.
///
/// The generic parameter is the error type of the underlying byte source
/// (`std::io::Error` for the socket-backed receivers).
#[derive(Debug, PartialEq)]
pub enum RecvError<E> {
    /// The channel is closed: the peer sent the zero-byte sentinel or the
    /// receiver was closed locally.
    Closed,
    /// Reading from the underlying channel failed before a full line
    /// arrived (end of stream or a transport error).
    Io(E),
    /// The received line does not follow the telemetry tag grammar.
    IllegalData(MalformedLine),
}

impl<E> RecvError<E> {
    /// Whether this error means the channel itself is unusable.
    ///
    /// A malformed line is not fatal (the next line may decode fine), and
    /// neither is a would-block read on a source with a timeout. A closed
    /// channel, end of stream or transport failure is.
    pub fn is_fatal(&self) -> bool
    where
        E: crate::util::ByteSourceErr,
    {
        match self {
            RecvError::Closed => true,
            RecvError::Io(e) => !e.is_would_block(),
            RecvError::IllegalData(_) => false,
        }
    }
}

impl<E> From<MalformedLine> for RecvError<E> {
    fn from(err: MalformedLine) -> Self {
        RecvError::IllegalData(err)
    }
}

impl<E: fmt::Display> fmt::Display for RecvError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecvError::Closed => f.write_str("connection closed"),
            RecvError::Io(e) => write!(f, "receive failed: {e}"),
            RecvError::IllegalData(e) => write!(f, "illegal data: {e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RecvError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecvError::Closed => None,
            RecvError::Io(e) => Some(e),
            RecvError::IllegalData(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn fatality_per_variant() {
        let closed: RecvError<io::Error> = RecvError::Closed;
        assert!(closed.is_fatal());

        let eof: RecvError<io::Error> =
            RecvError::Io(io::Error::new(io::ErrorKind::UnexpectedEof, "eof"));
        assert!(eof.is_fatal());

        let blocked: RecvError<io::Error> =
            RecvError::Io(io::Error::new(io::ErrorKind::WouldBlock, "try again"));
        assert!(!blocked.is_fatal());

        let bad_line: RecvError<io::Error> =
            RecvError::IllegalData(MalformedLine::UnrecognizedTag);
        assert!(!bad_line.is_fatal());
    }

    #[test]
    fn carries_the_cause() {
        use std::error::Error;

        let err: RecvError<io::Error> = MalformedLine::EmptyInput.into();
        assert!(err.source().is_some());
        assert_eq!(format!("{err}"), "illegal data: empty input");
    }
}
