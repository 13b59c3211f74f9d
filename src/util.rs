//! Byte source abstractions used by the stream receiver.

use std::fmt;
use std::io;

pub(crate) mod private {
    pub trait Sealed {}
}

/// Classification of byte source errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrKind {
    /// The source reached the end of its input.
    Eof,
    /// Reading would block; trying again later may succeed.
    WouldBlock,
    /// Any other failure.
    Other,
}

/// Helper trait implemented for error types of `ByteSource`
pub trait ByteSourceErr: fmt::Debug + fmt::Display + private::Sealed {
    /// Classifies the error.
    fn kind(&self) -> ErrKind;

    /// Returns whether the error is an end of file (EOF) error
    fn is_eof(&self) -> bool {
        matches!(self.kind(), ErrKind::Eof)
    }

    /// Returns whether the error is "would block", which means that reading
    /// can be successful again later
    fn is_would_block(&self) -> bool {
        matches!(self.kind(), ErrKind::WouldBlock)
    }
}

/// Helper trait that allows reading individual bytes
pub trait ByteSource: private::Sealed {
    /// Type of errors that can occur while reading bytes
    type Error: ByteSourceErr;

    /// Tries to read a single byte from the source
    fn read_byte(&mut self) -> Result<u8, Self::Error>;
}

/// Wraps types that implement `std::io::Read` and implements `ByteSource`
pub struct IoReader<R>
where
    R: io::Read,
{
    inner: R,
}

impl<R> IoReader<R>
where
    R: io::Read,
{
    /// Create a new `IoReader` wrapping the provided reader.
    pub fn new(reader: R) -> Self {
        IoReader { inner: reader }
    }

    /// Consumes the `IoReader`, returning the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R> ByteSource for IoReader<R>
where
    R: io::Read,
{
    type Error = io::Error;

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let mut b = 0u8;
        self.inner.read_exact(std::slice::from_mut(&mut b))?;
        Ok(b)
    }
}

impl<R> private::Sealed for IoReader<R> where R: io::Read {}

impl ByteSourceErr for io::Error {
    fn kind(&self) -> ErrKind {
        match io::Error::kind(self) {
            io::ErrorKind::UnexpectedEof => ErrKind::Eof,
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => ErrKind::WouldBlock,
            _ => ErrKind::Other,
        }
    }
}

impl private::Sealed for io::Error {}

/// Error type indicating that the end of the input has been reached
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Eof;

impl fmt::Display for Eof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("end of input")
    }
}

impl std::error::Error for Eof {}

impl ByteSourceErr for Eof {
    fn kind(&self) -> ErrKind {
        ErrKind::Eof
    }
}

impl private::Sealed for Eof {}

/// Wraps byte slices and implements `ByteSource`
pub struct SliceReader<'i> {
    inner: &'i [u8],
    idx: usize,
}

impl<'i> SliceReader<'i> {
    /// Create a new `SliceReader` over the provided slice.
    pub fn new(slice: &'i [u8]) -> Self {
        SliceReader {
            inner: slice,
            idx: 0,
        }
    }
}

impl<'i> ByteSource for SliceReader<'i> {
    type Error = Eof;

    fn read_byte(&mut self) -> Result<u8, Self::Error> {
        let b = *self.inner.get(self.idx).ok_or(Eof)?;
        self.idx += 1;
        Ok(b)
    }
}

impl<'i> private::Sealed for SliceReader<'i> {}
