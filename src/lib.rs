//! Client library for meteo weather station telemetry.
//!
//! Remote stations emit one reading per line (TCP) or per packet (UDP),
//! encoded as a single self-closing tag with `name="value"` attributes:
//!
//! ```text
//! <meteo id="3" name="attic" temperature="21.5" humidity="55" pressure="1013.2"/>
//! ```
//!
//! The tag may be named `node` or `meteo`; tag and attribute names are
//! case-insensitive, attribute order is irrelevant, any subset of attributes
//! may be present and unknown attributes are ignored. Decoding is
//! best-effort: an absent or unparsable value falls back to the field's
//! default instead of failing the whole reading (see
//! [`Reading::from_attrs`]).
//!
//! # Receiving
//!
//! - [`StreamReceiver`] reads one line per call from a connection-oriented
//!   byte channel.
//! - [`BackgroundReceiver`] drives a [`StreamReceiver`] from a dedicated
//!   worker thread and delivers readings through a [`ReadingObserver`].
//! - [`DatagramReceiver`] decodes one reading per UDP packet.
//!
//! Establishing the connection is left to the caller; the receivers adapt an
//! already-connected [`std::net::TcpStream`] or bound [`std::net::UdpSocket`].
//!
//! ```no_run
//! use std::net::TcpStream;
//!
//! use meteo_rs::StreamReceiver;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let stream = TcpStream::connect("station.local:8888")?;
//!     let receiver = StreamReceiver::tcp(stream)?;
//!     let reading = receiver.receive()?;
//!     println!("{reading}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod parser;
pub mod receiver;
pub mod util;

pub use parser::{tokenize, MalformedLine, Reading, Station};
pub use receiver::{
    AlreadyStarted, BackgroundReceiver, DatagramReceiver, ReadingObserver, RecvError,
    StreamReceiver,
};
