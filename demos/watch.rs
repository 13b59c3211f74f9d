//! Connects to a station and prints readings as they arrive.
//!
//! Example usage:
//!
//! ```
//! cargo run --example watch -- 127.0.0.1:8888
//! ```

use std::io;
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use meteo_rs::{BackgroundReceiver, Reading, ReadingObserver, RecvError, StreamReceiver};

struct Printer;

impl ReadingObserver<io::Error> for Printer {
    fn on_reading(&mut self, reading: Reading) {
        println!("{reading}");
    }

    fn on_error(&mut self, error: RecvError<io::Error>) {
        eprintln!("receive failed: {error}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8888".to_string());
    let stream = TcpStream::connect(&addr)?;
    println!("connected to {addr}");

    let receiver = BackgroundReceiver::new(StreamReceiver::tcp(stream)?);
    receiver.start(Printer)?;

    while receiver.is_running() {
        thread::sleep(Duration::from_secs(1));
    }
    Ok(())
}
