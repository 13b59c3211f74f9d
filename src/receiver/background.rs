//! Background worker that drives a stream receiver.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use log::{debug, warn};

use super::{RecvError, StreamReceiver};
use crate::parser::Reading;
use crate::util::ByteSource;

/// Callback interface for readings delivered by a [`BackgroundReceiver`].
///
/// Callbacks run on the worker thread, one at a time, in receive order;
/// there is no internal buffering, so a slow observer delays subsequent
/// receives. The generic parameter is the byte source's error type
/// (`std::io::Error` for socket-backed receivers).
///
/// Closures work too: any `FnMut(Result<Reading, RecvError<E>>)` is an
/// observer.
pub trait ReadingObserver<E>: Send {
    /// Called for every decoded reading.
    fn on_reading(&mut self, reading: Reading);

    /// Called for every receive error.
    ///
    /// A non-fatal error (a single malformed line) keeps the worker
    /// running; a fatal one is the worker's last callback before it exits.
    fn on_error(&mut self, error: RecvError<E>);
}

impl<E, F> ReadingObserver<E> for F
where
    F: FnMut(Result<Reading, RecvError<E>>) + Send,
{
    fn on_reading(&mut self, reading: Reading) {
        self(Ok(reading));
    }

    fn on_error(&mut self, error: RecvError<E>) {
        self(Err(error));
    }
}

/// Error type indicating that a receiver's worker is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyStarted;

impl fmt::Display for AlreadyStarted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("receiver worker already started")
    }
}

impl std::error::Error for AlreadyStarted {}

/// Drives a [`StreamReceiver`] from a single dedicated worker thread.
///
/// The worker repeatedly calls `receive()` and pushes every outcome to the
/// observer given to [`start`](BackgroundReceiver::start). At most one
/// worker exists per receiver. Cancellation is cooperative:
/// [`close`](BackgroundReceiver::close), or closing the wrapped receiver
/// directly, marks the channel closed and interrupts the blocked read, and
/// the worker exits without invoking the observer again. The worker never
/// blocks process shutdown.
pub struct BackgroundReceiver<R: ByteSource> {
    receiver: Arc<StreamReceiver<R>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl<R: ByteSource> BackgroundReceiver<R> {
    /// Wraps a stream receiver. No worker is spawned yet.
    pub fn new(receiver: StreamReceiver<R>) -> Self {
        BackgroundReceiver {
            receiver: Arc::new(receiver),
            worker: Mutex::new(None),
        }
    }

    /// The wrapped receiver.
    ///
    /// Synchronous `receive()` calls on it are serialized with the worker's
    /// own; closing it cancels the worker.
    pub fn receiver(&self) -> &StreamReceiver<R> {
        &self.receiver
    }

    /// Whether a worker has been started and is still running.
    pub fn is_running(&self) -> bool {
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Cancels the worker and closes the channel.
    ///
    /// Closes the wrapped receiver (unblocking an in-flight read), then
    /// waits for the worker to exit. No observer callback is invoked after
    /// this returns. Idempotent.
    pub fn close(&self) {
        self.receiver.close();
        let handle = {
            let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            worker.take()
        };
        if let Some(handle) = handle {
            // an observer callback may itself close the receiver; the
            // worker must not join itself
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

impl<R> BackgroundReceiver<R>
where
    R: ByteSource + Send + 'static,
    R::Error: Send + 'static,
{
    /// Spawns the worker and starts delivering to `observer`.
    ///
    /// Fails with [`AlreadyStarted`] if this receiver's worker is already
    /// running.
    pub fn start<O>(&self, observer: O) -> Result<(), AlreadyStarted>
    where
        O: ReadingObserver<R::Error> + 'static,
    {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return Err(AlreadyStarted);
        }
        let receiver = Arc::clone(&self.receiver);
        *worker = Some(thread::spawn(move || run_worker(&receiver, observer)));
        Ok(())
    }
}

impl<R: ByteSource> Drop for BackgroundReceiver<R> {
    fn drop(&mut self) {
        self.close();
    }
}

/// The worker loop: receive, deliver, repeat until the channel dies.
///
/// The closed flag is rechecked before every callback so that nothing is
/// delivered after `close()` has been requested.
fn run_worker<R, O>(receiver: &StreamReceiver<R>, mut observer: O)
where
    R: ByteSource,
    O: ReadingObserver<R::Error>,
{
    debug!("receiver worker started");
    while !receiver.is_closed() {
        match receiver.receive() {
            Ok(reading) => {
                if receiver.is_closed() {
                    break;
                }
                observer.on_reading(reading);
            }
            Err(error) => {
                if receiver.is_closed() {
                    break;
                }
                let fatal = error.is_fatal();
                if fatal {
                    warn!("receiver worker stopping: {error}");
                }
                observer.on_error(error);
                if fatal {
                    return;
                }
            }
        }
    }
    debug!("receiver worker cancelled");
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;
    use crate::util::{Eof, SliceReader};

    type Outcome = Result<Reading, RecvError<Eof>>;

    fn channel_observer() -> (impl FnMut(Outcome) + Send + 'static, mpsc::Receiver<Outcome>) {
        let (tx, rx) = mpsc::channel();
        let observer = move |outcome: Outcome| {
            let _ = tx.send(outcome);
        };
        (observer, rx)
    }

    #[test]
    fn delivers_readings_in_receive_order() {
        let receiver = StreamReceiver::new(SliceReader::new(
            b"<meteo id=\"1\"/>\n<meteo id=\"2\"/>\n<meteo id=\"3\"/>\n",
        ));
        let background = BackgroundReceiver::new(receiver);
        let (observer, outcomes) = channel_observer();
        background.start(observer).unwrap();

        for expected in 1..=3 {
            let reading = outcomes
                .recv_timeout(Duration::from_secs(5))
                .unwrap()
                .unwrap();
            assert_eq!(reading.station_id, expected);
        }
        // the exhausted source ends the worker with one fatal error
        let last = outcomes.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(last, Err(RecvError::Io(Eof)));
        assert!(outcomes.recv_timeout(Duration::from_millis(100)).is_err());
    }

    #[test]
    fn continues_after_a_malformed_line() {
        let receiver =
            StreamReceiver::new(SliceReader::new(b"garbage\n<node id=\"9\"/>\n"));
        let background = BackgroundReceiver::new(receiver);
        let (observer, outcomes) = channel_observer();
        background.start(observer).unwrap();

        let first = outcomes.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(first, Err(RecvError::IllegalData(_))));
        let second = outcomes.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(second.unwrap().station_id, 9);
    }

    #[test]
    fn second_start_fails() {
        let receiver = StreamReceiver::new(SliceReader::new(b""));
        let background = BackgroundReceiver::new(receiver);
        let (observer, _outcomes) = channel_observer();
        background.start(observer).unwrap();

        let (observer, _outcomes) = channel_observer();
        assert_eq!(background.start(observer), Err(AlreadyStarted));
    }

    #[test]
    fn no_callbacks_after_close() {
        // close before the worker starts: the loop must exit without ever
        // touching the observer
        let receiver = StreamReceiver::new(SliceReader::new(b"<meteo id=\"1\"/>\n"));
        let background = BackgroundReceiver::new(receiver);
        background.receiver().close();
        let (observer, outcomes) = channel_observer();
        background.start(observer).unwrap();
        background.close();
        assert!(outcomes.recv_timeout(Duration::from_millis(200)).is_err());
    }
}
