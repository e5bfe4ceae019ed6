use std::{
    io,
    sync::atomic::{AtomicU64, Ordering::Relaxed},
};

use thiserror::Error;
use tracing::error;

/// Default number of errors between two logged errors for [`ThrottledErrorHandler`].
pub const DEFAULT_ERROR_LOG_INTERVAL: u64 = 1000;

/// Errors that could occur while sending metrics.
///
/// These errors never reach the caller that emitted the metric: they are handed to the configured [`ErrorHandler`].
#[derive(Debug, Error)]
pub enum SendError {
    /// Writing to the socket failed.
    #[error("failed to send payload: {0}")]
    Io(#[from] io::Error),

    /// The send queue was full, so the metric was dropped.
    #[error("send queue is full")]
    QueueFull,

    /// The sink was closed, so the metric was dropped.
    #[error("sink is closed")]
    Closed,

    /// The metric did not fit in a single payload, so it was dropped.
    #[error("metric is {len} bytes, which exceeds the maximum payload length of {max} bytes")]
    PayloadTooLarge {
        /// Length of the formatted metric, in bytes.
        len: usize,

        /// Maximum payload length, in bytes.
        max: usize,
    },
}

/// Receives errors that occur while sending metrics.
///
/// Handlers may be called concurrently, from both the threads emitting metrics and the background forwarder thread.
pub trait ErrorHandler: Send + Sync {
    /// Handles a single error.
    fn handle(&self, error: &SendError);
}

impl<F> ErrorHandler for F
where
    F: Fn(&SendError) + Send + Sync,
{
    fn handle(&self, error: &SendError) {
        self(error);
    }
}

/// Logs send errors, at most once every `interval` errors.
///
/// Sending metrics is best-effort, and a sustained failure (such as an unreachable StatsD server) would otherwise log
/// once per metric. The first error is always logged, and then every `interval`-th error after it.
///
/// The count is shared between all threads without locking, so under contention the logged errors are only
/// approximately `interval` apart.
#[derive(Debug)]
pub struct ThrottledErrorHandler {
    interval: u64,
    errors: AtomicU64,
}

impl ThrottledErrorHandler {
    /// Creates a new `ThrottledErrorHandler` that logs once every `interval` errors.
    ///
    /// An interval of zero is treated as one, logging every error.
    pub fn new(interval: u64) -> Self {
        Self { interval: interval.max(1), errors: AtomicU64::new(0) }
    }

    /// Returns the number of errors handled so far.
    pub fn error_count(&self) -> u64 {
        self.errors.load(Relaxed)
    }

    /// Records an error, returning `true` if it should be logged.
    fn record(&self) -> bool {
        self.errors.fetch_add(1, Relaxed) % self.interval == 0
    }
}

impl Default for ThrottledErrorHandler {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_LOG_INTERVAL)
    }
}

impl ErrorHandler for ThrottledErrorHandler {
    fn handle(&self, error: &SendError) {
        if self.record() {
            error!(error = %error, errors = self.error_count(), "Error sending metric to StatsD.");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering::Relaxed},
            Arc,
        },
        thread,
    };

    use super::{ErrorHandler, SendError, ThrottledErrorHandler};

    #[test]
    fn logs_first_error_and_every_interval() {
        let handler = ThrottledErrorHandler::new(3);
        let logged = (0..10).map(|_| handler.record()).collect::<Vec<_>>();

        assert_eq!(
            logged,
            [true, false, false, true, false, false, true, false, false, true]
        );
        assert_eq!(handler.error_count(), 10);
    }

    #[test]
    fn zero_interval_logs_everything() {
        let handler = ThrottledErrorHandler::new(0);
        assert!((0..5).all(|_| handler.record()));
    }

    #[test]
    fn default_interval() {
        let handler = ThrottledErrorHandler::default();
        assert!(handler.record());
        assert_eq!((1..1000).filter(|_| handler.record()).count(), 0);
        assert!(handler.record());
    }

    #[test]
    fn concurrent_errors() {
        let handler = Arc::new(ThrottledErrorHandler::new(100));
        let logged = Arc::new(AtomicUsize::new(0));

        let threads = (0..8)
            .map(|_| {
                let handler = Arc::clone(&handler);
                let logged = Arc::clone(&logged);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        if handler.record() {
                            logged.fetch_add(1, Relaxed);
                        }
                    }
                })
            })
            .collect::<Vec<_>>();

        for thread in threads {
            thread.join().expect("thread should not panic");
        }

        // Every error is counted, even if which thread logged which error varies.
        assert_eq!(handler.error_count(), 8_000);
        assert_eq!(logged.load(Relaxed), 80);

        handler.handle(&SendError::QueueFull);
        assert_eq!(handler.error_count(), 8_001);
    }

    #[test]
    fn closures_are_handlers() {
        let seen = Arc::new(AtomicUsize::new(0));
        let handler = {
            let seen = Arc::clone(&seen);
            move |error: &SendError| {
                if matches!(error, SendError::Closed) {
                    seen.fetch_add(1, Relaxed);
                }
            }
        };

        handler.handle(&SendError::Closed);
        handler.handle(&SendError::QueueFull);
        assert_eq!(seen.load(Relaxed), 1);
    }
}
