use std::{
    sync::{
        atomic::{
            AtomicBool,
            Ordering::{AcqRel, Acquire},
        },
        Arc,
    },
    thread::JoinHandle,
};

use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, error};

use crate::{
    builder::BuildError,
    forwarder::{sync::Forwarder, ForwarderConfiguration, Message},
    handler::{ErrorHandler, SendError},
    mapping::MetricType,
    telemetry::Telemetry,
    writer::LineFormatter,
};

/// Destination for flattened metrics.
///
/// Implementations must be safe to call from many threads at once, and should not block: the emitter calls into the
/// sink directly from whichever thread emitted the event.
pub trait MetricSink: Send + Sync {
    /// Increments the counter `name` by `value`.
    fn count(&self, name: &str, value: i64);

    /// Records a duration of `value` for the timer `name`.
    fn time(&self, name: &str, value: i64);

    /// Sets the gauge `name` to `value`.
    fn gauge(&self, name: &str, value: i64);

    /// Releases any resources held by the sink.
    ///
    /// Metrics sent after the sink is closed are dropped.
    fn close(&self) {}
}

impl<S> MetricSink for Arc<S>
where
    S: MetricSink + ?Sized,
{
    fn count(&self, name: &str, value: i64) {
        (**self).count(name, value);
    }

    fn time(&self, name: &str, value: i64) {
        (**self).time(name, value);
    }

    fn gauge(&self, name: &str, value: i64) {
        (**self).gauge(name, value);
    }

    fn close(&self) {
        (**self).close();
    }
}

/// Sink that sends metrics to a StatsD server over UDP.
///
/// Metrics are formatted on the calling thread and handed to a background thread over a bounded queue, so sending a
/// metric never blocks. When the queue is full, the metric is dropped and the error handler is notified.
pub struct UdpSink {
    formatter: LineFormatter,
    tx: Sender<Message>,
    closed: AtomicBool,
    handler: Arc<dyn ErrorHandler>,
    telemetry: Option<Telemetry>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl UdpSink {
    /// Spawns the forwarder thread and returns a sink feeding it.
    pub(crate) fn spawn(
        prefix: &str,
        config: ForwarderConfiguration,
        queue_capacity: usize,
        handler: Arc<dyn ErrorHandler>,
        telemetry: Option<Telemetry>,
    ) -> Result<Self, BuildError> {
        let (tx, rx) = bounded(queue_capacity.max(1));
        let forwarder = Forwarder::new(config, rx, Arc::clone(&handler), telemetry.clone());

        let handle = std::thread::Builder::new()
            .name("metrics-emitter-statsd-forwarder".to_string())
            .spawn(move || forwarder.run())
            .map_err(|_| BuildError::Backend)?;

        Ok(Self {
            formatter: LineFormatter::new(prefix),
            tx,
            closed: AtomicBool::new(false),
            handler,
            telemetry,
            forwarder: Mutex::new(Some(handle)),
        })
    }

    fn send(&self, name: &str, value: i64, metric_type: MetricType) {
        if self.closed.load(Acquire) {
            self.drop_metric(&SendError::Closed);
            return;
        }

        let record = self.formatter.format(name, value, metric_type);
        match self.tx.try_send(Message::Record(record)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => self.drop_metric(&SendError::QueueFull),
            Err(TrySendError::Disconnected(_)) => self.drop_metric(&SendError::Closed),
        }
    }

    fn drop_metric(&self, error: &SendError) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.track_queue_dropped();
        }
        self.handler.handle(error);
    }
}

impl MetricSink for UdpSink {
    fn count(&self, name: &str, value: i64) {
        self.send(name, value, MetricType::Count);
    }

    fn time(&self, name: &str, value: i64) {
        self.send(name, value, MetricType::Timer);
    }

    fn gauge(&self, name: &str, value: i64) {
        self.send(name, value, MetricType::Gauge);
    }

    /// Stops accepting metrics, waits for the forwarder to send everything already queued, and stops it.
    ///
    /// Metrics sent concurrently with `close` that land in the queue behind the shutdown are not sent. They are
    /// reported to the error handler as [`SendError::Closed`], like metrics sent after `close` returns.
    fn close(&self) {
        if self.closed.swap(true, AcqRel) {
            return;
        }

        // The forwarder may already be gone if it panicked, in which case there is nothing left to wait for.
        let _ = self.tx.send(Message::Shutdown);

        if let Some(handle) = self.forwarder.lock().take() {
            if handle.join().is_err() {
                error!("Forwarder thread panicked.");
            } else {
                debug!("Forwarder thread joined.");
            }
        }
    }
}
