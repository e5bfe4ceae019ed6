use metrics::{counter, Counter};

use crate::mapping::MetricType;

/// Emitter telemetry.
///
/// `Telemetry` collects information about the emitter's behavior and can be optionally enabled to report it as normal
/// metrics through the `metrics` recorder that is current when the emitter is built.
#[derive(Clone)]
pub(crate) struct Telemetry {
    counter_metrics: Counter,
    timer_metrics: Counter,
    gauge_metrics: Counter,
    unmapped_metrics: Counter,
    queue_dropped_metrics: Counter,
    oversize_dropped_metrics: Counter,
    packets_sent: Counter,
    packets_dropped: Counter,
    bytes_sent: Counter,
    bytes_dropped: Counter,
}

impl Telemetry {
    /// Creates a `Telemetry` instance.
    pub fn new(transport: &'static str) -> Self {
        let base_labels = telemetry_tags!("client_transport" => transport);
        let counter_labels = telemetry_tags!("client_transport" => transport, "metrics_type" => "count");
        let timer_labels = telemetry_tags!("client_transport" => transport, "metrics_type" => "timer");
        let gauge_labels = telemetry_tags!("client_transport" => transport, "metrics_type" => "gauge");

        Self {
            counter_metrics: counter!("statsd.emitter.metrics", counter_labels.iter()),
            timer_metrics: counter!("statsd.emitter.metrics", timer_labels.iter()),
            gauge_metrics: counter!("statsd.emitter.metrics", gauge_labels.iter()),
            unmapped_metrics: counter!("statsd.emitter.metrics_unmapped", base_labels.iter()),
            queue_dropped_metrics: counter!("statsd.emitter.metrics_dropped_queue", base_labels.iter()),
            oversize_dropped_metrics: counter!("statsd.emitter.metrics_dropped_oversize", base_labels.iter()),
            packets_sent: counter!("statsd.emitter.packets_sent", base_labels.iter()),
            packets_dropped: counter!("statsd.emitter.packets_dropped", base_labels.iter()),
            bytes_sent: counter!("statsd.emitter.bytes_sent", base_labels.iter()),
            bytes_dropped: counter!("statsd.emitter.bytes_dropped", base_labels.iter()),
        }
    }

    /// Tracks a metric dispatched to the sink.
    pub fn track_metric(&self, metric_type: MetricType) {
        match metric_type {
            MetricType::Count => self.counter_metrics.increment(1),
            MetricType::Timer => self.timer_metrics.increment(1),
            MetricType::Gauge => self.gauge_metrics.increment(1),
        }
    }

    /// Tracks a metric dropped for lack of a type mapping.
    pub fn track_unmapped(&self) {
        self.unmapped_metrics.increment(1);
    }

    /// Tracks a metric dropped because the send queue was full or closed.
    pub fn track_queue_dropped(&self) {
        self.queue_dropped_metrics.increment(1);
    }

    /// Tracks a metric dropped because it was larger than the maximum payload length on its own.
    pub fn track_oversize_dropped(&self) {
        self.oversize_dropped_metrics.increment(1);
    }

    /// Tracks a successful packet send.
    pub fn track_packet_send_succeeded(&self, bytes_len: usize) {
        self.packets_sent.increment(1);
        self.bytes_sent.increment(bytes_len as u64);
    }

    /// Tracks a failed packet send.
    pub fn track_packet_send_failed(&self, bytes_len: usize) {
        self.packets_dropped.increment(1);
        self.bytes_dropped.increment(bytes_len as u64);
    }
}

macro_rules! _telemetry_tags {
    ($($k:literal => $v:expr),*) => {
        [
            ::metrics::Label::from_static_parts("client", "rust"),
            ::metrics::Label::from_static_parts("client_version", env!("CARGO_PKG_VERSION")),
            $(::metrics::Label::from_static_parts($k, $v),)*
        ]
    };
}

pub(crate) use _telemetry_tags as telemetry_tags;
