use tracing::{debug, error};

use crate::{
    converter::DimensionConverter,
    event::{Event, MetricEvent},
    mapping::MetricType,
    name::NameBuilder,
    sink::{MetricSink, UdpSink},
    telemetry::Telemetry,
};

/// Receives events from a host process and forwards them somewhere.
///
/// Emitters are shared between every thread that produces events, so all methods take `&self`. None of them report
/// errors to the caller: emitting is best-effort, and failures are logged instead.
pub trait Emitter: Send + Sync {
    /// Called once by the host before the first event is emitted.
    fn start(&self) {}

    /// Emits a single event.
    fn emit(&self, event: &Event);

    /// Sends any buffered events.
    fn flush(&self) {}

    /// Releases the resources held by the emitter.
    ///
    /// Events emitted after the emitter is closed are dropped.
    fn close(&self) {}
}

/// How metric names are put together.
pub(crate) struct NameConfiguration {
    pub separator: String,
    pub replacement: String,
    pub include_host: bool,
}

/// Emitter that flattens metric events into StatsD counters, timers, and gauges.
///
/// For every metric event, a name is built out of the event's host (if enabled), service, and metric, followed by the
/// values of the dimensions selected by the [`DimensionMapping`][crate::DimensionMapping]. The mapping also decides
/// whether the metric is sent as a counter, timer, or gauge. Metrics without a mapping are logged and dropped, and
/// events other than metric events are ignored.
///
/// Use [`StatsdEmitterBuilder`][crate::StatsdEmitterBuilder] to create one.
pub struct StatsdEmitter<S = UdpSink> {
    names: NameConfiguration,
    converter: DimensionConverter,
    sink: S,
    telemetry: Option<Telemetry>,
}

impl<S> StatsdEmitter<S>
where
    S: MetricSink,
{
    pub(crate) fn from_parts(
        names: NameConfiguration,
        converter: DimensionConverter,
        sink: S,
        telemetry: Option<Telemetry>,
    ) -> Self {
        Self { names, converter, sink, telemetry }
    }

    /// Returns a reference to the sink metrics are sent to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Returns a reference to the converter that types metrics and folds their dimensions into names.
    pub fn converter(&self) -> &DimensionConverter {
        &self.converter
    }

    /// Flattens and sends a single metric event.
    ///
    /// The value is truncated toward zero to an integer, saturating at the bounds of `i64`, with `NaN` sent as zero.
    pub fn emit_metric(&self, event: &MetricEvent) {
        let mut builder = NameBuilder::new(&self.names.separator, &self.names.replacement);
        if self.names.include_host {
            builder.add(event.host());
        }
        builder.add(event.service()).add(event.metric());

        let Some(metric_type) =
            self.converter.resolve(event.service(), event.metric(), event.dimensions(), &mut builder)
        else {
            error!(service = event.service(), metric = event.metric(), "Metric has no StatsD type mapping.");
            if let Some(telemetry) = &self.telemetry {
                telemetry.track_unmapped();
            }
            return;
        };

        let name = builder.build();
        let value = event.value() as i64;

        match metric_type {
            MetricType::Count => self.sink.count(&name, value),
            MetricType::Timer => self.sink.time(&name, value),
            MetricType::Gauge => self.sink.gauge(&name, value),
        }

        if let Some(telemetry) = &self.telemetry {
            telemetry.track_metric(metric_type);
        }
    }
}

impl<S> Emitter for StatsdEmitter<S>
where
    S: MetricSink,
{
    fn start(&self) {
        debug!(mapped_metrics = self.converter.mapping().len(), "Starting StatsD emitter.");
    }

    fn emit(&self, event: &Event) {
        match event {
            Event::Metric(metric) => self.emit_metric(metric),
            Event::Alert(_) => {}
        }
    }

    fn close(&self) {
        debug!("Closing StatsD emitter.");
        self.sink.close();
    }
}
