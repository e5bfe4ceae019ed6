//! An emitter that flattens dimensioned service metrics into [StatsD][statsd] counters, timers, and gauges.
//!
//! [statsd]: https://github.com/statsd/statsd/blob/master/docs/metric_types.md
//!
//! StatsD has no notion of dimensions: a metric is a name, a value, and a type. Services, on the other hand, report
//! metrics such as `query/time` tagged with dimensions such as `dataSource` or `type`. This crate bridges the two by
//! folding a configured, ordered subset of each metric's dimensions into its name, so that
//! `query/time{dataSource="wiki"}` reported by `druid/broker` is sent as `druid.broker.query.time.wiki:42|ms`.
//!
//! # Usage
//!
//! ```no_run
//! # use metrics_emitter_statsd::{Emitter, MetricEvent, StatsdEmitterBuilder};
//! // First, create a builder.
//! //
//! // The builder can configure where metrics are sent, how names are put together, which dimension mapping is used,
//! // and more. It can also be created from a `StatsdEmitterConfig`, as read from a configuration file.
//! let emitter = StatsdEmitterBuilder::default()
//!     .with_remote_address("127.0.0.1:8125")
//!     .expect("failed to parse remote address")
//!     .with_prefix("druid")
//!     .build()
//!     .expect("failed to build emitter");
//!
//! // Events are emitted from any number of threads. Emitting never blocks, and never fails: metrics that can't be
//! // sent are dropped, and the failure is logged.
//! let event = MetricEvent::new("node1", "druid/broker", "query/time", 42.0).with_dimension("dataSource", "wiki");
//! emitter.emit(&event.into());
//!
//! // Closing the emitter sends whatever is still queued, and stops the background thread.
//! emitter.close();
//! ```
//!
//! # Dimension mapping
//!
//! Which dimensions end up in a metric's name, in which order, and whether the metric is a counter, timer, or gauge,
//! is decided by a [`DimensionMapping`]. Metrics without an entry in the mapping are not sent at all. A mapping
//! covering common Druid metrics ships with the crate and is used by default; see [`DimensionMapping`] for the format
//! of custom mappings.
//!
//! # Name escaping
//!
//! Names are built segment by segment with [`NameBuilder`]. A `.` or `:` inside a single segment is replaced, so that
//! a dimension value like `wiki:news` can't add a level of hierarchy or corrupt the wire format. Once the segments
//! are joined, any `/` in service or metric names, and any character reserved by the StatsD line format, is turned
//! into the separator.
//!
//! # Transport
//!
//! Metrics are sent over UDP from a background thread, packed into payloads no larger than the configured maximum.
//! Sending is best-effort: when the queue is full or the server is unreachable, metrics are dropped, and errors are
//! logged at a throttled rate. Custom transports can be plugged in by implementing [`MetricSink`].
//!
//! # Telemetry
//!
//! The emitter counts the metrics it sends and drops, and the payloads and bytes it writes, and reports these counts
//! through the [`metrics`] recorder that is current when the emitter is built. All internal telemetry is under the
//! `statsd.emitter` namespace.

#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![deny(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod builder;
pub use self::builder::{BuildError, StatsdEmitterBuilder};

mod config;
pub use self::config::StatsdEmitterConfig;

mod converter;
pub use self::converter::DimensionConverter;

mod emitter;
pub use self::emitter::{Emitter, StatsdEmitter};

mod event;
pub use self::event::{AlertEvent, AlertSeverity, DimensionValue, Dimensions, Event, MetricEvent};

mod forwarder;

mod handler;
pub use self::handler::{ErrorHandler, SendError, ThrottledErrorHandler, DEFAULT_ERROR_LOG_INTERVAL};

mod mapping;
pub use self::mapping::{DimensionMapping, MappingError, MetricMapping, MetricType, ANY_SERVICE};

mod name;
pub use self::name::NameBuilder;

mod sink;
pub use self::sink::{MetricSink, UdpSink};

mod telemetry;
mod writer;
