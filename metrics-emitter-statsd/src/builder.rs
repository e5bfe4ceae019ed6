use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use thiserror::Error;
use tracing::debug;

use crate::{
    config::{
        StatsdEmitterConfig, DEFAULT_MAX_PAYLOAD_LEN, DEFAULT_QUEUE_CAPACITY, DEFAULT_REPLACEMENT,
        DEFAULT_SEPARATOR,
    },
    converter::DimensionConverter,
    emitter::{NameConfiguration, StatsdEmitter},
    forwarder::{ForwarderConfiguration, RemoteAddr},
    handler::{ErrorHandler, ThrottledErrorHandler, DEFAULT_ERROR_LOG_INTERVAL},
    mapping::{DimensionMapping, MappingError},
    sink::{MetricSink, UdpSink},
    telemetry::Telemetry,
    writer::SMALLEST_VALID_PAYLOAD,
};

const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Errors that could occur while building a StatsD emitter.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Failed to parse or resolve the remote address.
    #[error("invalid remote address: {reason}")]
    InvalidRemoteAddress {
        /// Details about the failure.
        reason: String,
    },

    /// The maximum payload length is too small to hold any metric.
    #[error("maximum payload length of {length} bytes is too small (must be {minimum} or greater)")]
    InvalidMaximumPayloadLength {
        /// Configured maximum payload length.
        length: usize,

        /// Smallest allowed maximum payload length.
        minimum: usize,
    },

    /// Failed to spawn the background thread that sends metrics.
    #[error("failed to spawn background thread for emitter")]
    Backend,

    /// Failed to load the dimension mapping.
    #[error("failed to load dimension mapping: {0}")]
    Mapping(#[from] MappingError),
}

enum MappingSource {
    Builtin,
    Path(PathBuf),
    Explicit(DimensionMapping),
}

impl MappingSource {
    fn load(self) -> Result<DimensionMapping, MappingError> {
        match self {
            MappingSource::Builtin => DimensionMapping::builtin(),
            MappingSource::Path(path) => {
                debug!(path = %path.display(), "Loading dimension mapping.");
                DimensionMapping::from_path(path)
            }
            MappingSource::Explicit(mapping) => Ok(mapping),
        }
    }
}

/// Builder for a StatsD emitter.
pub struct StatsdEmitterBuilder {
    remote_addr: RemoteAddr,
    prefix: String,
    separator: String,
    replacement: String,
    include_host: bool,
    mapping: MappingSource,
    write_timeout: Duration,
    max_payload_len: usize,
    queue_capacity: usize,
    error_handler: Option<Arc<dyn ErrorHandler>>,
    error_log_interval: u64,
    telemetry: bool,
}

impl StatsdEmitterBuilder {
    /// Creates a builder from an emitter configuration.
    ///
    /// # Errors
    ///
    /// If the configured hostname and port cannot be resolved, an error will be returned indicating the reason.
    pub fn from_config(config: &StatsdEmitterConfig) -> Result<Self, BuildError> {
        let remote_addr = RemoteAddr::resolve((config.hostname.as_str(), config.port))
            .map_err(|reason| BuildError::InvalidRemoteAddress { reason })?;

        let mut builder = StatsdEmitterBuilder { remote_addr, ..Default::default() }
            .with_prefix(&config.prefix)
            .with_separator(&config.separator)
            .with_replacement_char(&config.replacement_char)
            .with_include_host(config.include_host)
            .with_maximum_payload_length(config.max_payload_length)
            .with_queue_capacity(config.queue_capacity)
            .with_error_log_interval(config.error_log_interval)
            .with_telemetry(config.telemetry);

        if let Some(path) = &config.dimension_map_path {
            builder = builder.with_dimension_map_path(path);
        }

        Ok(builder)
    }

    /// Set the remote address to send metrics to.
    ///
    /// The address needs to be in the format of `<host>:<port>`, and is resolved immediately.
    ///
    /// Defaults to sending to `127.0.0.1:8125`.
    ///
    /// # Errors
    ///
    /// If the given address is not able to be parsed or resolved, an error will be returned indicating the reason.
    pub fn with_remote_address<A>(mut self, addr: A) -> Result<Self, BuildError>
    where
        A: AsRef<str>,
    {
        self.remote_addr = RemoteAddr::try_from(addr.as_ref())
            .map_err(|reason| BuildError::InvalidRemoteAddress { reason })?;
        Ok(self)
    }

    /// Set the prefix written in front of every metric name.
    ///
    /// The prefix is joined to the metric name with a `.`. Surrounding whitespace is trimmed, and an empty prefix
    /// writes metric names as-is.
    ///
    /// The prefix is applied by the UDP transport, so it has no effect on emitters built with
    /// [`build_with_sink`][Self::build_with_sink].
    ///
    /// Defaults to no prefix.
    #[must_use]
    pub fn with_prefix<P>(mut self, prefix: P) -> Self
    where
        P: Into<String>,
    {
        self.prefix = prefix.into();
        self
    }

    /// Set the string used to join the segments of a metric name.
    ///
    /// Defaults to `.`.
    #[must_use]
    pub fn with_separator<S>(mut self, separator: S) -> Self
    where
        S: Into<String>,
    {
        self.separator = separator.into();
        self
    }

    /// Set the string substituted for `.` and `:` inside a single segment of a metric name.
    ///
    /// Defaults to `_`.
    #[must_use]
    pub fn with_replacement_char<R>(mut self, replacement: R) -> Self
    where
        R: Into<String>,
    {
        self.replacement = replacement.into();
        self
    }

    /// Sets whether or not the host that produced an event is the first segment of its metric name.
    ///
    /// Defaults to `false`.
    #[must_use]
    pub fn with_include_host(mut self, include_host: bool) -> Self {
        self.include_host = include_host;
        self
    }

    /// Set the dimension mapping used to type metrics and fold their dimensions into names.
    ///
    /// Defaults to the mapping that ships with this crate.
    #[must_use]
    pub fn with_dimension_mapping(mut self, mapping: DimensionMapping) -> Self {
        self.mapping = MappingSource::Explicit(mapping);
        self
    }

    /// Set the path of a JSON dimension mapping to load when the emitter is built.
    ///
    /// Defaults to the mapping that ships with this crate.
    #[must_use]
    pub fn with_dimension_map_path<P>(mut self, path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        self.mapping = MappingSource::Path(path.into());
        self
    }

    /// Set the write timeout for sending metrics.
    ///
    /// When the write timeout is reached, the write operation will be aborted and the payload being sent at the time
    /// will be dropped without retrying.
    ///
    /// Defaults to 1 second.
    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the maximum payload length for sending metrics.
    ///
    /// Metrics queued at the same time are packed into as few payloads as possible, none of them larger than this.
    /// If a single metric is larger than this, it will be dropped.
    ///
    /// Defaults to 1432 bytes, which fits in a single Ethernet frame.
    #[must_use]
    pub fn with_maximum_payload_length(mut self, max_payload_len: usize) -> Self {
        self.max_payload_len = max_payload_len;
        self
    }

    /// Set how many metrics can be queued for sending.
    ///
    /// Once the queue is full, further metrics are dropped until the background thread catches up.
    ///
    /// Defaults to 4096.
    #[must_use]
    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    /// Set the handler for errors that occur while sending metrics.
    ///
    /// Replaces the default handler, so [`with_error_log_interval`][Self::with_error_log_interval] has no effect.
    ///
    /// Defaults to a [`ThrottledErrorHandler`].
    #[must_use]
    pub fn with_error_handler<H>(mut self, handler: H) -> Self
    where
        H: ErrorHandler + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }

    /// Set how many send errors occur between two logged send errors.
    ///
    /// Defaults to 1000.
    #[must_use]
    pub fn with_error_log_interval(mut self, interval: u64) -> Self {
        self.error_log_interval = interval;
        self
    }

    /// Sets whether or not to enable telemetry for the emitter.
    ///
    /// When enabled, counters describing the operation of the emitter itself, such as how many metrics were emitted,
    /// dropped for lack of a mapping, or dropped by the transport, and how many payloads and bytes were sent, are
    /// registered with the `metrics` recorder that is current when the emitter is built.
    ///
    /// Defaults to `true`.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: bool) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Builds the emitter.
    ///
    /// A background thread is spawned to send metrics to the remote server, and runs until the emitter is closed or
    /// dropped.
    ///
    /// # Errors
    ///
    /// If the maximum payload length is too small, the dimension mapping cannot be loaded, or the background thread
    /// cannot be spawned, an error will be returned.
    pub fn build(self) -> Result<StatsdEmitter<UdpSink>, BuildError> {
        if self.max_payload_len < SMALLEST_VALID_PAYLOAD.len() {
            return Err(BuildError::InvalidMaximumPayloadLength {
                length: self.max_payload_len,
                minimum: SMALLEST_VALID_PAYLOAD.len(),
            });
        }

        let converter = DimensionConverter::new(Arc::new(self.mapping.load()?));
        let telemetry = self.telemetry.then(|| Telemetry::new(self.remote_addr.transport_id()));
        let handler = self
            .error_handler
            .unwrap_or_else(|| Arc::new(ThrottledErrorHandler::new(self.error_log_interval)));

        debug!(
            remote_addr = ?self.remote_addr.addrs(),
            prefix = %self.prefix,
            mapped_metrics = converter.mapping().len(),
            "Building StatsD emitter."
        );

        let forwarder_config = ForwarderConfiguration {
            remote_addr: self.remote_addr,
            max_payload_len: self.max_payload_len,
            write_timeout: self.write_timeout,
        };
        let sink =
            UdpSink::spawn(&self.prefix, forwarder_config, self.queue_capacity, handler, telemetry.clone())?;

        let names = NameConfiguration {
            separator: self.separator,
            replacement: self.replacement,
            include_host: self.include_host,
        };

        Ok(StatsdEmitter::from_parts(names, converter, sink, telemetry))
    }

    /// Builds an emitter that sends flattened metrics to the given sink instead of over UDP.
    ///
    /// Settings that only apply to the UDP transport, such as the remote address, prefix, and payload length, are
    /// ignored.
    ///
    /// # Errors
    ///
    /// If the dimension mapping cannot be loaded, an error will be returned.
    pub fn build_with_sink<S>(self, sink: S) -> Result<StatsdEmitter<S>, BuildError>
    where
        S: MetricSink,
    {
        let converter = DimensionConverter::new(Arc::new(self.mapping.load()?));
        let telemetry = self.telemetry.then(|| Telemetry::new("custom"));

        let names = NameConfiguration {
            separator: self.separator,
            replacement: self.replacement,
            include_host: self.include_host,
        };

        Ok(StatsdEmitter::from_parts(names, converter, sink, telemetry))
    }
}

impl Default for StatsdEmitterBuilder {
    fn default() -> Self {
        StatsdEmitterBuilder {
            remote_addr: RemoteAddr::from(SocketAddr::from(([127, 0, 0, 1], 8125))),
            prefix: String::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            replacement: DEFAULT_REPLACEMENT.to_string(),
            include_host: false,
            mapping: MappingSource::Builtin,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            max_payload_len: DEFAULT_MAX_PAYLOAD_LEN,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            error_handler: None,
            error_log_interval: DEFAULT_ERROR_LOG_INTERVAL,
            telemetry: true,
        }
    }
}
