use std::{
    collections::HashMap,
    fmt, fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use thiserror::Error;

/// Service key matching every service.
pub const ANY_SERVICE: &str = "*";

const DEFAULT_MAPPING: &str = include_str!("default_dimensions.json");

/// Errors that could occur while loading a dimension mapping.
#[derive(Debug, Error)]
pub enum MappingError {
    /// Failed to read the mapping definition.
    #[error("failed to read dimension mapping from {}: {source}", .path.display())]
    Io {
        /// Location of the mapping definition.
        path: PathBuf,

        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The mapping definition is not valid.
    #[error("failed to parse dimension mapping: {0}")]
    Parse(#[from] serde_json::Error),
}

/// StatsD metric type.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// A counter, incremented by the event value.
    #[serde(alias = "counter")]
    Count,

    /// A timer, recording the event value as a duration.
    Timer,

    /// A gauge, set to the event value.
    Gauge,
}

impl MetricType {
    /// Returns the name used for this type in logs and telemetry.
    pub const fn as_str(self) -> &'static str {
        match self {
            MetricType::Count => "count",
            MetricType::Timer => "timer",
            MetricType::Gauge => "gauge",
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single metric is sent: its StatsD type, and which dimensions are folded into its name.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct MetricMapping {
    #[serde(rename = "type")]
    metric_type: MetricType,

    #[serde(default)]
    dimensions: Vec<String>,
}

impl MetricMapping {
    /// Creates a new `MetricMapping`.
    ///
    /// Dimensions are appended to the metric name in the order given here.
    pub fn new<I, D>(metric_type: MetricType, dimensions: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<String>,
    {
        Self { metric_type, dimensions: dimensions.into_iter().map(Into::into).collect() }
    }

    /// StatsD type of the metric.
    pub fn metric_type(&self) -> MetricType {
        self.metric_type
    }

    /// Dimension keys to append to the metric name, in order.
    pub fn dimensions(&self) -> &[String] {
        &self.dimensions
    }
}

/// Table of [`MetricMapping`]s keyed by service and metric.
///
/// Entries registered under [`ANY_SERVICE`] apply to every service that does not have an entry of its own for the same
/// metric.
///
/// # Format
///
/// Mappings are defined in JSON, as an object keyed by service name whose values are objects keyed by metric name:
///
/// ```json
/// {
///   "*": {
///     "query/time": { "type": "timer", "dimensions": ["dataSource", "type"] },
///     "jvm/gc/count": { "type": "count", "dimensions": ["gcName"] }
///   },
///   "druid/broker": {
///     "query/time": { "type": "timer" }
///   }
/// }
/// ```
///
/// `type` is one of `count` (or `counter`), `timer`, or `gauge`. `dimensions` may be omitted.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct DimensionMapping {
    services: HashMap<String, HashMap<String, MetricMapping>>,
}

impl DimensionMapping {
    /// Creates an empty `DimensionMapping`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the mapping that ships with this crate.
    ///
    /// It covers common Druid service metrics for every service.
    ///
    /// # Errors
    ///
    /// If the embedded definition cannot be parsed, an error is returned.
    pub fn builtin() -> Result<Self, MappingError> {
        Self::from_json_str(DEFAULT_MAPPING)
    }

    /// Parses a mapping from a JSON definition.
    ///
    /// # Errors
    ///
    /// If the definition is not valid JSON, or does not follow the format described on [`DimensionMapping`], an error
    /// is returned.
    pub fn from_json_str(definition: &str) -> Result<Self, MappingError> {
        Ok(serde_json::from_str(definition)?)
    }

    /// Loads a mapping from a JSON definition file.
    ///
    /// # Errors
    ///
    /// If the file cannot be read, or its contents cannot be parsed, an error is returned.
    pub fn from_path<P>(path: P) -> Result<Self, MappingError>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let definition = fs::read_to_string(path)
            .map_err(|source| MappingError::Io { path: path.to_path_buf(), source })?;
        Self::from_json_str(&definition)
    }

    /// Adds a mapping for the given service and metric, replacing any existing one.
    ///
    /// Use [`ANY_SERVICE`] as the service to match every service.
    #[must_use]
    pub fn with_metric<S, M>(mut self, service: S, metric: M, mapping: MetricMapping) -> Self
    where
        S: Into<String>,
        M: Into<String>,
    {
        self.services.entry(service.into()).or_default().insert(metric.into(), mapping);
        self
    }

    /// Looks up the mapping for the given service and metric.
    ///
    /// An entry for the exact service takes precedence over an [`ANY_SERVICE`] entry.
    pub fn get(&self, service: &str, metric: &str) -> Option<&MetricMapping> {
        self.services
            .get(service)
            .and_then(|metrics| metrics.get(metric))
            .or_else(|| self.services.get(ANY_SERVICE).and_then(|metrics| metrics.get(metric)))
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.services.values().map(HashMap::len).sum()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
