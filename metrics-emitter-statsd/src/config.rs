use std::path::PathBuf;

use serde::Deserialize;

use crate::handler::DEFAULT_ERROR_LOG_INTERVAL;

pub(crate) const DEFAULT_SEPARATOR: &str = ".";
pub(crate) const DEFAULT_REPLACEMENT: &str = "_";
pub(crate) const DEFAULT_MAX_PAYLOAD_LEN: usize = 1432;
pub(crate) const DEFAULT_QUEUE_CAPACITY: usize = 4096;

/// Emitter configuration, as read from a host's configuration file.
///
/// Keys are camel-cased, and everything other than `hostname` and `port` is optional:
///
/// ```
/// # use metrics_emitter_statsd::StatsdEmitterConfig;
/// let config: StatsdEmitterConfig = serde_json::from_str(
///     r#"{ "hostname": "localhost", "port": 8125, "prefix": "druid", "includeHost": true }"#,
/// )
/// .expect("valid configuration");
///
/// assert_eq!(config.separator, ".");
/// assert_eq!(config.replacement_char, "_");
/// ```
///
/// Use [`StatsdEmitterBuilder::from_config`][crate::StatsdEmitterBuilder::from_config] to turn it into an emitter.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StatsdEmitterConfig {
    /// StatsD server hostname.
    pub hostname: String,

    /// StatsD server port.
    pub port: u16,

    /// Prefix written in front of every metric name.
    ///
    /// Defaults to no prefix.
    #[serde(default)]
    pub prefix: String,

    /// String used to join name segments.
    ///
    /// Defaults to `.`.
    #[serde(default = "default_separator")]
    pub separator: String,

    /// String substituted for `.` and `:` inside a name segment.
    ///
    /// Defaults to `_`.
    #[serde(default = "default_replacement")]
    pub replacement_char: String,

    /// Whether the host that produced an event is the first segment of its metric name.
    ///
    /// Defaults to `false`.
    #[serde(default)]
    pub include_host: bool,

    /// Path to a dimension mapping definition.
    ///
    /// Defaults to the mapping that ships with this crate.
    #[serde(default)]
    pub dimension_map_path: Option<PathBuf>,

    /// Maximum length of a single UDP payload, in bytes.
    ///
    /// Defaults to 1432 bytes.
    #[serde(default = "default_max_payload_len")]
    pub max_payload_length: usize,

    /// Number of metrics that can be queued for sending before metrics are dropped.
    ///
    /// Defaults to 4096.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Number of send errors between two logged send errors.
    ///
    /// Defaults to 1000.
    #[serde(default = "default_error_log_interval")]
    pub error_log_interval: u64,

    /// Whether to report the emitter's own telemetry through the `metrics` crate.
    ///
    /// Defaults to `true`.
    #[serde(default = "default_telemetry")]
    pub telemetry: bool,
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_replacement() -> String {
    DEFAULT_REPLACEMENT.to_string()
}

const fn default_max_payload_len() -> usize {
    DEFAULT_MAX_PAYLOAD_LEN
}

const fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

const fn default_error_log_interval() -> u64 {
    DEFAULT_ERROR_LOG_INTERVAL
}

const fn default_telemetry() -> bool {
    true
}
