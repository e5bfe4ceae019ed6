use std::{borrow::Cow, collections::HashMap, fmt};

/// Dimensions attached to a metric event, keyed by dimension name.
pub type Dimensions = HashMap<String, DimensionValue>;

/// An event handed to an emitter.
///
/// Only [`Event::Metric`] carries anything a StatsD emitter can send. Other variants exist so that hosts can route a
/// single event stream through every configured emitter, and are ignored by emitters that don't understand them.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A single observed measurement.
    Metric(MetricEvent),

    /// An alert raised by a service.
    Alert(AlertEvent),
}

impl From<MetricEvent> for Event {
    fn from(event: MetricEvent) -> Self {
        Event::Metric(event)
    }
}

impl From<AlertEvent> for Event {
    fn from(event: AlertEvent) -> Self {
        Event::Alert(event)
    }
}

/// A measurement of one metric, emitted by one service running on one host.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricEvent {
    host: String,
    service: String,
    metric: String,
    value: f64,
    dimensions: Dimensions,
}

impl MetricEvent {
    /// Creates a new `MetricEvent` with no dimensions.
    pub fn new<H, S, M>(host: H, service: S, metric: M, value: f64) -> Self
    where
        H: Into<String>,
        S: Into<String>,
        M: Into<String>,
    {
        Self {
            host: host.into(),
            service: service.into(),
            metric: metric.into(),
            value,
            dimensions: Dimensions::new(),
        }
    }

    /// Attaches a dimension to the event, replacing any existing value for the same key.
    #[must_use]
    pub fn with_dimension<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<DimensionValue>,
    {
        self.dimensions.insert(key.into(), value.into());
        self
    }

    /// Replaces all dimensions of the event.
    #[must_use]
    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    /// Host that produced the event.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Service that produced the event.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Metric name, such as `query/time`.
    pub fn metric(&self) -> &str {
        &self.metric
    }

    /// Observed value.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Dimensions attached to the event.
    pub fn dimensions(&self) -> &Dimensions {
        &self.dimensions
    }
}

/// Severity of an [`AlertEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertSeverity {
    /// Something looks wrong but the service is working.
    Anomaly,

    /// A component of the service failed.
    ComponentFailure,

    /// The service as a whole failed.
    ServiceFailure,
}

/// An alert raised by a service.
#[derive(Clone, Debug, PartialEq)]
pub struct AlertEvent {
    host: String,
    service: String,
    severity: AlertSeverity,
    description: String,
}

impl AlertEvent {
    /// Creates a new `AlertEvent`.
    pub fn new<H, S, D>(host: H, service: S, severity: AlertSeverity, description: D) -> Self
    where
        H: Into<String>,
        S: Into<String>,
        D: Into<String>,
    {
        Self { host: host.into(), service: service.into(), severity, description: description.into() }
    }

    /// Host that raised the alert.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Service that raised the alert.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Alert severity.
    pub fn severity(&self) -> AlertSeverity {
        self.severity
    }

    /// Human-readable description.
    pub fn description(&self) -> &str {
        &self.description
    }
}

/// Value of a single dimension.
#[derive(Clone, Debug, PartialEq)]
pub enum DimensionValue {
    /// A string value.
    String(String),

    /// A signed integer value.
    Integer(i64),

    /// A floating-point value.
    Float(f64),

    /// A boolean value.
    Boolean(bool),

    /// A multi-valued dimension.
    List(Vec<DimensionValue>),
}

impl DimensionValue {
    /// Renders the value as a single name segment.
    ///
    /// Rendering never fails: floats use their shortest round-trip representation and lists are rendered as their
    /// elements joined by `,`. Escaping is left to the name builder.
    pub fn to_segment(&self) -> Cow<'_, str> {
        match self {
            DimensionValue::String(s) => Cow::Borrowed(s.as_str()),
            DimensionValue::Integer(i) => Cow::Owned(itoa::Buffer::new().format(*i).to_owned()),
            DimensionValue::Float(f) => Cow::Owned(ryu::Buffer::new().format(*f).to_owned()),
            DimensionValue::Boolean(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            DimensionValue::List(values) => {
                let mut rendered = String::new();
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        rendered.push(',');
                    }
                    rendered.push_str(&value.to_segment());
                }
                Cow::Owned(rendered)
            }
        }
    }
}

impl fmt::Display for DimensionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_segment())
    }
}

impl From<&str> for DimensionValue {
    fn from(value: &str) -> Self {
        DimensionValue::String(value.to_owned())
    }
}

impl From<String> for DimensionValue {
    fn from(value: String) -> Self {
        DimensionValue::String(value)
    }
}

impl From<i64> for DimensionValue {
    fn from(value: i64) -> Self {
        DimensionValue::Integer(value)
    }
}

impl From<f64> for DimensionValue {
    fn from(value: f64) -> Self {
        DimensionValue::Float(value)
    }
}

impl From<bool> for DimensionValue {
    fn from(value: bool) -> Self {
        DimensionValue::Boolean(value)
    }
}

impl<T> From<Vec<T>> for DimensionValue
where
    T: Into<DimensionValue>,
{
    fn from(values: Vec<T>) -> Self {
        DimensionValue::List(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{DimensionValue, Event, MetricEvent};

    #[test]
    fn segments() {
        // Cases are defined as: dimension value, expected segment.
        let cases = [
            (DimensionValue::from("wiki"), "wiki"),
            (DimensionValue::from(-17i64), "-17"),
            (DimensionValue::from(1.0), "1.0"),
            (DimensionValue::from(0.25), "0.25"),
            (DimensionValue::from(true), "true"),
            (DimensionValue::from(vec!["a", "b", "c"]), "a,b,c"),
            (DimensionValue::List(vec![]), ""),
            (
                DimensionValue::List(vec![DimensionValue::from("x"), DimensionValue::from(2i64)]),
                "x,2",
            ),
        ];

        for (value, expected) in cases {
            assert_eq!(value.to_segment(), expected);
            assert_eq!(value.to_string(), expected);
        }
    }

    #[test]
    fn builder_replaces_dimension() {
        let event = MetricEvent::new("h1", "query", "time", 42.0)
            .with_dimension("dataSource", "wiki")
            .with_dimension("dataSource", "news");

        assert_eq!(event.dimensions().len(), 1);
        assert_eq!(event.dimensions()["dataSource"], DimensionValue::from("news"));
    }

    #[test]
    fn metric_event_into_event() {
        let event: Event = MetricEvent::new("h1", "query", "time", 42.0).into();
        assert!(matches!(event, Event::Metric(ref m) if m.metric() == "time"));
    }
}
