use std::sync::Arc;

use crate::{
    event::Dimensions,
    mapping::{DimensionMapping, MetricType},
    name::NameBuilder,
};

/// Folds the dimensions of a metric event into its name, as directed by a [`DimensionMapping`].
#[derive(Clone, Debug)]
pub struct DimensionConverter {
    mapping: Arc<DimensionMapping>,
}

impl DimensionConverter {
    /// Creates a new `DimensionConverter` over the given mapping.
    pub fn new(mapping: Arc<DimensionMapping>) -> Self {
        Self { mapping }
    }

    /// Returns a reference to the underlying mapping.
    pub fn mapping(&self) -> &DimensionMapping {
        &self.mapping
    }

    /// Appends the mapped dimensions of a metric to `builder` and returns the metric's type.
    ///
    /// Dimensions are appended in the order configured for the metric. Configured dimensions that are missing from
    /// `dimensions` are skipped.
    ///
    /// If the metric has no mapping, `None` is returned and `builder` is left untouched.
    pub fn resolve(
        &self,
        service: &str,
        metric: &str,
        dimensions: &Dimensions,
        builder: &mut NameBuilder<'_>,
    ) -> Option<MetricType> {
        let mapping = self.mapping.get(service, metric)?;

        for key in mapping.dimensions() {
            if let Some(value) = dimensions.get(key) {
                builder.add(&value.to_segment());
            }
        }

        Some(mapping.metric_type())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::{prelude::*, proptest, sample::subsequence};

    use super::DimensionConverter;
    use crate::{
        event::{DimensionValue, Dimensions},
        mapping::{DimensionMapping, MetricMapping, MetricType},
        name::NameBuilder,
    };

    const KEYS: [&str; 5] = ["dataSource", "type", "server", "tier", "priority"];

    fn converter() -> DimensionConverter {
        let mapping = DimensionMapping::new()
            .with_metric("query", "time", MetricMapping::new(MetricType::Timer, ["dataSource"]))
            .with_metric("query", "bytes", MetricMapping::new(MetricType::Count, ["dataSource", "type"]))
            .with_metric("coordinator", "segment/used", MetricMapping::new(MetricType::Gauge, KEYS));
        DimensionConverter::new(Arc::new(mapping))
    }

    fn dims(pairs: &[(&str, &str)]) -> Dimensions {
        pairs.iter().map(|(k, v)| ((*k).to_string(), DimensionValue::from(*v))).collect()
    }

    #[test]
    fn scenario_query_time() {
        let converter = converter();
        let mut builder = NameBuilder::new(".", "_");
        builder.add("query").add("time");

        let metric_type = converter.resolve("query", "time", &dims(&[("dataSource", "wiki")]), &mut builder);
        assert_eq!(metric_type, Some(MetricType::Timer));
        assert_eq!(builder.build(), "query.time.wiki");
    }

    #[test]
    fn escapes_dimension_values() {
        let converter = converter();
        let mut builder = NameBuilder::new(".", "_");
        builder.add("query").add("time");

        converter.resolve("query", "time", &dims(&[("dataSource", "wiki:news")]), &mut builder);
        assert_eq!(builder.parts().last().map(String::as_str), Some("wiki_news"));
    }

    #[test]
    fn unmapped_leaves_builder_untouched() {
        let converter = converter();
        let mut builder = NameBuilder::new(".", "_");
        builder.add("query").add("cpu");

        let metric_type = converter.resolve("query", "cpu", &dims(&[("dataSource", "wiki")]), &mut builder);
        assert_eq!(metric_type, None);
        assert_eq!(builder.parts(), ["query", "cpu"]);
    }

    #[test]
    fn missing_dimensions_are_skipped() {
        let converter = converter();
        let mut builder = NameBuilder::new(".", "_");

        // Unmapped dimensions are ignored as well.
        let metric_type =
            converter.resolve("query", "bytes", &dims(&[("type", "topN"), ("id", "abc")]), &mut builder);
        assert_eq!(metric_type, Some(MetricType::Count));
        assert_eq!(builder.parts(), ["topN"]);
    }

    #[test]
    fn non_string_values() {
        let converter = converter();
        let mut builder = NameBuilder::new(".", "_");

        let mut dimensions = Dimensions::new();
        dimensions.insert("dataSource".to_string(), DimensionValue::from(vec!["wiki", "news"]));
        dimensions.insert("priority".to_string(), DimensionValue::from(0i64));
        dimensions.insert("tier".to_string(), DimensionValue::from(0.5));

        converter.resolve("coordinator", "segment/used", &dimensions, &mut builder);
        assert_eq!(builder.parts(), ["wiki,news", "0_5", "0"]);
    }

    proptest! {
        #[test]
        fn dimension_order_follows_mapping(present in subsequence(KEYS.to_vec(), 0..=KEYS.len()), seed in any::<u64>()) {
            let converter = converter();

            // Insert the dimensions in a shuffled order, so that the map's iteration order varies between runs.
            let mut shuffled = present.clone();
            let len = shuffled.len();
            if len > 1 {
                for i in 0..len {
                    let j = (seed.rotate_left(i as u32) as usize) % len;
                    shuffled.swap(i, j);
                }
            }
            let dimensions = shuffled
                .iter()
                .map(|k| ((*k).to_string(), DimensionValue::from(format!("{k}-value"))))
                .collect::<Dimensions>();

            let mut builder = NameBuilder::new(".", "_");
            let metric_type = converter.resolve("coordinator", "segment/used", &dimensions, &mut builder);
            prop_assert_eq!(metric_type, Some(MetricType::Gauge));

            let expected = KEYS
                .iter()
                .filter(|k| present.contains(k))
                .map(|k| format!("{k}-value"))
                .collect::<Vec<_>>();
            prop_assert_eq!(builder.parts(), &expected[..]);
        }

        #[test]
        fn unmapped_pairs_never_touch_builder(service in "[a-z]{1,8}", metric in "[a-z/]{1,12}") {
            let converter = converter();
            prop_assume!(converter.mapping().get(&service, &metric).is_none());

            let mut builder = NameBuilder::new(".", "_");
            builder.add(&service);
            let before = builder.parts().to_vec();

            let dimensions = KEYS.iter().map(|k| ((*k).to_string(), DimensionValue::from("v"))).collect::<Dimensions>();
            prop_assert_eq!(converter.resolve(&service, &metric, &dimensions, &mut builder), None);
            prop_assert_eq!(builder.parts(), &before[..]);
        }
    }
}
