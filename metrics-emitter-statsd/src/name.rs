/// Characters replaced inside a single name segment.
const SEGMENT_RESERVED: [char; 2] = ['.', ':'];

/// Hierarchy separator used in metric names by event sources, e.g. `query/time`.
const SOURCE_SEPARATOR: char = '/';

/// Characters that delimit fields (`name:value|type`) and lines in the wire protocol.
const WIRE_RESERVED: [char; 3] = [':', '|', '\n'];

/// Builds a flat, wire-safe StatsD metric name out of individual segments.
///
/// Each segment is escaped as it is added: any `.` or `:` inside a segment is replaced with the replacement string, so
/// that a segment can never introduce an extra level of hierarchy. When the name is built, the segments are joined
/// with the separator, and then two passes run over the joined name: `/` is rewritten to the separator, and the wire
/// protocol's reserved characters (`:`, `|`, and newlines) are rewritten to the separator.
///
/// ```
/// # use metrics_emitter_statsd::NameBuilder;
/// let mut builder = NameBuilder::new(".", "_");
/// builder.add("query").add("time").add("wiki:news");
/// assert_eq!(builder.build(), "query.time.wiki_news");
/// ```
#[derive(Clone, Debug)]
pub struct NameBuilder<'a> {
    separator: &'a str,
    replacement: &'a str,
    parts: Vec<String>,
}

impl<'a> NameBuilder<'a> {
    /// Creates an empty `NameBuilder`.
    pub fn new(separator: &'a str, replacement: &'a str) -> Self {
        Self { separator, replacement, parts: Vec::new() }
    }

    /// Appends a segment, escaping `.` and `:` within it.
    pub fn add(&mut self, part: &str) -> &mut Self {
        self.parts.push(part.replace(SEGMENT_RESERVED, self.replacement));
        self
    }

    /// Returns the escaped segments added so far.
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Consumes the builder, returning the final name.
    pub fn build(self) -> String {
        self.parts
            .join(self.separator)
            .replace(SOURCE_SEPARATOR, self.separator)
            .replace(WIRE_RESERVED, self.separator)
    }
}

#[cfg(test)]
mod tests {
    use proptest::{collection::vec as arb_vec, prelude::*, proptest};

    use super::NameBuilder;

    fn build_from(separator: &str, replacement: &str, parts: &[&str]) -> String {
        let mut builder = NameBuilder::new(separator, replacement);
        for part in parts {
            builder.add(part);
        }
        builder.build()
    }

    #[test]
    fn basic() {
        // Cases are defined as: separator, replacement, segments, expected name.
        let cases = [
            (".", "_", &["query", "time", "wiki"][..], "query.time.wiki"),
            (".", "_", &["query", "time", "wiki:news"][..], "query.time.wiki_news"),
            (".", "_", &["node1", "query", "time"][..], "node1.query.time"),
            (".", "_", &["10.0.0.1:8080", "jvm"][..], "10_0_0_1_8080.jvm"),
            (".", "_", &["druid/broker", "query/time"][..], "druid.broker.query.time"),
            (".", "_", &["query", "a|b"][..], "query.a.b"),
            (".", "_", &["query", "line\nbreak"][..], "query.line.break"),
            ("_", "-", &["query", "time", "wiki.en"][..], "query_time_wiki-en"),
            (".", "", &["a.b", "c"][..], "ab.c"),
            (".", "_", &[][..], ""),
            (".", "_", &["", "time"][..], ".time"),
        ];

        for (separator, replacement, parts, expected) in cases {
            assert_eq!(build_from(separator, replacement, parts), expected);
        }
    }

    #[test]
    fn reserved_characters_in_configuration_are_normalized() {
        // A separator or replacement containing wire-reserved characters is rewritten by the final pass, since it
        // runs after joining.
        assert_eq!(build_from(".", ":", &["a.b", "c"]), "a.b.c");
        assert_eq!(build_from(".", "|", &["a.b"]), "a.b");
    }

    #[test]
    fn parts_are_escaped_on_add() {
        let mut builder = NameBuilder::new(".", "_");
        builder.add("query").add("wiki:news.en");
        assert_eq!(builder.parts(), ["query".to_string(), "wiki_news_en".to_string()]);
    }

    #[test]
    fn clones_build_identically() {
        let mut builder = NameBuilder::new(".", "_");
        builder.add("query").add("time/avg").add("wiki:news");

        let copy = builder.clone();
        assert_eq!(builder.build(), copy.build());
    }

    proptest! {
        #[test]
        fn no_reserved_characters_survive(parts in arb_vec("[a-z0-9./:|\n]{0,12}", 0..6)) {
            let parts = parts.iter().map(String::as_str).collect::<Vec<_>>();
            let name = build_from(".", "_", &parts);

            prop_assert!(!name.contains('/'));
            prop_assert!(!name.contains(':'));
            prop_assert!(!name.contains('|'));
            prop_assert!(!name.contains('\n'));
        }

        #[test]
        fn segment_escaping_is_positional(parts in arb_vec("[a-z0-9.:]{1,12}", 1..6)) {
            let refs = parts.iter().map(String::as_str).collect::<Vec<_>>();
            let name = build_from("+", "_", &refs);

            // With a separator that never appears in a segment, splitting the name recovers each escaped segment at
            // the position it was added.
            let segments = name.split('+').collect::<Vec<_>>();
            prop_assert_eq!(segments.len(), parts.len());
            for (segment, part) in segments.iter().zip(parts.iter()) {
                prop_assert_eq!(*segment, part.replace(['.', ':'], "_"));
            }
        }

        #[test]
        fn build_is_repeatable(parts in arb_vec("[a-z./:|]{0,8}", 0..6)) {
            let mut builder = NameBuilder::new(".", "_");
            for part in &parts {
                builder.add(part);
            }

            let copy = builder.clone();
            prop_assert_eq!(builder.build(), copy.build());
        }
    }
}
