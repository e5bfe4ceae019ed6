use std::{thread, time::Duration};

use metrics_emitter_statsd::{
    AlertEvent, AlertSeverity, Emitter, MetricEvent, StatsdEmitterBuilder, StatsdEmitterConfig,
};

fn main() {
    tracing_subscriber::fmt::init();

    let config: StatsdEmitterConfig = serde_json::from_str(
        r#"{ "hostname": "localhost", "port": 9125, "prefix": "druid", "includeHost": true }"#,
    )
    .expect("failed to parse configuration");

    let emitter = StatsdEmitterBuilder::from_config(&config)
        .expect("failed to resolve StatsD address")
        .build()
        .expect("failed to build StatsD emitter");

    emitter.start();

    // Not part of any mapping, so logged and dropped.
    emitter.emit(&MetricEvent::new("node1:8082", "druid/broker", "query/unknown", 1.0).into());

    // Ignored.
    emitter.emit(&AlertEvent::new("node1:8082", "druid/broker", AlertSeverity::Anomaly, "slow queries").into());

    // Pretend to serve queries.
    for i in 0..100_u32 {
        let data_source = if i % 3 == 0 { "wikipedia" } else { "twitter.stream" };

        let time = MetricEvent::new("node1:8082", "druid/broker", "query/time", f64::from(i % 17) * 12.5)
            .with_dimension("dataSource", data_source)
            .with_dimension("type", "timeseries");
        emitter.emit(&time.into());

        let pending = MetricEvent::new("node1:8082", "druid/historical", "segment/scan/pending", f64::from(i % 5));
        emitter.emit(&pending.into());

        thread::sleep(Duration::from_millis(50));
    }

    emitter.flush();
    emitter.close();
}
