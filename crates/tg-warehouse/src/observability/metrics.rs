use super::GLOBAL_LABELS;
use crate::config::from_env_or_panic;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use serde::Deserialize;

pub(crate) const WAREHOUSE_ROWS_WRITTEN_TOTAL: &str = "warehouse_rows_written_total";
pub(crate) const WAREHOUSE_WRITE_DURATION_SECONDS: &str = "warehouse_write_duration_seconds";
pub(crate) const INGEST_FILES_SKIPPED_TOTAL: &str = "ingest_files_skipped_total";
pub(crate) const INGEST_RECORDS_SKIPPED_TOTAL: &str = "ingest_records_skipped_total";

/// Bulk loads take much longer than regular queries, so the buckets are wider
const WRITE_DURATION_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0];

#[derive(Deserialize)]
struct MetricsConfig {
    #[serde(default)]
    metrics_port: Option<u16>,
}

/// Describes the metrics of the crate and starts a Prometheus scrape endpoint
/// if `METRICS_PORT` is set. Without it the metrics are recorded into a no-op
/// recorder.
pub fn init_metrics() {
    let config: MetricsConfig = from_env_or_panic("");

    let Some(port) = config.metrics_port else {
        return;
    };

    let mut builder = PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .set_buckets_for_metric(
            Matcher::Full(WAREHOUSE_WRITE_DURATION_SECONDS.to_owned()),
            WRITE_DURATION_BUCKETS,
        )
        .unwrap_or_else(|err| panic!("BUG: invalid histogram buckets: {err:?}"));

    for (key, value) in GLOBAL_LABELS {
        builder = builder.add_global_label(*key, *value);
    }

    builder
        .install()
        .unwrap_or_else(|err| panic!("BUG: failed to initialize the metrics listener: {err:?}"));

    describe_metrics();
}

fn describe_metrics() {
    metrics::describe_counter!(
        WAREHOUSE_ROWS_WRITTEN_TOTAL,
        "Number of rows inserted into warehouse tables"
    );
    metrics::describe_histogram!(
        WAREHOUSE_WRITE_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Duration of a full refresh of a warehouse table, including the schema check"
    );
    metrics::describe_counter!(
        INGEST_FILES_SKIPPED_TOTAL,
        "Number of input files that were skipped because they couldn't be decoded"
    );
    metrics::describe_counter!(
        INGEST_RECORDS_SKIPPED_TOTAL,
        "Number of input records that were skipped because they lack required fields"
    );
}
