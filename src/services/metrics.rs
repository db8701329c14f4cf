use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
    with_local_recorder, Unit,
};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

use crate::models::granularity::Granularity;

/// Observability sink handed to the query engine, the HTTP handlers and the
/// ingestion job. Implementations must be cheap and must never fail.
pub trait MetricsReporter: Send + Sync {
    fn request_served(&self, endpoint: &'static str, status: u16);
    fn page_served(&self, granularity: Granularity, points: usize);
    fn ingestion_run(&self, status: &'static str);
    fn ingestion_duration(&self, seconds: f64);
    fn records_processed(&self, data_type: &'static str, count: u64);
    fn data_points_processed(&self, count: u64);
    fn ingestion_error(&self, error_type: &'static str);
    fn database_connections(&self, active: usize);
}

/// Reporter that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsReporter for NoopMetrics {
    fn request_served(&self, _endpoint: &'static str, _status: u16) {}
    fn page_served(&self, _granularity: Granularity, _points: usize) {}
    fn ingestion_run(&self, _status: &'static str) {}
    fn ingestion_duration(&self, _seconds: f64) {}
    fn records_processed(&self, _data_type: &'static str, _count: u64) {}
    fn data_points_processed(&self, _count: u64) {}
    fn ingestion_error(&self, _error_type: &'static str) {}
    fn database_connections(&self, _active: usize) {}
}

const INGESTION_DURATION: &str = "ingestion_duration_seconds";

const DURATION_BUCKETS: [f64; 14] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5, 10.0,
];

/// Reporter backed by its own Prometheus registry.
///
/// The recorder is never installed globally; every emit is scoped to it, so
/// each server or ingestion run owns an independent set of series.
pub struct PrometheusMetrics {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, BuildError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(INGESTION_DURATION.to_string()), &DURATION_BUCKETS)?
            .build_recorder();
        let handle = recorder.handle();

        with_local_recorder(&recorder, || {
            describe_counter!("api_requests_total", "Total API requests");
            describe_counter!(
                "data_points_served_total",
                "Total data points returned by range queries"
            );
            describe_counter!("ingestion_runs_total", "Total ingestion runs");
            describe_histogram!(INGESTION_DURATION, Unit::Seconds, "Ingestion duration");
            describe_counter!("records_processed_total", "Total records processed");
            describe_counter!("data_points_processed_total", "Total data points processed");
            describe_counter!("ingestion_errors_total", "Total ingestion errors");
            describe_gauge!("active_database_connections", "Active database connections");
        });

        Ok(Self { recorder, handle })
    }

    /// Prometheus text exposition of every series recorded so far.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl MetricsReporter for PrometheusMetrics {
    fn request_served(&self, endpoint: &'static str, status: u16) {
        with_local_recorder(&self.recorder, || {
            counter!("api_requests_total", "endpoint" => endpoint, "status" => status.to_string())
                .increment(1);
        });
    }

    fn page_served(&self, granularity: Granularity, points: usize) {
        with_local_recorder(&self.recorder, || {
            counter!("data_points_served_total", "aggregation_level" => granularity.as_str())
                .increment(points as u64);
        });
    }

    fn ingestion_run(&self, status: &'static str) {
        with_local_recorder(&self.recorder, || {
            counter!("ingestion_runs_total", "status" => status).increment(1);
        });
    }

    fn ingestion_duration(&self, seconds: f64) {
        with_local_recorder(&self.recorder, || {
            histogram!(INGESTION_DURATION).record(seconds);
        });
    }

    fn records_processed(&self, data_type: &'static str, count: u64) {
        with_local_recorder(&self.recorder, || {
            counter!("records_processed_total", "data_type" => data_type).increment(count);
        });
    }

    fn data_points_processed(&self, count: u64) {
        with_local_recorder(&self.recorder, || {
            counter!("data_points_processed_total").increment(count);
        });
    }

    fn ingestion_error(&self, error_type: &'static str) {
        with_local_recorder(&self.recorder, || {
            counter!("ingestion_errors_total", "error_type" => error_type).increment(1);
        });
    }

    fn database_connections(&self, active: usize) {
        with_local_recorder(&self.recorder, || {
            gauge!("active_database_connections").set(active as f64);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> PrometheusMetrics {
        PrometheusMetrics::new().expect("Failed to build the metrics registry")
    }

    fn has_line(text: &str, expected: &str) -> bool {
        text.lines().any(|line| line == expected)
    }

    #[test]
    fn test_counters_accumulate_per_label_set() {
        let metrics = metrics();
        metrics.request_served("data", 200);
        metrics.request_served("data", 200);
        metrics.request_served("data", 400);
        metrics.page_served(Granularity::OneHour, 24);

        let text = metrics.render();
        assert!(text.contains("# TYPE api_requests_total counter"));
        assert!(has_line(&text, r#"api_requests_total{endpoint="data",status="200"} 2"#));
        assert!(has_line(&text, r#"api_requests_total{endpoint="data",status="400"} 1"#));
        assert!(has_line(&text, r#"data_points_served_total{aggregation_level="1h"} 24"#));
        assert!(!text.contains("ingestion_runs_total{"));
    }

    #[test]
    fn test_ingestion_series_cover_histogram_and_gauge() {
        let metrics = metrics();
        metrics.records_processed("raw_data", 1440);
        metrics.data_points_processed(1440);
        metrics.ingestion_duration(0.3);
        metrics.database_connections(2);

        let text = metrics.render();
        assert!(has_line(&text, r#"records_processed_total{data_type="raw_data"} 1440"#));
        assert!(has_line(&text, "data_points_processed_total 1440"));
        assert!(text.contains("# TYPE ingestion_duration_seconds histogram"));
        assert!(has_line(&text, r#"ingestion_duration_seconds_bucket{le="0.25"} 0"#));
        assert!(has_line(&text, r#"ingestion_duration_seconds_bucket{le="0.5"} 1"#));
        assert!(has_line(&text, "ingestion_duration_seconds_count 1"));
        assert!(text.contains("# TYPE active_database_connections gauge"));
        assert!(has_line(&text, "active_database_connections 2"));
        assert!(!text.contains("api_requests_total{"));
    }

    #[test]
    fn test_registries_are_independent() {
        let first = metrics();
        let second = metrics();
        first.ingestion_run("success");

        assert!(has_line(&first.render(), r#"ingestion_runs_total{status="success"} 1"#));
        assert!(!second.render().contains("ingestion_runs_total{"));
    }
}
