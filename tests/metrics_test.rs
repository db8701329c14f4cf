use std::net::TcpListener;
use std::sync::Arc;

use reqwest::Client;

use hr_telemetry_backend::run_metrics_exporter;
use hr_telemetry_backend::services::metrics::{MetricsReporter, PrometheusMetrics};

mod common;
use common::utils::{spawn_app_with_store, ten_minute_store};

#[tokio::test]
async fn metrics_expose_request_and_point_counters() {
    let test_app = spawn_app_with_store(ten_minute_store()).await;
    let client = Client::new();

    let response = client
        .get(&format!("{}/data", &test_app.address))
        .query(&[("start_date", "2024-01-01"), ("end_date", "2024-01-01"), ("user_ids", "1")])
        .send()
        .await
        .expect("Failed to execute request.");
    assert!(response.status().is_success());

    let response = client
        .get(&format!("{}/metrics", &test_app.address))
        .send()
        .await
        .expect("Failed to execute request.");
    assert!(response.status().is_success());

    let body = response.text().await.expect("Cannot read response body.");
    assert!(body.contains("# TYPE api_requests_total counter"));
    assert!(body.contains("api_requests_total{endpoint=\"data\",status=\"200\"} 1"));
    assert!(body.contains("data_points_served_total{aggregation_level=\"raw\"} 10"));
}

#[tokio::test]
async fn standalone_exporter_serves_ingestion_series() {
    let metrics = Arc::new(PrometheusMetrics::new().expect("Failed to build the metrics registry"));
    metrics.ingestion_run("success");
    metrics.ingestion_duration(1.2);
    metrics.database_connections(1);

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let server = run_metrics_exporter(listener, metrics).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    let body = Client::new()
        .get(&format!("http://127.0.0.1:{}/metrics", port))
        .send()
        .await
        .expect("Failed to execute request.")
        .text()
        .await
        .expect("Cannot read response body.");

    assert!(body.contains("ingestion_runs_total{status=\"success\"} 1"));
    assert!(body.contains("# TYPE ingestion_duration_seconds histogram"));
    assert!(body.contains("ingestion_duration_seconds_count 1"));
    assert!(body.contains("active_database_connections 1"));
}
