use reqwest::Client;
use serde_json::{json, Value};

mod common;
use common::utils::{jan_first_at, spawn_app_with_store, ten_minute_store};

#[tokio::test]
async fn stats_counts_rows_per_granularity() {
    let store = ten_minute_store();
    // A second hour and a second participant
    store.insert(1, jan_first_at(90), 75.0);
    store.insert(3, jan_first_at(5), 65.0);
    let test_app = spawn_app_with_store(store).await;
    let client = Client::new();

    let response = client
        .get(&format!("{}/data/stats", &test_app.address))
        .query(&[
            ("start_date", "2024-01-01"),
            ("end_date", "2024-01-01"),
            ("participant_ids", "1"),
            ("participant_ids", "3"),
        ])
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["query_span_days"], 0);
    assert_eq!(body["recommended_aggregation"], "raw");
    assert_eq!(body["data_counts"], json!({
        "raw": 12,
        "1m": 12,
        "1h": 3,
        "1d": 2
    }));
    assert_eq!(body["participant_ids"], json!([1, 3]));
}

#[tokio::test]
async fn stats_recommends_coarser_levels_for_long_ranges() {
    let test_app = spawn_app_with_store(ten_minute_store()).await;
    let client = Client::new();

    for (end_date, expected) in [("2024-01-08", "raw"), ("2024-01-09", "1m"), ("2024-02-01", "1h"), ("2025-01-01", "1d")] {
        let body: Value = client
            .get(&format!("{}/data/stats", &test_app.address))
            .query(&[("start_date", "2024-01-01"), ("end_date", end_date), ("participant_ids", "1")])
            .send()
            .await
            .expect("Failed to execute request.")
            .json()
            .await
            .unwrap();
        assert_eq!(body["recommended_aggregation"], expected, "end date {}", end_date);
    }
}

#[tokio::test]
async fn stats_rejects_reversed_range() {
    let test_app = spawn_app_with_store(ten_minute_store()).await;
    let client = Client::new();

    let response = client
        .get(&format!("{}/data/stats", &test_app.address))
        .query(&[("start_date", "2024-02-01"), ("end_date", "2024-01-01"), ("participant_ids", "1")])
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn impute_counts_missing_minute_slots() {
    let test_app = spawn_app_with_store(ten_minute_store()).await;
    let client = Client::new();

    let response = client
        .get(&format!("{}/data/impute", &test_app.address))
        .query(&[("start_date", "2024-01-01"), ("end_date", "2024-01-01"), ("user_ids", "1,2")])
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["expected_slots_per_participant"], 1440);
    assert_eq!(body["participants"], json!([
        {"participant_id": 1, "observed_points": 10, "missing_slots": 1430},
        {"participant_id": 2, "observed_points": 0, "missing_slots": 1440}
    ]));
    assert_eq!(body["total_missing_slots"], 2870);
}
