use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::PgPool;

mod common;
use common::utils::fresh_database;
use hr_telemetry_backend::config::settings::IngestionSettings;
use hr_telemetry_backend::db::{PgRecordStore, RecordStore};
use hr_telemetry_backend::services::ingestion::{DataIngestion, IngestionError};
use hr_telemetry_backend::services::metrics::PrometheusMetrics;

const TWO_DAY_EXPORT: &str = r#"[
  {
    "heart_rate_day": [{
      "activities-heart": [{
        "dateTime": "2024-12-01",
        "value": {
          "restingHeartRate": 58,
          "heartRateZones": [
            {"name": "Out of Range", "min": 30, "max": 100, "minutes": 1300, "caloriesOut": 1800.5},
            {"name": "Fat Burn", "min": 100, "max": 140, "minutes": 120, "caloriesOut": 400.0}
          ]
        }
      }],
      "activities-heart-intraday": {
        "dataset": [
          {"time": "00:00:00", "value": 61},
          {"time": "00:01:00", "value": 63}
        ],
        "datasetInterval": 1,
        "datasetType": "minute"
      }
    }]
  },
  {
    "heart_rate_day": [{
      "activities-heart": [{
        "dateTime": "2024-12-02",
        "value": {
          "restingHeartRate": 60,
          "heartRateZones": [
            {"name": "Fat Burn", "min": 100, "max": 140, "minutes": 80, "caloriesOut": 200.0}
          ]
        }
      }],
      "activities-heart-intraday": {
        "dataset": [
          {"time": "12:00:00", "value": 90}
        ],
        "datasetInterval": 1,
        "datasetType": "minute"
      }
    }]
  }
]"#;

const BROKEN_DAY_EXPORT: &str = r#"[
  {
    "heart_rate_day": [{
      "activities-heart": [{
        "dateTime": "2024-12-01",
        "value": {"restingHeartRate": 58, "heartRateZones": []}
      }],
      "activities-heart-intraday": {
        "dataset": [
          {"time": "00:00:00", "value": 61},
          {"time": "25:00:00", "value": 63}
        ],
        "datasetInterval": 1,
        "datasetType": "minute"
      }
    }]
  }
]"#;

fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

fn settings_with_export(export: &str) -> IngestionSettings {
    let root = std::env::temp_dir().join(format!("hr-ingest-test-{}", uuid::Uuid::new_v4()));
    let data_dir = root.join("data");
    std::fs::create_dir_all(&data_dir).expect("Failed to create data dir.");
    std::fs::write(data_dir.join("hr.json"), export).expect("Failed to write export.");

    IngestionSettings {
        data_dir,
        state_file: root.join("last_run.json"),
        log_dir: root.join("logs"),
        simulation_start: jan(1),
        participant_id: 1,
        schedule: "0 0 0 * * *".to_string(),
        metrics_port: 0,
    }
}

async fn count(pool: &PgPool, sql: &str) -> i64 {
    sqlx::query_scalar::<_, i64>(sql)
        .fetch_one(pool)
        .await
        .expect("Failed to count rows.")
}

#[tokio::test]
async fn ingesting_the_same_day_twice_is_idempotent() {
    let pool = fresh_database().await;
    let metrics = Arc::new(PrometheusMetrics::new().expect("Failed to build the metrics registry"));
    let ingestion = DataIngestion::new(pool.clone(), settings_with_export(TWO_DAY_EXPORT), metrics.clone());

    let reports = ingestion.ingest(1).await.expect("First ingestion failed.");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].date, jan(1));
    assert_eq!(reports[0].data_points, 2);

    ingestion.reset().expect("Failed to reset simulation.");
    ingestion.ingest(1).await.expect("Second ingestion failed.");

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM raw_data").await, 2);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM daily_summaries").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM heart_rate_zones").await, 2);
    assert_eq!(ingestion.status().unwrap().current_day, 1);

    let text = metrics.render();
    assert!(text.contains(r#"ingestion_runs_total{status="success"} 2"#));
    assert!(text.contains("data_points_processed_total 4"));
    assert!(text.contains("ingestion_duration_seconds_count 2"));
    assert!(text.contains("active_database_connections"));
}

#[tokio::test]
async fn ingested_days_feed_participant_summaries() {
    let pool = fresh_database().await;
    let metrics = Arc::new(PrometheusMetrics::new().expect("Failed to build the metrics registry"));
    let ingestion = DataIngestion::new(pool.clone(), settings_with_export(TWO_DAY_EXPORT), metrics);

    let reports = ingestion.ingest(5).await.expect("Ingestion failed.");
    // The export only holds two days
    assert_eq!(reports.len(), 2);
    assert_eq!(ingestion.status().unwrap().current_day, 2);

    let store = PgRecordStore::new(pool);
    let summary = store.heart_rate_summary(1, jan(1), jan(2)).await.unwrap();
    assert_eq!(summary.total_points, 3);
    assert_eq!(summary.min_hr, Some(61.0));
    assert_eq!(summary.max_hr, Some(90.0));

    let daily = store.daily_summaries(1, jan(1), jan(2)).await.unwrap();
    assert_eq!(daily.len(), 2);
    assert_eq!(daily[1].resting_heart_rate, Some(60));

    let zones = store.zone_averages(1, jan(1), jan(2)).await.unwrap();
    assert_eq!(zones.len(), 2);
    assert_eq!(zones[0].zone_name, "Out of Range");
    assert_eq!(zones[1].zone_name, "Fat Burn");
    assert_eq!(zones[1].avg_minutes, 100.0);
    assert_eq!(zones[1].avg_calories, Some(300.0));
}

#[tokio::test]
async fn invalid_sample_rolls_back_the_whole_day() {
    let pool = fresh_database().await;
    let metrics = Arc::new(PrometheusMetrics::new().expect("Failed to build the metrics registry"));
    let ingestion = DataIngestion::new(pool.clone(), settings_with_export(BROKEN_DAY_EXPORT), metrics.clone());

    let err = ingestion.ingest(1).await.unwrap_err();
    assert!(matches!(err, IngestionError::InvalidRecord(_)));

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM raw_data").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM daily_summaries").await, 0);
    assert_eq!(ingestion.status().unwrap().current_day, 0);

    let text = metrics.render();
    assert!(text.contains(r#"ingestion_runs_total{status="error"} 1"#));
    assert!(text.contains(r#"ingestion_errors_total{error_type="invalid_record"} 1"#));
}
