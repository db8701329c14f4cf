use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgConnection;

use crate::models::ingestion::HeartRateZone;
use crate::models::metric_point::HEART_RATE_METRIC;

pub async fn upsert_daily_summary(
    conn: &mut PgConnection,
    participant_id: i32,
    date: NaiveDate,
    resting_heart_rate: Option<i32>,
    dataset_interval: i32,
    dataset_type: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO daily_summaries (participant_id, date, resting_heart_rate, dataset_interval, dataset_type)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (participant_id, date) DO UPDATE SET
            resting_heart_rate = EXCLUDED.resting_heart_rate,
            dataset_interval = EXCLUDED.dataset_interval,
            dataset_type = EXCLUDED.dataset_type
        "#,
    )
    .bind(participant_id)
    .bind(date)
    .bind(resting_heart_rate)
    .bind(dataset_interval)
    .bind(dataset_type)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn upsert_heart_rate_zone(
    conn: &mut PgConnection,
    participant_id: i32,
    date: NaiveDate,
    zone: &HeartRateZone,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO heart_rate_zones (participant_id, date, zone_name, min_heart_rate, max_heart_rate, minutes, calories_out)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (participant_id, date, zone_name) DO UPDATE SET
            min_heart_rate = EXCLUDED.min_heart_rate,
            max_heart_rate = EXCLUDED.max_heart_rate,
            minutes = EXCLUDED.minutes,
            calories_out = EXCLUDED.calories_out
        "#,
    )
    .bind(participant_id)
    .bind(date)
    .bind(&zone.name)
    .bind(zone.min)
    .bind(zone.max)
    .bind(zone.minutes)
    .bind(zone.calories_out)
    .execute(conn)
    .await?;

    Ok(())
}

pub async fn upsert_raw_point(
    conn: &mut PgConnection,
    participant_id: i32,
    timestamp: DateTime<Utc>,
    value: f64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO raw_data (participant_id, timestamp, metric_type, value)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (participant_id, timestamp, metric_type) DO UPDATE SET
            value = EXCLUDED.value
        "#,
    )
    .bind(participant_id)
    .bind(timestamp)
    .bind(HEART_RATE_METRIC)
    .bind(value)
    .execute(conn)
    .await?;

    Ok(())
}
