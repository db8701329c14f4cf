use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::db::record_store::{RangeScan, RecordStore};
use crate::errors::StoreError;
use crate::models::granularity::{Granularity, Projection};
use crate::models::metric_point::{AggregatePoint, DataPoint, MetricPoint, HEART_RATE_METRIC};
use crate::models::participant::{Participant, ParticipantCount};
use crate::models::summary::{
    DailySummary, DataOverview, HeartRateSummary, ParticipantActivity, ZoneAverage,
};

/// Postgres-backed store. Table and column names come only from the static
/// granularity table; every caller-supplied value is bound.
#[derive(Clone, Debug)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn columns(projection: Projection) -> &'static str {
    match projection {
        Projection::Raw => "participant_id, timestamp, metric_type, value",
        Projection::Aggregate => "participant_id, bucket, avg_value, min_value, max_value",
    }
}

pub(crate) fn scan_sql(scan: &RangeScan) -> String {
    let layout = scan.granularity.layout();
    let mut sql = format!(
        "SELECT {columns} FROM {table} \
         WHERE participant_id = ANY($1) \
         AND ({time} AT TIME ZONE 'UTC')::date BETWEEN $2 AND $3",
        columns = columns(layout.projection),
        table = layout.table,
        time = layout.time_column,
    );
    if layout.projection == Projection::Raw {
        sql.push_str(&format!(" AND metric_type = '{}'", HEART_RATE_METRIC));
    }
    if scan.from.is_some() {
        sql.push_str(&format!(" AND {} >= $5", layout.time_column));
    }
    sql.push_str(&format!(
        " ORDER BY {} ASC, participant_id ASC LIMIT $4",
        layout.time_column
    ));
    sql
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[tracing::instrument(
        name = "Scan granularity table",
        skip(self, scan),
        fields(
            granularity = %scan.granularity,
            participants = scan.participant_ids.len(),
            max_rows = scan.max_rows
        )
    )]
    async fn scan(&self, scan: &RangeScan) -> Result<Vec<DataPoint>, StoreError> {
        let sql = scan_sql(scan);
        // Released back to the pool when dropped, on every return path
        let mut conn = self.pool.acquire().await?;

        let rows = match scan.granularity.layout().projection {
            Projection::Raw => {
                let mut query = sqlx::query_as::<_, MetricPoint>(&sql)
                    .bind(&scan.participant_ids[..])
                    .bind(scan.start_date)
                    .bind(scan.end_date)
                    .bind(scan.max_rows);
                if let Some(from) = scan.from {
                    query = query.bind(from);
                }
                query
                    .fetch_all(&mut *conn)
                    .await?
                    .into_iter()
                    .map(DataPoint::Raw)
                    .collect()
            }
            Projection::Aggregate => {
                let mut query = sqlx::query_as::<_, AggregatePoint>(&sql)
                    .bind(&scan.participant_ids[..])
                    .bind(scan.start_date)
                    .bind(scan.end_date)
                    .bind(scan.max_rows);
                if let Some(from) = scan.from {
                    query = query.bind(from);
                }
                query
                    .fetch_all(&mut *conn)
                    .await?
                    .into_iter()
                    .map(DataPoint::Aggregate)
                    .collect()
            }
        };

        Ok(rows)
    }

    async fn count_records(
        &self,
        granularity: Granularity,
        participant_ids: &[i32],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ParticipantCount>, StoreError> {
        let layout = granularity.layout();
        let sql = format!(
            "SELECT participant_id, COUNT(*) AS count FROM {table} \
             WHERE participant_id = ANY($1) \
             AND ({time} AT TIME ZONE 'UTC')::date BETWEEN $2 AND $3 \
             GROUP BY participant_id ORDER BY participant_id",
            table = layout.table,
            time = layout.time_column,
        );

        let counts = sqlx::query_as::<_, ParticipantCount>(&sql)
            .bind(participant_ids)
            .bind(start_date)
            .bind(end_date)
            .fetch_all(&self.pool)
            .await?;

        Ok(counts)
    }

    async fn list_participants(&self) -> Result<Vec<Participant>, StoreError> {
        let participants = sqlx::query_as::<_, Participant>(
            "SELECT participant_id, name, token FROM participant ORDER BY participant_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(participants)
    }

    async fn activity(
        &self,
        window_start: DateTime<Utc>,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<ParticipantActivity>, StoreError> {
        let activity = sqlx::query_as::<_, ParticipantActivity>(
            r#"
            SELECT
                p.participant_id,
                MAX(r.timestamp) AS last_data_timestamp,
                COUNT(DISTINCT date_trunc('minute', r.timestamp AT TIME ZONE 'UTC'))
                    FILTER (WHERE r.timestamp >= $1) AS window_minutes,
                COUNT(DISTINCT (r.timestamp AT TIME ZONE 'UTC')::date)
                    FILTER (WHERE r.timestamp >= $1
                        AND EXTRACT(HOUR FROM r.timestamp AT TIME ZONE 'UTC') < 6) AS nights_with_data
            FROM participant p
            LEFT JOIN raw_data r
                ON r.participant_id = p.participant_id
                AND r.metric_type = 'heart_rate'
                AND r.timestamp <= $2
            GROUP BY p.participant_id
            ORDER BY p.participant_id
            "#,
        )
        .bind(window_start)
        .bind(as_of)
        .fetch_all(&self.pool)
        .await?;

        Ok(activity)
    }

    async fn data_overview(&self) -> Result<DataOverview, StoreError> {
        let overview = sqlx::query_as::<_, DataOverview>(
            r#"
            SELECT
                COUNT(*) AS total_data_points,
                MIN(timestamp AT TIME ZONE 'UTC')::date AS first_date,
                MAX(timestamp AT TIME ZONE 'UTC')::date AS last_date
            FROM raw_data
            WHERE metric_type = 'heart_rate'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(overview)
    }

    async fn heart_rate_summary(
        &self,
        participant_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<HeartRateSummary, StoreError> {
        let summary = sqlx::query_as::<_, HeartRateSummary>(
            r#"
            SELECT
                AVG(value) AS avg_hr,
                MIN(value) AS min_hr,
                MAX(value) AS max_hr,
                COUNT(*) AS total_points
            FROM raw_data
            WHERE participant_id = $1
                AND metric_type = 'heart_rate'
                AND (timestamp AT TIME ZONE 'UTC')::date BETWEEN $2 AND $3
            "#,
        )
        .bind(participant_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    async fn daily_summaries(
        &self,
        participant_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailySummary>, StoreError> {
        let summaries = sqlx::query_as::<_, DailySummary>(
            r#"
            SELECT date, resting_heart_rate
            FROM daily_summaries
            WHERE participant_id = $1 AND date BETWEEN $2 AND $3
            ORDER BY date
            "#,
        )
        .bind(participant_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(summaries)
    }

    async fn zone_averages(
        &self,
        participant_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ZoneAverage>, StoreError> {
        let zones = sqlx::query_as::<_, ZoneAverage>(
            r#"
            SELECT
                zone_name,
                AVG(minutes)::DOUBLE PRECISION AS avg_minutes,
                AVG(calories_out) AS avg_calories
            FROM heart_rate_zones
            WHERE participant_id = $1 AND date BETWEEN $2 AND $3
            GROUP BY zone_name
            ORDER BY MIN(min_heart_rate), zone_name
            "#,
        )
        .bind(participant_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await?;

        Ok(zones)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn scan(granularity: Granularity, with_cursor: bool) -> RangeScan {
        RangeScan {
            granularity,
            participant_ids: vec![1, 2],
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            from: with_cursor.then(|| Utc.with_ymd_and_hms(2024, 1, 1, 0, 4, 0).unwrap()),
            max_rows: 5,
        }
    }

    #[test]
    fn test_raw_scan_reads_raw_table_from_cursor() {
        let sql = scan_sql(&scan(Granularity::Raw, true));
        assert!(sql.contains("FROM raw_data"));
        assert!(sql.contains("metric_type = 'heart_rate'"));
        assert!(sql.contains("timestamp >= $5"));
        assert!(sql.ends_with("ORDER BY timestamp ASC, participant_id ASC LIMIT $4"));
    }

    #[test]
    fn test_aggregate_scan_without_cursor_has_no_cursor_predicate() {
        let sql = scan_sql(&scan(Granularity::OneDay, false));
        assert!(sql.contains("FROM heart_rate_1d"));
        assert!(sql.contains("avg_value, min_value, max_value"));
        assert!(!sql.contains("$5"));
    }
}
