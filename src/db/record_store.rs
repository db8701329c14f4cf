use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::StoreError;
use crate::models::granularity::Granularity;
use crate::models::metric_point::DataPoint;
use crate::models::participant::{Participant, ParticipantCount};
use crate::models::summary::{
    DailySummary, DataOverview, HeartRateSummary, ParticipantActivity, ZoneAverage,
};

/// A bounded, ordered scan over one granularity table.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeScan {
    pub granularity: Granularity,
    pub participant_ids: Vec<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Only rows whose time column is at or after this instant.
    pub from: Option<DateTime<Utc>>,
    pub max_rows: i64,
}

/// Read surface over the raw table and the three rollup views.
///
/// Implementations return rows ordered by time column ascending, then
/// participant id ascending, and never more than `max_rows`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn scan(&self, scan: &RangeScan) -> Result<Vec<DataPoint>, StoreError>;

    /// Row counts per participant for the date range. Participants without
    /// rows may be omitted.
    async fn count_records(
        &self,
        granularity: Granularity,
        participant_ids: &[i32],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ParticipantCount>, StoreError>;

    async fn list_participants(&self) -> Result<Vec<Participant>, StoreError>;

    /// One entry per known participant, in id order. Only samples at or
    /// before `as_of` count; window figures only count samples at or after
    /// `window_start`.
    async fn activity(
        &self,
        window_start: DateTime<Utc>,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<ParticipantActivity>, StoreError>;

    async fn data_overview(&self) -> Result<DataOverview, StoreError>;

    async fn heart_rate_summary(
        &self,
        participant_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<HeartRateSummary, StoreError>;

    async fn daily_summaries(
        &self,
        participant_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailySummary>, StoreError>;

    /// Zones ordered from the lowest heart-rate band up.
    async fn zone_averages(
        &self,
        participant_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ZoneAverage>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Backend name for logging.
    fn backend_type(&self) -> &'static str;
}
