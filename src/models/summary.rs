use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Recent raw-data coverage of one participant, as of a reference instant.
#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct ParticipantActivity {
    pub participant_id: i32,
    pub last_data_timestamp: Option<DateTime<Utc>>,
    /// Distinct minutes with at least one sample inside the window
    pub window_minutes: i64,
    /// Distinct days with a sample between 00:00 and 06:00 UTC inside the window
    pub nights_with_data: i64,
}

#[derive(Debug, Clone, FromRow, PartialEq)]
pub struct DataOverview {
    pub total_data_points: i64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
pub struct HeartRateSummary {
    pub avg_hr: Option<f64>,
    pub min_hr: Option<f64>,
    pub max_hr: Option<f64>,
    pub total_points: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub resting_heart_rate: Option<i32>,
}

/// Minutes and calories in one heart-rate zone, averaged over the days in range.
#[derive(Debug, Clone, FromRow, Serialize, PartialEq)]
pub struct ZoneAverage {
    pub zone_name: String,
    pub avg_minutes: f64,
    pub avg_calories: Option<f64>,
}
