use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One recorded day of an intraday heart-rate export.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordedDay {
    pub heart_rate_day: Vec<HeartRateDay>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartRateDay {
    #[serde(rename = "activities-heart")]
    pub activities_heart: Vec<ActivitiesHeart>,
    #[serde(rename = "activities-heart-intraday")]
    pub intraday: IntradayHeart,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivitiesHeart {
    pub value: HeartSummary,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartSummary {
    #[serde(rename = "restingHeartRate", default)]
    pub resting_heart_rate: Option<i32>,
    #[serde(rename = "heartRateZones", default)]
    pub heart_rate_zones: Vec<HeartRateZone>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeartRateZone {
    pub name: String,
    pub min: i32,
    pub max: i32,
    pub minutes: i32,
    #[serde(rename = "caloriesOut", default)]
    pub calories_out: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntradayHeart {
    pub dataset: Vec<IntradaySample>,
    #[serde(rename = "datasetInterval")]
    pub dataset_interval: i32,
    #[serde(rename = "datasetType")]
    pub dataset_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntradaySample {
    /// Wall-clock time of day, `HH:MM:SS`.
    pub time: String,
    pub value: f64,
}

/// Persisted progress of the replay.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SimulationState {
    pub simulation_day: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SimulationStatus {
    pub current_day: u32,
    pub total_days: u32,
    pub current_date: NaiveDate,
    pub progress: String,
}

/// Outcome of replaying one recorded day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayReport {
    pub date: NaiveDate,
    pub zones: usize,
    pub data_points: usize,
}
