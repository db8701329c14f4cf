use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::granularity::Granularity;

pub const HEART_RATE_METRIC: &str = "heart_rate";

/// A single raw device sample.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct MetricPoint {
    pub participant_id: i32,
    pub timestamp: DateTime<Utc>,
    pub metric_type: String,
    pub value: f64,
    #[sqlx(skip)]
    #[serde(default)]
    pub aggregation_level: Granularity,
}

/// One rollup bucket for a participant.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct AggregatePoint {
    pub participant_id: i32,
    #[serde(rename = "timestamp")]
    pub bucket: DateTime<Utc>,
    pub avg_value: f64,
    pub min_value: f64,
    pub max_value: f64,
    #[sqlx(skip)]
    #[serde(default)]
    pub aggregation_level: Granularity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataPoint {
    Raw(MetricPoint),
    Aggregate(AggregatePoint),
}

impl DataPoint {
    /// Value of the backing table's time column.
    pub fn time(&self) -> DateTime<Utc> {
        match self {
            DataPoint::Raw(point) => point.timestamp,
            DataPoint::Aggregate(point) => point.bucket,
        }
    }

    pub fn participant_id(&self) -> i32 {
        match self {
            DataPoint::Raw(point) => point.participant_id,
            DataPoint::Aggregate(point) => point.participant_id,
        }
    }

    pub fn with_level(self, level: Granularity) -> Self {
        match self {
            DataPoint::Raw(point) => DataPoint::Raw(MetricPoint {
                aggregation_level: level,
                ..point
            }),
            DataPoint::Aggregate(point) => DataPoint::Aggregate(AggregatePoint {
                aggregation_level: level,
                ..point
            }),
        }
    }
}

/// One page of a cursor-paginated range read.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub records: Vec<DataPoint>,
    pub next_cursor: Option<DateTime<Utc>>,
}
