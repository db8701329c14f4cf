use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::QueryError;

/// Time-bucket resolution heart-rate data is stored and queried at.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    #[default]
    #[serde(rename = "raw")]
    Raw,
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
}

/// Shape of the rows a backing table yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// participant_id, timestamp, metric_type, value
    Raw,
    /// participant_id, bucket, avg_value, min_value, max_value
    Aggregate,
}

/// Where one granularity lives in the store.
#[derive(Debug, Clone, Copy)]
pub struct TableLayout {
    pub table: &'static str,
    pub time_column: &'static str,
    pub projection: Projection,
}

const RAW_LAYOUT: TableLayout = TableLayout {
    table: "raw_data",
    time_column: "timestamp",
    projection: Projection::Raw,
};

const ONE_MINUTE_LAYOUT: TableLayout = TableLayout {
    table: "heart_rate_1m",
    time_column: "bucket",
    projection: Projection::Aggregate,
};

const ONE_HOUR_LAYOUT: TableLayout = TableLayout {
    table: "heart_rate_1h",
    time_column: "bucket",
    projection: Projection::Aggregate,
};

const ONE_DAY_LAYOUT: TableLayout = TableLayout {
    table: "heart_rate_1d",
    time_column: "bucket",
    projection: Projection::Aggregate,
};

impl Granularity {
    pub const ALL: [Granularity; 4] = [
        Granularity::Raw,
        Granularity::OneMinute,
        Granularity::OneHour,
        Granularity::OneDay,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Raw => "raw",
            Granularity::OneMinute => "1m",
            Granularity::OneHour => "1h",
            Granularity::OneDay => "1d",
        }
    }

    pub fn layout(&self) -> &'static TableLayout {
        match self {
            Granularity::Raw => &RAW_LAYOUT,
            Granularity::OneMinute => &ONE_MINUTE_LAYOUT,
            Granularity::OneHour => &ONE_HOUR_LAYOUT,
            Granularity::OneDay => &ONE_DAY_LAYOUT,
        }
    }

    /// Length of one bucket in seconds. Raw points are treated as minute samples.
    pub fn period_seconds(&self) -> i64 {
        match self {
            Granularity::Raw | Granularity::OneMinute => 60,
            Granularity::OneHour => 3_600,
            Granularity::OneDay => 86_400,
        }
    }
}

impl FromStr for Granularity {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "raw" => Ok(Granularity::Raw),
            "1m" => Ok(Granularity::OneMinute),
            "1h" => Ok(Granularity::OneHour),
            "1d" => Ok(Granularity::OneDay),
            other => Err(QueryError::InvalidArgument(format!(
                "Unsupported aggregation level '{}'. Use one of: raw, 1m, 1h, 1d.",
                other
            ))),
        }
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
