//! In-process record store.
//!
//! Holds raw samples and derives the minute/hour/day rollups on read, the
//! same way the database views do. Used for local demos and by the test
//! suites, which need a deterministic snapshot without a running Postgres.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Timelike, Utc};

use crate::db::record_store::{RangeScan, RecordStore};
use crate::errors::StoreError;
use crate::models::granularity::Granularity;
use crate::models::metric_point::{AggregatePoint, DataPoint, MetricPoint, HEART_RATE_METRIC};
use crate::models::ingestion::HeartRateZone;
use crate::models::participant::{Participant, ParticipantCount};
use crate::models::summary::{
    DailySummary, DataOverview, HeartRateSummary, ParticipantActivity, ZoneAverage,
};

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    // Keyed like the raw table's uniqueness constraint
    raw: RwLock<BTreeMap<(DateTime<Utc>, i32), f64>>,
    participants: RwLock<Vec<Participant>>,
    daily: RwLock<BTreeMap<(i32, NaiveDate), Option<i32>>>,
    zones: RwLock<BTreeMap<(i32, NaiveDate, String), HeartRateZone>>,
    unavailable: RwLock<bool>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite one heart-rate sample.
    pub fn insert(&self, participant_id: i32, timestamp: DateTime<Utc>, value: f64) {
        let mut raw = self.raw.write().unwrap_or_else(|e| e.into_inner());
        raw.insert((timestamp, participant_id), value);
    }

    pub fn add_participant(&self, participant: Participant) {
        let mut participants = self.participants.write().unwrap_or_else(|e| e.into_inner());
        participants.retain(|p| p.participant_id != participant.participant_id);
        participants.push(participant);
        participants.sort_by_key(|p| p.participant_id);
    }

    pub fn insert_daily_summary(&self, participant_id: i32, date: NaiveDate, resting_heart_rate: Option<i32>) {
        let mut daily = self.daily.write().unwrap_or_else(|e| e.into_inner());
        daily.insert((participant_id, date), resting_heart_rate);
    }

    pub fn insert_zone(&self, participant_id: i32, date: NaiveDate, zone: HeartRateZone) {
        let mut zones = self.zones.write().unwrap_or_else(|e| e.into_inner());
        zones.insert((participant_id, date, zone.name.clone()), zone);
    }

    /// Make every call fail as if the database went away.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.write().unwrap_or_else(|e| e.into_inner()) = unavailable;
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if *self.unavailable.read().unwrap_or_else(|e| e.into_inner()) {
            return Err(StoreError::Unavailable("in-memory store switched off".into()));
        }
        Ok(())
    }

    fn rows(
        &self,
        granularity: Granularity,
        participant_ids: &[i32],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Vec<DataPoint> {
        let raw = self.raw.read().unwrap_or_else(|e| e.into_inner());
        let in_range = raw.iter().filter(|((timestamp, participant_id), _)| {
            let day = timestamp.date_naive();
            participant_ids.contains(participant_id) && day >= start_date && day <= end_date
        });

        if granularity == Granularity::Raw {
            return in_range
                .map(|((timestamp, participant_id), value)| {
                    DataPoint::Raw(MetricPoint {
                        participant_id: *participant_id,
                        timestamp: *timestamp,
                        metric_type: HEART_RATE_METRIC.to_string(),
                        value: *value,
                        aggregation_level: Granularity::Raw,
                    })
                })
                .collect();
        }

        let period = granularity.period_seconds();
        let mut buckets: BTreeMap<(DateTime<Utc>, i32), Vec<f64>> = BTreeMap::new();
        for ((timestamp, participant_id), value) in in_range {
            let secs = timestamp.timestamp();
            let start = secs - secs.rem_euclid(period);
            if let Some(bucket) = DateTime::<Utc>::from_timestamp(start, 0) {
                buckets.entry((bucket, *participant_id)).or_default().push(*value);
            }
        }

        buckets
            .into_iter()
            .map(|((bucket, participant_id), values)| {
                let sum: f64 = values.iter().sum();
                DataPoint::Aggregate(AggregatePoint {
                    participant_id,
                    bucket,
                    avg_value: sum / values.len() as f64,
                    min_value: values.iter().copied().fold(f64::INFINITY, f64::min),
                    max_value: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                    aggregation_level: granularity,
                })
            })
            .collect()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn scan(&self, scan: &RangeScan) -> Result<Vec<DataPoint>, StoreError> {
        self.check_available()?;
        let max_rows = usize::try_from(scan.max_rows).unwrap_or(0);
        Ok(self
            .rows(scan.granularity, &scan.participant_ids, scan.start_date, scan.end_date)
            .into_iter()
            .filter(|row| scan.from.map_or(true, |from| row.time() >= from))
            .take(max_rows)
            .collect())
    }

    async fn count_records(
        &self,
        granularity: Granularity,
        participant_ids: &[i32],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ParticipantCount>, StoreError> {
        self.check_available()?;
        let mut counts: BTreeMap<i32, i64> = BTreeMap::new();
        for row in self.rows(granularity, participant_ids, start_date, end_date) {
            *counts.entry(row.participant_id()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(participant_id, count)| ParticipantCount { participant_id, count })
            .collect())
    }

    async fn list_participants(&self) -> Result<Vec<Participant>, StoreError> {
        self.check_available()?;
        Ok(self.participants.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn activity(
        &self,
        window_start: DateTime<Utc>,
        as_of: DateTime<Utc>,
    ) -> Result<Vec<ParticipantActivity>, StoreError> {
        self.check_available()?;
        let participants = self.participants.read().unwrap_or_else(|e| e.into_inner());
        let raw = self.raw.read().unwrap_or_else(|e| e.into_inner());

        Ok(participants
            .iter()
            .map(|participant| {
                let samples: Vec<DateTime<Utc>> = raw
                    .keys()
                    .filter(|(timestamp, id)| *id == participant.participant_id && *timestamp <= as_of)
                    .map(|(timestamp, _)| *timestamp)
                    .collect();
                let in_window: Vec<&DateTime<Utc>> =
                    samples.iter().filter(|timestamp| **timestamp >= window_start).collect();
                let minutes: BTreeSet<i64> =
                    in_window.iter().map(|t| t.timestamp().div_euclid(60)).collect();
                let nights: BTreeSet<NaiveDate> = in_window
                    .iter()
                    .filter(|t| t.hour() < 6)
                    .map(|t| t.date_naive())
                    .collect();

                ParticipantActivity {
                    participant_id: participant.participant_id,
                    last_data_timestamp: samples.iter().max().copied(),
                    window_minutes: minutes.len() as i64,
                    nights_with_data: nights.len() as i64,
                }
            })
            .collect())
    }

    async fn data_overview(&self) -> Result<DataOverview, StoreError> {
        self.check_available()?;
        let raw = self.raw.read().unwrap_or_else(|e| e.into_inner());
        let dates: Vec<NaiveDate> = raw.keys().map(|(timestamp, _)| timestamp.date_naive()).collect();

        Ok(DataOverview {
            total_data_points: raw.len() as i64,
            first_date: dates.iter().min().copied(),
            last_date: dates.iter().max().copied(),
        })
    }

    async fn heart_rate_summary(
        &self,
        participant_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<HeartRateSummary, StoreError> {
        self.check_available()?;
        let values: Vec<f64> = self
            .rows(Granularity::Raw, &[participant_id], start_date, end_date)
            .into_iter()
            .filter_map(|row| match row {
                DataPoint::Raw(point) => Some(point.value),
                DataPoint::Aggregate(_) => None,
            })
            .collect();

        if values.is_empty() {
            return Ok(HeartRateSummary {
                avg_hr: None,
                min_hr: None,
                max_hr: None,
                total_points: 0,
            });
        }
        Ok(HeartRateSummary {
            avg_hr: Some(values.iter().sum::<f64>() / values.len() as f64),
            min_hr: Some(values.iter().copied().fold(f64::INFINITY, f64::min)),
            max_hr: Some(values.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
            total_points: values.len() as i64,
        })
    }

    async fn daily_summaries(
        &self,
        participant_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<DailySummary>, StoreError> {
        self.check_available()?;
        let daily = self.daily.read().unwrap_or_else(|e| e.into_inner());
        Ok(daily
            .range((participant_id, start_date)..=(participant_id, end_date))
            .map(|((_, date), resting_heart_rate)| DailySummary {
                date: *date,
                resting_heart_rate: *resting_heart_rate,
            })
            .collect())
    }

    async fn zone_averages(
        &self,
        participant_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<ZoneAverage>, StoreError> {
        self.check_available()?;
        let zones = self.zones.read().unwrap_or_else(|e| e.into_inner());

        let mut by_name: BTreeMap<&str, Vec<&HeartRateZone>> = BTreeMap::new();
        for ((id, date, name), zone) in zones.iter() {
            if *id == participant_id && *date >= start_date && *date <= end_date {
                by_name.entry(name.as_str()).or_default().push(zone);
            }
        }

        let mut averages: Vec<(i32, ZoneAverage)> = by_name
            .into_iter()
            .map(|(name, days)| {
                let calories: Vec<f64> = days.iter().filter_map(|z| z.calories_out).collect();
                let average = ZoneAverage {
                    zone_name: name.to_string(),
                    avg_minutes: days.iter().map(|z| f64::from(z.minutes)).sum::<f64>() / days.len() as f64,
                    avg_calories: (!calories.is_empty())
                        .then(|| calories.iter().sum::<f64>() / calories.len() as f64),
                };
                let lowest = days.iter().map(|z| z.min).min().unwrap_or(i32::MAX);
                (lowest, average)
            })
            .collect();
        averages.sort_by(|(a_min, a), (b_min, b)| a_min.cmp(b_min).then_with(|| a.zone_name.cmp(&b.zone_name)));

        Ok(averages.into_iter().map(|(_, average)| average).collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_available()
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}
